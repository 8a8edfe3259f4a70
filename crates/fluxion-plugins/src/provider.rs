// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! The capability a prognosis (price or generation) data source must offer:
//! sample a representative quantity over an interval. The solver core talks
//! only to this trait, so any data source — a fixed table, a closure backed
//! by a forecasting model, an HTTP-backed client — can stand in for it.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

/// A prognosis source failed to produce a value for the requested interval.
#[derive(Debug, Error, PartialEq)]
pub enum PrognosisError {
    #[error("no data covers [{start}, {end})")]
    OutOfRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("prognosis source unavailable: {0}")]
    Unavailable(String),
}

/// Samples a quantity `Q` (price, generation power, ...) over a half-open
/// time interval `[start, end)`. Implementations are expected to return the
/// interval's representative average, not an instantaneous reading.
pub trait PrognosisProvider<Q>: Send + Sync {
    fn sample(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Q, PrognosisError>;
}

/// Wraps any `Fn` as a [`PrognosisProvider`], for providers backed by a
/// closure rather than stored state (e.g. a constant or synthetic series).
pub struct FnProvider<F> {
    sampler: F,
}

impl<F> FnProvider<F> {
    pub fn new(sampler: F) -> Self {
        Self { sampler }
    }
}

impl<Q, F> PrognosisProvider<Q> for FnProvider<F>
where
    F: Fn(DateTime<Utc>, DateTime<Utc>) -> Result<Q, PrognosisError> + Send + Sync,
{
    fn sample(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Q, PrognosisError> {
        (self.sampler)(start, end)
    }
}

/// A provider backed by a fixed, sorted table of `(interval_start, value)`
/// pairs, each covering up to the next entry's start (or `table_end` for the
/// last entry). This is the typical shape of a day-ahead price series.
pub struct TableProvider<Q> {
    entries: Vec<(DateTime<Utc>, Q)>,
    table_end: DateTime<Utc>,
}

impl<Q: Clone> TableProvider<Q> {
    /// `entries` must be sorted by `interval_start` ascending and non-empty.
    pub fn new(entries: Vec<(DateTime<Utc>, Q)>, table_end: DateTime<Utc>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        Self { entries, table_end }
    }
}

impl<Q: Clone + Send + Sync> PrognosisProvider<Q> for TableProvider<Q> {
    fn sample(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Q, PrognosisError> {
        if self.entries.is_empty() || start < self.entries[0].0 || end > self.table_end {
            warn!(%start, %end, "prognosis table has no coverage for the requested interval");
            return Err(PrognosisError::OutOfRange { start, end });
        }
        let idx = match self.entries.binary_search_by(|(ts, _)| ts.cmp(&start)) {
            Ok(i) => i,
            Err(0) => {
                warn!(%start, %end, "prognosis table has no coverage for the requested interval");
                return Err(PrognosisError::OutOfRange { start, end });
            }
            Err(i) => i - 1,
        };
        Ok(self.entries[idx].1.clone())
    }
}
