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

//! Materializes per-step price and generation vectors from the caller's
//! prognosis providers, once, before the annealing loop starts.

use fluxion_plugins::PrognosisProvider;
use fluxion_types::{EuroPerWh, WattHour};
use tracing::debug;

use crate::error::SolveError;
use crate::time_grid::TimeGrid;

/// Per-step price and generation, sampled once at solve start.
#[derive(Debug, Clone, PartialEq)]
pub struct Prognosis {
    pub price: Vec<EuroPerWh>,
    pub generation: Vec<WattHour>,
}

impl Prognosis {
    /// Samples `price_provider` (required) and `generation_provider`
    /// (optional — zero generation assumed if absent) over every step of
    /// `grid`.
    pub fn sample(
        grid: &TimeGrid,
        price_provider: &dyn PrognosisProvider<EuroPerWh>,
        generation_provider: Option<&dyn PrognosisProvider<WattHour>>,
    ) -> Result<Self, SolveError> {
        let mut price = Vec::with_capacity(grid.steps());
        let mut generation = Vec::with_capacity(grid.steps());

        for i in 0..grid.steps() {
            let start = grid.time_of(i);
            let end = grid.time_of(i + 1);
            price.push(price_provider.sample(start, end)?);
            generation.push(match generation_provider {
                Some(provider) => provider.sample(start, end)?,
                None => WattHour::ZERO,
            });
        }

        debug!(steps = grid.steps(), "sampled prognosis");
        Ok(Self { price, generation })
    }
}
