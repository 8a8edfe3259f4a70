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

//! Discretizes a planning horizon into a finite sequence of equal-length
//! timesteps, and maps between wall time and step indices.

use chrono::{DateTime, Duration, Utc};

use crate::error::SolveError;
use fluxion_types::StepIndex;

/// A horizon `[start, start + steps*step)` partitioned into `steps` equal
/// intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    start: DateTime<Utc>,
    step: Duration,
    steps: usize,
}

impl TimeGrid {
    /// Builds a grid. Fails with [`SolveError::InvalidHorizon`] if `step` is
    /// not positive or `steps` is zero.
    pub fn new(start: DateTime<Utc>, step: Duration, steps: usize) -> Result<Self, SolveError> {
        if step <= Duration::zero() {
            return Err(SolveError::InvalidHorizon(format!(
                "timestep must be positive, got {step}"
            )));
        }
        if steps == 0 {
            return Err(SolveError::InvalidHorizon(
                "horizon must contain at least one step".into(),
            ));
        }
        Ok(Self { start, step, steps })
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn step_len(&self) -> Duration {
        self.step
    }

    pub fn horizon_start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn horizon_end(&self) -> DateTime<Utc> {
        self.start + self.step * self.steps as i32
    }

    /// Start instant of step `i`. Does not validate `i < steps()`.
    pub fn time_of(&self, i: usize) -> DateTime<Utc> {
        self.start + self.step * i as i32
    }

    /// The step whose interval contains `t`, by flooring to the nearest grid
    /// edge at or before `t`. Returns `None` if `t` lies outside the
    /// horizon.
    pub fn step_of(&self, t: DateTime<Utc>) -> Option<StepIndex> {
        if t < self.start || t >= self.horizon_end() {
            return None;
        }
        let elapsed = (t - self.start).num_milliseconds();
        let step_ms = self.step.num_milliseconds();
        Some(StepIndex((elapsed / step_ms) as usize))
    }

    /// Whether `duration` is a non-negative integer multiple of the grid's
    /// step length.
    pub fn is_aligned(&self, duration: Duration) -> bool {
        duration >= Duration::zero() && duration.num_milliseconds() % self.step.num_milliseconds() == 0
    }

    /// Number of whole steps `duration` spans. Panics if not aligned; callers
    /// must validate with [`Self::is_aligned`] first.
    pub fn steps_in(&self, duration: Duration) -> usize {
        debug_assert!(self.is_aligned(duration));
        (duration.num_milliseconds() / self.step.num_milliseconds()) as usize
    }

    /// Snaps `t` down to the nearest grid edge at or before it, clamped to
    /// `[start, horizon_end]`.
    pub fn snap_down(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        if t <= self.start {
            return self.start;
        }
        if t >= self.horizon_end() {
            return self.horizon_end();
        }
        let step_ms = self.step.num_milliseconds();
        let elapsed_ms = (t - self.start).num_milliseconds();
        self.start + Duration::milliseconds((elapsed_ms / step_ms) * step_ms)
    }

    /// Snaps `t` up to the nearest grid edge at or after it, clamped to
    /// `[start, horizon_end]`.
    pub fn snap_up(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        if t <= self.start {
            return self.start;
        }
        let down = self.snap_down(t);
        if down == t { down } else { (down + self.step).min(self.horizon_end()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> TimeGrid {
        let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        TimeGrid::new(start, Duration::hours(1), 24).unwrap()
    }

    #[test]
    fn step_of_floors_to_edge() {
        let grid = grid();
        let t = grid.horizon_start() + Duration::minutes(90);
        assert_eq!(grid.step_of(t), Some(StepIndex(1)));
    }

    #[test]
    fn step_of_rejects_outside_horizon() {
        let grid = grid();
        assert_eq!(grid.step_of(grid.horizon_end()), None);
        assert_eq!(grid.step_of(grid.horizon_start() - Duration::seconds(1)), None);
    }

    #[test]
    fn time_of_is_step_of_inverse_at_edges() {
        let grid = grid();
        for i in 0..grid.steps() {
            assert_eq!(grid.step_of(grid.time_of(i)), Some(StepIndex(i)));
        }
    }

    #[test]
    fn is_aligned_rejects_non_multiples() {
        let grid = grid();
        assert!(grid.is_aligned(Duration::hours(2)));
        assert!(!grid.is_aligned(Duration::minutes(90)));
    }

    #[test]
    fn rejects_non_positive_step() {
        let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(TimeGrid::new(start, Duration::zero(), 10).is_err());
    }
}
