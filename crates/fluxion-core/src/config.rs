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

//! Tunable parameters for the scheduler, with sensible defaults.

use serde::{Deserialize, Serialize};

/// Per-category probability of the move generator picking a given move kind.
/// Renormalized at selection time (see `moves::pick_category`) to sum to one
/// over whichever categories actually have something to act on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveWeights {
    pub shift_constant: f64,
    pub reallocate_variable: f64,
    pub perturb_battery: f64,
}

impl Default for MoveWeights {
    fn default() -> Self {
        Self {
            shift_constant: 1.0,
            reallocate_variable: 1.0,
            perturb_battery: 1.0,
        }
    }
}

/// Solver-wide configuration. All fields have defaults matching the typical
/// values called out in the design notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Geometric cooling factor `alpha`, applied every `cooling_period`
    /// accepted-or-rejected iterations.
    pub cooling_factor: f64,
    /// Number of iterations between two successive temperature reductions.
    /// If `None`, defaults to `steps * decision_variable_count` at solve
    /// time once the instance size is known.
    pub cooling_period: Option<u64>,
    /// Multiple of the sampled `|delta J|` standard deviation used to seed
    /// the initial temperature.
    pub initial_temperature_multiplier: f64,
    /// Number of random moves sampled from the initial state to estimate the
    /// initial temperature.
    pub initial_temperature_samples: u64,
    /// Terminate once the temperature drops below this value.
    pub min_temperature: f64,
    /// Terminate if no move has been accepted in this many iterations.
    pub stall_iterations: u64,
    /// Hard cap on the number of annealing iterations.
    pub max_iterations: u64,
    /// Number of accepted moves between full-horizon cost audits.
    pub audit_period: u64,
    /// Maximum allowed drift between incremental and recomputed cost before
    /// the solve is aborted as [`crate::error::SolveError::Numerical`].
    pub audit_tolerance_eur: f64,
    /// Seed for the deterministic RNG driving move selection.
    pub rng_seed: u64,
    pub move_weights: MoveWeights,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            cooling_factor: 0.995,
            cooling_period: None,
            initial_temperature_multiplier: 2.0,
            initial_temperature_samples: 100,
            min_temperature: 1e-6,
            stall_iterations: 5_000,
            max_iterations: 200_000,
            audit_period: 500,
            audit_tolerance_eur: 1e-6,
            rng_seed: 0,
            move_weights: MoveWeights::default(),
        }
    }
}
