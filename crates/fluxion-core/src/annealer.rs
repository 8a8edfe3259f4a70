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

//! The Metropolis loop: generate a move, check it, evaluate it, accept or
//! reject, track the best state seen. Single-threaded and synchronous —
//! nothing here ever suspends, so cancellation only needs to be polled
//! between iterations.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use fluxion_types::Euro;

use crate::cancellation::CancellationToken;
use crate::config::SolverConfig;
use crate::cost;
use crate::error::SolveError;
use crate::instance::Instance;
use crate::moves::MoveGenerator;
use crate::schedule_state::ScheduleState;

pub struct AnnealerOutcome {
    pub best_state: ScheduleState,
    pub best_cost: Euro,
    pub initial_cost: Euro,
    pub iterations: u64,
    pub accepted_moves: u64,
    pub rejected_moves: u64,
    pub initial_temperature: f64,
    pub final_temperature: f64,
    pub cancelled: bool,
}

/// The run statistics a caller needs to build a [external `SolveTelemetry`]
/// record, without exposing the internal [`ScheduleState`] the full
/// [`AnnealerOutcome`] carries.
///
/// [external `SolveTelemetry`]: https://docs.rs/fluxion-shared (this workspace's `fluxion-shared` crate)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveStats {
    pub initial_cost: Euro,
    pub best_cost: Euro,
    pub iterations: u64,
    pub accepted_moves: u64,
    pub rejected_moves: u64,
    pub initial_temperature: f64,
    pub final_temperature: f64,
    pub cancelled: bool,
}

impl From<&AnnealerOutcome> for SolveStats {
    fn from(outcome: &AnnealerOutcome) -> Self {
        Self {
            initial_cost: outcome.initial_cost,
            best_cost: outcome.best_cost,
            iterations: outcome.iterations,
            accepted_moves: outcome.accepted_moves,
            rejected_moves: outcome.rejected_moves,
            initial_temperature: outcome.initial_temperature,
            final_temperature: outcome.final_temperature,
            cancelled: outcome.cancelled,
        }
    }
}

/// Runs the annealing loop starting from `initial_state`, which must
/// already be feasible (the caller validates this before calling in).
pub fn run(
    instance: &Instance,
    config: &SolverConfig,
    initial_state: ScheduleState,
    cancellation: &CancellationToken,
) -> Result<AnnealerOutcome, SolveError> {
    let mut state = initial_state;
    let mut generator = MoveGenerator::new(config.rng_seed, config.move_weights);

    let initial_cost = cost::total_cost(instance, &state);
    let mut current_cost = initial_cost;
    let mut best_state = state.clone();
    let mut best_cost = current_cost;

    let samples = generator.sample_abs_deltas(instance, &mut state, config.initial_temperature_samples);
    let initial_temperature = estimate_initial_temperature(&samples, config.initial_temperature_multiplier);
    let mut temperature = initial_temperature;

    let cooling_period = config.cooling_period.unwrap_or_else(|| {
        let decision_vars = instance.constants().len() + instance.variables().len() + instance.batteries().len();
        (instance.steps() * decision_vars.max(1)) as u64
    }).max(1);

    let mut accept_rng = StdRng::seed_from_u64(config.rng_seed ^ 0x9E37_79B9_7F4A_7C15);

    let mut iterations: u64 = 0;
    let mut accepted_moves: u64 = 0;
    let mut rejected_moves: u64 = 0;
    let mut since_last_accept: u64 = 0;
    let mut since_last_audit: u64 = 0;
    let mut cancelled = false;

    info!(initial_temperature, initial_cost = %initial_cost, "starting annealer");

    loop {
        if cancellation.is_cancelled() {
            cancelled = true;
            break;
        }
        if temperature < config.min_temperature {
            break;
        }
        if since_last_accept >= config.stall_iterations {
            break;
        }
        if iterations >= config.max_iterations {
            break;
        }

        let Some(proposal) = generator.propose(instance, &mut state) else {
            break;
        };
        iterations += 1;

        let accept = proposal.feasible
            && (proposal.delta.0 <= 0.0 || accept_rng.gen::<f64>() < (-proposal.delta.0 / temperature).exp());

        if accept {
            current_cost = current_cost + proposal.delta;
            accepted_moves += 1;
            since_last_accept = 0;
            since_last_audit += 1;

            if current_cost < best_cost {
                best_cost = current_cost;
                best_state = state.clone();
            }

            if since_last_audit >= config.audit_period {
                let recomputed = cost::total_cost(instance, &state);
                if (recomputed.0 - current_cost.0).abs() > config.audit_tolerance_eur {
                    return Err(SolveError::Numerical {
                        incremental: current_cost.0,
                        full: recomputed.0,
                        tolerance: config.audit_tolerance_eur,
                    });
                }
                current_cost = recomputed;
                since_last_audit = 0;
            }
        } else {
            generator.undo(instance, &mut state, proposal.undo);
            rejected_moves += 1;
            since_last_accept += 1;
        }

        if iterations % cooling_period == 0 {
            temperature *= config.cooling_factor;
        }
    }

    debug!(iterations, accepted_moves, rejected_moves, final_temperature = temperature, "annealer finished");

    Ok(AnnealerOutcome {
        best_state,
        best_cost,
        initial_cost,
        iterations,
        accepted_moves,
        rejected_moves,
        initial_temperature,
        final_temperature: temperature,
        cancelled,
    })
}

/// Seeds the starting temperature at a multiple of the standard deviation
/// of `|delta J|` sampled from the initial state. Falls back to a small
/// positive floor if no samples were available (degenerate instance).
fn estimate_initial_temperature(samples: &[f64], multiplier: f64) -> f64 {
    if samples.is_empty() {
        return 1e-3;
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    (variance.sqrt() * multiplier).max(1e-3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_estimate_is_never_negative_or_zero() {
        assert!(estimate_initial_temperature(&[], 2.0) > 0.0);
        assert!(estimate_initial_temperature(&[0.0, 0.0, 0.0], 2.0) > 0.0);
        assert!(estimate_initial_temperature(&[1.0, 2.0, 3.0, 4.0], 2.0) > 0.0);
    }
}
