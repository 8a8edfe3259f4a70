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

//! Total and incremental grid cost of a schedule state. Export is credited
//! at the same price as import — a negative net demand simply yields a
//! negative cost contribution for that step.

use fluxion_types::{Euro, EuroPerWh, Watt};

use crate::instance::Instance;
use crate::schedule_state::ScheduleState;

/// Cost (or, if negative, revenue) of a single step's net demand.
pub fn step_cost(demand: Watt, price: EuroPerWh, step: std::time::Duration) -> Euro {
    demand.over(step) * price
}

/// Recomputes `J` from scratch by scanning the whole horizon. Used for the
/// initial cost and for periodic drift audits; never in the per-move path.
pub fn total_cost(instance: &Instance, state: &ScheduleState) -> Euro {
    let step = std_step(instance);
    state
        .net_demand()
        .iter()
        .zip(instance.price())
        .map(|(&d, &p)| step_cost(d, p, step))
        .sum()
}

/// `J(new) - J(old)` computed from only the steps a move touched, given the
/// net-demand values at those steps before and after the move.
pub fn incremental_delta(
    instance: &Instance,
    touched_steps: &[usize],
    old_demand: &[Watt],
    new_demand: &[Watt],
) -> Euro {
    let step = std_step(instance);
    touched_steps
        .iter()
        .map(|&i| {
            step_cost(new_demand[i], instance.price()[i], step) - step_cost(old_demand[i], instance.price()[i], step)
        })
        .sum()
}

fn std_step(instance: &Instance) -> std::time::Duration {
    instance
        .grid()
        .step_len()
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_types::WattHour;

    #[test]
    fn export_is_credited_at_the_same_price() {
        let step = std::time::Duration::from_secs(3600);
        let import = step_cost(Watt(1000.0), EuroPerWh(0.00001), step);
        let export = step_cost(Watt(-1000.0), EuroPerWh(0.00001), step);
        assert_eq!(import.0, -export.0);
    }

    #[test]
    fn step_cost_matches_energy_times_price() {
        let step = std::time::Duration::from_secs(1800);
        let cost = step_cost(Watt(2000.0), EuroPerWh(0.00002), step);
        let expected = WattHour(1000.0) * EuroPerWh(0.00002);
        assert!((cost.0 - expected.0).abs() < 1e-12);
    }
}
