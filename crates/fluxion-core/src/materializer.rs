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

//! Converts the annealer's internal [`ScheduleState`] into the public
//! [`Schedule`] result type: wall-clock times for constant actions, full
//! per-step vectors for variable actions and batteries, and a per-entity
//! cost attributed at the same spot price used for the objective.

use fluxion_types::{AssignedBattery, AssignedConstantAction, AssignedVariableAction, Euro, Schedule};

use crate::cost::step_cost;
use crate::instance::Instance;
use crate::schedule_state::ScheduleState;

pub fn materialize(
    instance: &Instance,
    state: &ScheduleState,
    total_cost: Euro,
    iterations: u64,
    cancelled: bool,
) -> Schedule {
    let grid = instance.grid();
    let step = grid.step_len().to_std().unwrap_or(std::time::Duration::ZERO);
    let price = instance.price();

    let constant_actions = instance
        .constants()
        .iter()
        .enumerate()
        .map(|(idx, action)| {
            let start_step = state.constant_start_step(idx);
            let duration_steps = instance.constant_duration_steps(idx);
            let cost: Euro = (start_step..start_step + duration_steps)
                .map(|i| step_cost(action.power, price[i], step))
                .sum();
            AssignedConstantAction {
                action_id: action.id,
                start: grid.time_of(start_step),
                end: grid.time_of(start_step + duration_steps),
                power: action.power,
                energy: action.power.over(step) * duration_steps as f64,
                cost,
            }
        })
        .collect();

    let variable_actions = instance
        .variables()
        .iter()
        .enumerate()
        .map(|(idx, action)| {
            let window = instance.variable_window(idx);
            let allocation = (0..grid.steps())
                .map(|i| {
                    if window.contains(i) {
                        state.variable_allocation(idx)[i - window.start]
                    } else {
                        fluxion_types::Watt::ZERO
                    }
                })
                .collect::<Vec<_>>();
            let cost: Euro = allocation
                .iter()
                .enumerate()
                .map(|(i, &p)| step_cost(p, price[i], step))
                .sum();
            AssignedVariableAction {
                action_id: action.id,
                allocation,
                total_energy: action.total_energy,
                cost,
            }
        })
        .collect();

    let batteries = instance
        .batteries()
        .iter()
        .enumerate()
        .map(|(idx, battery)| {
            let flow = state.battery_flow(idx).to_vec();
            let level = state.battery_level(idx)[..grid.steps()].to_vec();
            let net_cost: Euro = flow
                .iter()
                .enumerate()
                .map(|(i, &f)| step_cost(f, price[i], step))
                .sum();
            AssignedBattery { battery_id: battery.id, flow, level, net_cost }
        })
        .collect();

    Schedule {
        horizon_start: grid.horizon_start(),
        horizon_end: grid.horizon_end(),
        constant_actions,
        variable_actions,
        batteries,
        total_cost,
        iterations,
        cancelled,
    }
}
