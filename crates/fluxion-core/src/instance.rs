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

//! The static, immutable problem description: entities stored in flat
//! arenas with an identifier-to-index map for reverse lookup, plus the
//! per-step baseline, price and generation curves derived once at
//! construction time.

use std::collections::HashMap;

use chrono::Duration;

use fluxion_types::{BatteryId, ConstantActionId, EuroPerWh, VariableActionId, Watt, WattHour};

use crate::actions::{Battery, ConstantAction, PastConstantAction, VariableAction};
use crate::error::SolveError;
use crate::prognosis::Prognosis;
use crate::time_grid::TimeGrid;

/// A variable action's window expressed in step coordinates, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepWindow {
    pub start: usize,
    pub end: usize,
}

impl StepWindow {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, step: usize) -> bool {
        step >= self.start && step < self.end
    }
}

pub struct Instance {
    grid: TimeGrid,
    baseline: Vec<Watt>,
    price: Vec<EuroPerWh>,
    generation: Vec<Watt>,

    constants: Vec<ConstantAction>,
    constant_index: HashMap<ConstantActionId, usize>,
    constant_feasible_range: Vec<(usize, usize)>,
    constant_duration_steps: Vec<usize>,

    variables: Vec<VariableAction>,
    variable_index: HashMap<VariableActionId, usize>,
    variable_window: Vec<StepWindow>,

    batteries: Vec<Battery>,
    battery_index: HashMap<BatteryId, usize>,
}

impl Instance {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        grid: TimeGrid,
        prognosis: Prognosis,
        constants: Vec<ConstantAction>,
        variables: Vec<VariableAction>,
        batteries: Vec<Battery>,
        past_actions: Vec<PastConstantAction>,
    ) -> Result<Self, SolveError> {
        let step = grid.step_len();
        let baseline = baseline_curve(&grid, &past_actions);
        let generation = prognosis
            .generation
            .iter()
            .map(|wh| wh.per(duration_to_std(step)))
            .collect();

        let mut constant_index = HashMap::with_capacity(constants.len());
        let mut constant_feasible_range = Vec::with_capacity(constants.len());
        let mut constant_duration_steps = Vec::with_capacity(constants.len());
        for (idx, action) in constants.iter().enumerate() {
            if constant_index.insert(action.id, idx).is_some() {
                return Err(SolveError::InvalidInput(format!(
                    "duplicate constant action id {}",
                    action.id
                )));
            }
            if !grid.is_aligned(action.duration) {
                return Err(SolveError::InvalidInput(format!(
                    "constant action {} duration is not a multiple of the timestep",
                    action.id
                )));
            }
            let earliest_step = grid.step_of(grid.snap_up(action.earliest_start)).ok_or_else(|| {
                SolveError::InvalidInput(format!(
                    "constant action {} earliest_start lies outside the horizon",
                    action.id
                ))
            })?;
            let latest_step = step_of_end(&grid, action.latest_end).ok_or_else(|| {
                SolveError::InvalidInput(format!(
                    "constant action {} latest_end lies outside the horizon",
                    action.id
                ))
            })?;
            let duration_steps = grid.steps_in(action.duration);
            let window_steps = latest_step.saturating_sub(earliest_step.0);
            let (lo, hi) = action
                .feasible_start_range(earliest_step.0, window_steps, duration_steps)
                .ok_or_else(|| {
                    SolveError::InvalidInput(format!(
                        "constant action {} cannot fit between earliest_start and latest_end",
                        action.id
                    ))
                })?;
            constant_feasible_range.push((lo, hi));
            constant_duration_steps.push(duration_steps);
        }

        let mut variable_index = HashMap::with_capacity(variables.len());
        let mut variable_window = Vec::with_capacity(variables.len());
        for (idx, action) in variables.iter().enumerate() {
            if variable_index.insert(action.id, idx).is_some() {
                return Err(SolveError::InvalidInput(format!(
                    "duplicate variable action id {}",
                    action.id
                )));
            }
            let start = grid.step_of(action.window_start).ok_or_else(|| {
                SolveError::InvalidInput(format!(
                    "variable action {} window_start lies outside the horizon",
                    action.id
                ))
            })?;
            let end = step_of_end(&grid, action.window_end).ok_or_else(|| {
                SolveError::InvalidInput(format!(
                    "variable action {} window_end lies outside the horizon",
                    action.id
                ))
            })?;
            let window = StepWindow { start: start.0, end };
            if window.is_empty() {
                return Err(SolveError::InvalidInput(format!(
                    "variable action {} has an empty window",
                    action.id
                )));
            }
            let capacity = action.max_power.over(duration_to_std(step)) * window.len() as f64;
            if action.total_energy.0 > capacity.0 + 1e-9 {
                return Err(SolveError::InfeasibleInstance(format!(
                    "variable action {} needs {} Wh but window*cap only allows {} Wh",
                    action.id, action.total_energy, capacity
                )));
            }
            variable_window.push(window);
        }

        let mut battery_index = HashMap::with_capacity(batteries.len());
        for (idx, battery) in batteries.iter().enumerate() {
            if battery_index.insert(battery.id, idx).is_some() {
                return Err(SolveError::InvalidInput(format!(
                    "duplicate battery id {}",
                    battery.id
                )));
            }
            if battery.initial_charge.0 < 0.0 || battery.initial_charge.0 > battery.capacity.0 {
                return Err(SolveError::InvalidInput(format!(
                    "battery {} initial charge {} outside [0, {}]",
                    battery.id, battery.initial_charge, battery.capacity
                )));
            }
            if battery.max_charge_rate.0 < 0.0 || battery.max_discharge_rate.0 < 0.0 {
                return Err(SolveError::InvalidInput(format!(
                    "battery {} has a negative rate limit",
                    battery.id
                )));
            }
        }

        Ok(Self {
            grid,
            baseline,
            price: prognosis.price,
            generation,
            constants,
            constant_index,
            constant_feasible_range,
            constant_duration_steps,
            variables,
            variable_index,
            variable_window,
            batteries,
            battery_index,
        })
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn steps(&self) -> usize {
        self.grid.steps()
    }

    pub fn baseline(&self) -> &[Watt] {
        &self.baseline
    }

    pub fn price(&self) -> &[EuroPerWh] {
        &self.price
    }

    pub fn generation(&self) -> &[Watt] {
        &self.generation
    }

    pub fn constants(&self) -> &[ConstantAction] {
        &self.constants
    }

    pub fn constant_feasible_range(&self, idx: usize) -> (usize, usize) {
        self.constant_feasible_range[idx]
    }

    pub fn constant_duration_steps(&self, idx: usize) -> usize {
        self.constant_duration_steps[idx]
    }

    pub fn constant_index_of(&self, id: ConstantActionId) -> Option<usize> {
        self.constant_index.get(&id).copied()
    }

    pub fn variables(&self) -> &[VariableAction] {
        &self.variables
    }

    pub fn variable_window(&self, idx: usize) -> StepWindow {
        self.variable_window[idx]
    }

    pub fn variable_index_of(&self, id: VariableActionId) -> Option<usize> {
        self.variable_index.get(&id).copied()
    }

    pub fn batteries(&self) -> &[Battery] {
        &self.batteries
    }

    pub fn battery_index_of(&self, id: BatteryId) -> Option<usize> {
        self.battery_index.get(&id).copied()
    }
}

fn step_of_end(grid: &TimeGrid, end: chrono::DateTime<chrono::Utc>) -> Option<usize> {
    if end < grid.horizon_start() || end > grid.horizon_end() {
        return None;
    }
    if end == grid.horizon_end() {
        return Some(grid.steps());
    }
    grid.step_of(end).map(|s| s.index())
}

fn baseline_curve(grid: &TimeGrid, past_actions: &[PastConstantAction]) -> Vec<Watt> {
    let mut baseline = vec![Watt::ZERO; grid.steps()];
    let step_len = grid.step_len();
    for action in past_actions {
        for i in 0..grid.steps() {
            let step_start = grid.time_of(i);
            let step_end = step_start + step_len;
            let overlap_start = action.start.max(step_start);
            let overlap_end = action.end.min(step_end);
            if overlap_end > overlap_start {
                let overlap = overlap_end - overlap_start;
                let fraction = overlap.num_milliseconds() as f64 / step_len.num_milliseconds() as f64;
                baseline[i] += action.power * fraction;
            }
        }
    }
    baseline
}

fn duration_to_std(d: Duration) -> std::time::Duration {
    d.to_std().unwrap_or(std::time::Duration::ZERO)
}
