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

//! The mutable candidate solution the annealer searches over: per-action
//! placement/allocation, per-battery flow, and the net-demand curve they
//! induce. All vectors are preallocated at construction and mutated in
//! place by moves; nothing in this module allocates once a solve is
//! running.

use fluxion_types::{Watt, WattHour};

use crate::error::SolveError;
use crate::instance::Instance;

#[derive(Debug, Clone)]
pub struct ScheduleState {
    /// Start step of each constant action, indexed by action index.
    pub(crate) constant_start: Vec<usize>,
    /// Per-step reverse index: which constant action indices are active.
    pub(crate) constant_active: Vec<Vec<usize>>,

    /// Per variable action, one allocation entry per step of its window.
    pub(crate) variable_alloc: Vec<Vec<Watt>>,
    /// Aggregate variable consumption per grid step.
    pub(crate) variable_sum: Vec<Watt>,

    /// Per battery, signed flow for every grid step.
    pub(crate) battery_flow: Vec<Vec<Watt>>,
    /// Per battery, charge level at the start of each step, plus one
    /// trailing entry for the level at the end of the horizon.
    pub(crate) battery_level: Vec<Vec<WattHour>>,
    /// Aggregate battery flow per grid step.
    pub(crate) battery_flow_sum: Vec<Watt>,

    /// `baseline + constant + variable + battery_flow - generation`, per step.
    pub(crate) net_demand: Vec<Watt>,
}

impl ScheduleState {
    /// Builds the canonical initial state: each constant action at its
    /// earliest feasible step, each variable action spread uniformly
    /// (clipped at its cap), every battery idle.
    pub fn initial(instance: &Instance) -> Result<Self, SolveError> {
        let n = instance.steps();
        let step_std = instance
            .grid()
            .step_len()
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        let mut constant_start = Vec::with_capacity(instance.constants().len());
        let mut constant_active = vec![Vec::new(); n];
        for idx in 0..instance.constants().len() {
            let (earliest, _latest) = instance.constant_feasible_range(idx);
            let duration_steps = instance.constant_duration_steps(idx);
            constant_start.push(earliest);
            for step in earliest..earliest + duration_steps {
                constant_active[step].push(idx);
            }
        }

        let mut variable_alloc = Vec::with_capacity(instance.variables().len());
        let mut variable_sum = vec![Watt::ZERO; n];
        for (idx, action) in instance.variables().iter().enumerate() {
            let window = instance.variable_window(idx);
            let alloc = initial_uniform_allocation(
                action.total_energy,
                action.max_power,
                step_std,
                window.len(),
            );
            for (offset, &value) in alloc.iter().enumerate() {
                variable_sum[window.start + offset] += value;
            }
            variable_alloc.push(alloc);
        }

        let battery_flow = instance
            .batteries()
            .iter()
            .map(|_| vec![Watt::ZERO; n])
            .collect::<Vec<_>>();
        let battery_level = instance
            .batteries()
            .iter()
            .map(|b| vec![b.initial_charge; n + 1])
            .collect::<Vec<_>>();
        let battery_flow_sum = vec![Watt::ZERO; n];

        let mut state = Self {
            constant_start,
            constant_active,
            variable_alloc,
            variable_sum,
            battery_flow,
            battery_level,
            battery_flow_sum,
            net_demand: vec![Watt::ZERO; n],
        };
        state.full_recompute(instance);
        Ok(state)
    }

    pub fn net_demand(&self) -> &[Watt] {
        &self.net_demand
    }

    pub fn constant_start_step(&self, idx: usize) -> usize {
        self.constant_start[idx]
    }

    pub fn variable_allocation(&self, idx: usize) -> &[Watt] {
        &self.variable_alloc[idx]
    }

    pub fn battery_flow(&self, idx: usize) -> &[Watt] {
        &self.battery_flow[idx]
    }

    pub fn battery_level(&self, idx: usize) -> &[WattHour] {
        &self.battery_level[idx]
    }

    /// Recomputes every cached aggregate and the net-demand curve from the
    /// decision vectors. Used once at construction and periodically as a
    /// drift audit; never in the per-move hot path.
    pub fn full_recompute(&mut self, instance: &Instance) {
        let n = instance.steps();

        for bucket in &mut self.constant_active {
            bucket.clear();
        }
        for (idx, &start) in self.constant_start.iter().enumerate() {
            let duration_steps = instance.constant_duration_steps(idx);
            for step in start..start + duration_steps {
                self.constant_active[step].push(idx);
            }
        }

        self.variable_sum.iter_mut().for_each(|v| *v = Watt::ZERO);
        for (idx, alloc) in self.variable_alloc.iter().enumerate() {
            let window = instance.variable_window(idx);
            for (offset, &value) in alloc.iter().enumerate() {
                self.variable_sum[window.start + offset] += value;
            }
        }

        self.battery_flow_sum.iter_mut().for_each(|v| *v = Watt::ZERO);
        for (b_idx, flow) in self.battery_flow.iter().enumerate() {
            let step = instance.grid().step_len();
            let mut level = instance.batteries()[b_idx].initial_charge;
            self.battery_level[b_idx][0] = level;
            for i in 0..n {
                self.battery_flow_sum[i] += flow[i];
                level += flow[i].over(duration_to_std(step));
                self.battery_level[b_idx][i + 1] = level;
            }
        }

        for i in 0..n {
            let constant_power: Watt = self.constant_active[i]
                .iter()
                .map(|&idx| instance.constants()[idx].power)
                .fold(Watt::ZERO, |acc, p| acc + p);
            self.net_demand[i] = instance.baseline()[i]
                + constant_power
                + self.variable_sum[i]
                + self.battery_flow_sum[i]
                - instance.generation()[i];
        }
    }
}

fn duration_to_std(d: chrono::Duration) -> std::time::Duration {
    d.to_std().unwrap_or(std::time::Duration::ZERO)
}

/// Spreads `total_energy` evenly over `steps` timesteps, each capped at
/// `max_power`. The cap is uniform across steps, so if `total_energy` fits
/// within the combined capacity (guaranteed by instance construction) the
/// uniform share never exceeds the cap and no further redistribution is
/// needed.
fn initial_uniform_allocation(
    total_energy: WattHour,
    max_power: Watt,
    step: std::time::Duration,
    steps: usize,
) -> Vec<Watt> {
    if steps == 0 {
        return Vec::new();
    }
    let share = (total_energy / steps as f64).per(step);
    let share = share.clamp(Watt::ZERO, max_power);
    vec![share; steps]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Battery, ConstantAction, VariableAction};
    use crate::prognosis::Prognosis;
    use crate::time_grid::TimeGrid;
    use chrono::{DateTime, Duration, Utc};
    use fluxion_types::{BatteryId, ConstantActionId, EuroPerWh, VariableActionId};

    fn grid() -> TimeGrid {
        let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        TimeGrid::new(start, Duration::hours(1), 4).unwrap()
    }

    #[test]
    fn initial_allocation_spreads_uniformly_within_cap() {
        let alloc = initial_uniform_allocation(WattHour(2000.0), Watt(1000.0), std::time::Duration::from_secs(3600), 4);
        for w in alloc {
            assert!((w.0 - 500.0).abs() < 1e-6);
        }
    }

    #[test]
    fn initial_state_places_constant_action_at_earliest_step() {
        let grid = grid();
        let prognosis = Prognosis {
            price: vec![EuroPerWh(0.00001); grid.steps()],
            generation: vec![WattHour::ZERO; grid.steps()],
        };
        let action = ConstantAction {
            id: ConstantActionId(0),
            earliest_start: grid.horizon_start(),
            latest_end: grid.horizon_end(),
            duration: Duration::hours(1),
            power: Watt(1000.0),
        };
        let instance = Instance::new(grid, prognosis, vec![action], vec![], vec![], vec![]).unwrap();
        let state = ScheduleState::initial(&instance).unwrap();
        assert_eq!(state.constant_start_step(0), 0);
        assert_eq!(state.net_demand()[0].0, 1000.0);
    }

    #[test]
    fn battery_starts_idle_with_initial_charge_held() {
        let grid = grid();
        let prognosis = Prognosis {
            price: vec![EuroPerWh(0.00001); grid.steps()],
            generation: vec![WattHour::ZERO; grid.steps()],
        };
        let battery = Battery {
            id: BatteryId(0),
            capacity: WattHour(2000.0),
            max_charge_rate: Watt(1000.0),
            max_discharge_rate: Watt(1000.0),
            initial_charge: WattHour(500.0),
        };
        let instance = Instance::new(grid, prognosis, vec![], vec![], vec![battery], vec![]).unwrap();
        let state = ScheduleState::initial(&instance).unwrap();
        assert_eq!(state.battery_level(0)[0].0, 500.0);
        assert_eq!(state.battery_level(0)[4].0, 500.0);
    }

    #[test]
    fn variable_action_contributes_to_net_demand() {
        let grid = grid();
        let prognosis = Prognosis {
            price: vec![EuroPerWh(0.00001); grid.steps()],
            generation: vec![WattHour::ZERO; grid.steps()],
        };
        let action = VariableAction {
            id: VariableActionId(0),
            window_start: grid.horizon_start(),
            window_end: grid.horizon_end(),
            total_energy: WattHour(2000.0),
            max_power: Watt(1000.0),
        };
        let instance = Instance::new(grid, prognosis, vec![], vec![action], vec![], vec![]).unwrap();
        let state = ScheduleState::initial(&instance).unwrap();
        for i in 0..4 {
            assert!((state.net_demand()[i].0 - 500.0).abs() < 1e-6);
        }
    }
}
