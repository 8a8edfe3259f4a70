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

//! Neighbor generation: proposes a small local perturbation of the schedule
//! state, applies it speculatively, and hands back enough information for
//! the caller to either keep it or undo it. The generator owns its scratch
//! buffers so proposing a move never allocates once they have grown to
//! their steady-state size.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use fluxion_types::{Euro, Watt};

use crate::config::MoveWeights;
use crate::cost;
use crate::feasibility;
use crate::instance::Instance;
use crate::schedule_state::ScheduleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    ShiftConstant,
    ReallocateVariable,
    PerturbBattery,
}

/// Enough information to revert a speculatively-applied move.
#[derive(Debug, Clone, Copy)]
pub enum Undo {
    ShiftConstant { idx: usize, old_start: usize },
    Reallocate { idx: usize, i: usize, j: usize, old_xi: Watt, old_xj: Watt },
    PerturbBattery { idx: usize, i: usize, j: usize, delta: Watt },
}

/// A move that was applied to the state, pending accept/reject.
pub struct Proposal {
    pub kind: MoveKind,
    pub delta: Euro,
    pub feasible: bool,
    pub undo: Undo,
}

pub struct MoveGenerator {
    rng: StdRng,
    weights: MoveWeights,
    touched_steps: Vec<usize>,
    old_demand: Vec<Watt>,
    variable_candidates: Vec<usize>,
}

impl MoveGenerator {
    pub fn new(seed: u64, weights: MoveWeights) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            weights,
            touched_steps: Vec::new(),
            old_demand: Vec::new(),
            variable_candidates: Vec::new(),
        }
    }

    /// Draws `count` independent `|delta J|` samples from random moves on
    /// `state`, undoing each immediately. Used to estimate the initial
    /// annealing temperature; does not leave a lasting effect on `state`.
    pub fn sample_abs_deltas(&mut self, instance: &Instance, state: &mut ScheduleState, count: u64) -> Vec<f64> {
        let mut samples = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if let Some(proposal) = self.propose(instance, state) {
                samples.push(proposal.delta.0.abs());
                self.undo(instance, state, proposal.undo);
            }
        }
        samples
    }

    /// Proposes and speculatively applies one move. Returns `None` if the
    /// instance has nothing to move (no constant actions, variable actions,
    /// or batteries at all).
    pub fn propose(&mut self, instance: &Instance, state: &mut ScheduleState) -> Option<Proposal> {
        let kind = pick_category(
            &mut self.rng,
            &self.weights,
            !instance.constants().is_empty(),
            instance.variables().iter().enumerate().any(|(i, _)| instance.variable_window(i).len() >= 2),
            !instance.batteries().is_empty(),
        )?;

        match kind {
            MoveKind::ShiftConstant => self.propose_shift_constant(instance, state),
            MoveKind::ReallocateVariable => self.propose_reallocate_variable(instance, state),
            MoveKind::PerturbBattery => self.propose_perturb_battery(instance, state),
        }
    }

    pub fn undo(&mut self, instance: &Instance, state: &mut ScheduleState, undo: Undo) {
        match undo {
            Undo::ShiftConstant { idx, old_start } => {
                mutate_constant_shift(instance, state, idx, old_start, &mut self.touched_steps, &mut self.old_demand);
            }
            Undo::Reallocate { idx, i, j, old_xi, old_xj } => {
                mutate_variable_set(instance, state, idx, i, j, old_xi, old_xj, &mut self.touched_steps, &mut self.old_demand);
            }
            Undo::PerturbBattery { idx, i, j, delta } => {
                mutate_battery_perturb(instance, state, idx, i, j, -delta, &mut self.touched_steps, &mut self.old_demand);
            }
        }
    }

    fn propose_shift_constant(&mut self, instance: &Instance, state: &mut ScheduleState) -> Option<Proposal> {
        let idx = self.rng.gen_range(0..instance.constants().len());
        let (lo, hi) = instance.constant_feasible_range(idx);
        if lo >= hi {
            return None;
        }
        let new_start = self.rng.gen_range(lo..=hi);
        let old_start = mutate_constant_shift(instance, state, idx, new_start, &mut self.touched_steps, &mut self.old_demand);
        let delta = cost::incremental_delta(instance, &self.touched_steps, &self.old_demand, state.net_demand());
        let feasible = feasibility::constant_shift_feasible(new_start, (lo, hi));
        Some(Proposal {
            kind: MoveKind::ShiftConstant,
            delta,
            feasible,
            undo: Undo::ShiftConstant { idx, old_start },
        })
    }

    fn propose_reallocate_variable(&mut self, instance: &Instance, state: &mut ScheduleState) -> Option<Proposal> {
        self.variable_candidates.clear();
        for i in 0..instance.variables().len() {
            if instance.variable_window(i).len() >= 2 {
                self.variable_candidates.push(i);
            }
        }
        if self.variable_candidates.is_empty() {
            return None;
        }
        let pick = self.rng.gen_range(0..self.variable_candidates.len());
        let idx = self.variable_candidates[pick];
        let window = instance.variable_window(idx);
        let action = &instance.variables()[idx];
        let i = self.rng.gen_range(0..window.len());
        let mut j = self.rng.gen_range(0..window.len() - 1);
        if j >= i {
            j += 1;
        }

        let x_i = state.variable_allocation(idx)[i];
        let x_j = state.variable_allocation(idx)[j];
        let delta_max = x_i.min(action.max_power - x_j);
        if delta_max.0 <= 0.0 {
            return None;
        }
        let delta = Watt(self.rng.gen_range(0.0..=delta_max.0));
        let new_xi = x_i - delta;
        let new_xj = x_j + delta;

        let (old_xi, old_xj) =
            mutate_variable_set(instance, state, idx, i, j, new_xi, new_xj, &mut self.touched_steps, &mut self.old_demand);
        let delta_j = cost::incremental_delta(instance, &self.touched_steps, &self.old_demand, state.net_demand());

        let step_std = std_step(instance);
        let feasible = feasibility::variable_reallocation_feasible(
            state.variable_allocation(idx),
            action.max_power,
            action.total_energy,
            step_std,
        );

        Some(Proposal {
            kind: MoveKind::ReallocateVariable,
            delta: delta_j,
            feasible,
            undo: Undo::Reallocate { idx, i, j, old_xi, old_xj },
        })
    }

    fn propose_perturb_battery(&mut self, instance: &Instance, state: &mut ScheduleState) -> Option<Proposal> {
        let n = instance.steps();
        if n < 2 {
            return None;
        }
        let idx = self.rng.gen_range(0..instance.batteries().len());
        let battery = &instance.batteries()[idx];
        let i = self.rng.gen_range(0..n);
        let mut j = self.rng.gen_range(0..n - 1);
        if j >= i {
            j += 1;
        }

        let flow = state.battery_flow(idx);
        let f_i = flow[i];
        let f_j = flow[j];
        let lo = (-battery.max_discharge_rate - f_i).max(f_j - battery.max_charge_rate);
        let hi = (battery.max_charge_rate - f_i).min(f_j + battery.max_discharge_rate);
        if lo.0 >= hi.0 {
            return None;
        }
        let delta = Watt(self.rng.gen_range(lo.0..=hi.0));

        let from_step = mutate_battery_perturb(instance, state, idx, i, j, delta, &mut self.touched_steps, &mut self.old_demand);
        let delta_j = cost::incremental_delta(instance, &self.touched_steps, &self.old_demand, state.net_demand());

        let step_std = std_step(instance);
        let feasible = feasibility::battery_flow_feasible(battery, state.battery_flow(idx), from_step, step_std);

        Some(Proposal {
            kind: MoveKind::PerturbBattery,
            delta: delta_j,
            feasible,
            undo: Undo::PerturbBattery { idx, i, j, delta },
        })
    }
}

fn pick_category(
    rng: &mut StdRng,
    weights: &MoveWeights,
    has_constant: bool,
    has_variable: bool,
    has_battery: bool,
) -> Option<MoveKind> {
    let slots: [(bool, f64, MoveKind); 3] = [
        (has_constant, weights.shift_constant.max(0.0), MoveKind::ShiftConstant),
        (has_variable, weights.reallocate_variable.max(0.0), MoveKind::ReallocateVariable),
        (has_battery, weights.perturb_battery.max(0.0), MoveKind::PerturbBattery),
    ];
    let total: f64 = slots.iter().filter(|(enabled, _, _)| *enabled).map(|(_, weight, _)| weight).sum();
    if total <= 0.0 {
        return None;
    }
    let mut pick = rng.gen_range(0.0..total);
    let mut last = None;
    for &(enabled, weight, kind) in &slots {
        if !enabled {
            continue;
        }
        last = Some(kind);
        if pick < weight {
            return Some(kind);
        }
        pick -= weight;
    }
    last
}

fn std_step(instance: &Instance) -> std::time::Duration {
    instance.grid().step_len().to_std().unwrap_or(std::time::Duration::ZERO)
}

/// Moves constant action `idx` to `new_start`, updating the reverse index
/// and net demand. Self-inverse: calling it again with the returned old
/// start undoes it.
fn mutate_constant_shift(
    instance: &Instance,
    state: &mut ScheduleState,
    idx: usize,
    new_start: usize,
    touched: &mut Vec<usize>,
    old_demand: &mut Vec<Watt>,
) -> usize {
    let old_start = state.constant_start[idx];
    touched.clear();
    old_demand.clear();
    if old_start == new_start {
        return old_start;
    }
    let duration = instance.constant_duration_steps(idx);
    let power = instance.constants()[idx].power;

    for s in old_start..old_start + duration {
        touched.push(s);
    }
    for s in new_start..new_start + duration {
        touched.push(s);
    }
    for &s in touched.iter() {
        old_demand.push(state.net_demand[s]);
    }

    for s in old_start..old_start + duration {
        state.constant_active[s].retain(|&x| x != idx);
        state.net_demand[s] -= power;
    }
    for s in new_start..new_start + duration {
        state.constant_active[s].push(idx);
        state.net_demand[s] += power;
    }
    state.constant_start[idx] = new_start;
    old_start
}

/// Sets variable action `idx`'s allocation at steps `i` and `j` to
/// `new_xi`/`new_xj`, returning the previous values. Self-inverse.
fn mutate_variable_set(
    instance: &Instance,
    state: &mut ScheduleState,
    idx: usize,
    i: usize,
    j: usize,
    new_xi: Watt,
    new_xj: Watt,
    touched: &mut Vec<usize>,
    old_demand: &mut Vec<Watt>,
) -> (Watt, Watt) {
    let window = instance.variable_window(idx);
    let global_i = window.start + i;
    let global_j = window.start + j;

    touched.clear();
    old_demand.clear();
    touched.push(global_i);
    touched.push(global_j);
    old_demand.push(state.net_demand[global_i]);
    old_demand.push(state.net_demand[global_j]);

    let old_xi = state.variable_alloc[idx][i];
    let old_xj = state.variable_alloc[idx][j];
    let delta_i = new_xi - old_xi;
    let delta_j = new_xj - old_xj;

    state.variable_alloc[idx][i] = new_xi;
    state.variable_alloc[idx][j] = new_xj;
    state.variable_sum[global_i] += delta_i;
    state.variable_sum[global_j] += delta_j;
    state.net_demand[global_i] += delta_i;
    state.net_demand[global_j] += delta_j;

    (old_xi, old_xj)
}

/// Applies `f_i += delta, f_j -= delta` to battery `idx`'s flow, updates the
/// cached level for every step strictly between `min(i,j)` and `max(i,j)`
/// (the only levels a terminal-charge-preserving pair can move), and
/// returns `min(i,j)` — the first step a feasibility scan must cover.
/// Self-inverse under negation of `delta`.
fn mutate_battery_perturb(
    instance: &Instance,
    state: &mut ScheduleState,
    idx: usize,
    i: usize,
    j: usize,
    delta: Watt,
    touched: &mut Vec<usize>,
    old_demand: &mut Vec<Watt>,
) -> usize {
    touched.clear();
    old_demand.clear();
    touched.push(i);
    touched.push(j);
    old_demand.push(state.net_demand[i]);
    old_demand.push(state.net_demand[j]);

    state.battery_flow[idx][i] += delta;
    state.battery_flow[idx][j] -= delta;
    state.battery_flow_sum[i] += delta;
    state.battery_flow_sum[j] -= delta;
    state.net_demand[i] += delta;
    state.net_demand[j] -= delta;

    let step = instance.grid().step_len().to_std().unwrap_or(std::time::Duration::ZERO);
    let delta_energy = delta.over(step);
    let (lo, hi, sign) = if i < j { (i, j, 1.0) } else { (j, i, -1.0) };
    for level in &mut state.battery_level[idx][lo + 1..=hi] {
        *level += delta_energy * sign;
    }

    lo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Battery, ConstantAction, VariableAction};
    use crate::config::MoveWeights;
    use crate::prognosis::Prognosis;
    use crate::schedule_state::ScheduleState;
    use crate::time_grid::TimeGrid;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use fluxion_types::{BatteryId, ConstantActionId, EuroPerWh, VariableActionId, WattHour};

    fn grid() -> TimeGrid {
        let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        TimeGrid::new(start, ChronoDuration::hours(1), 8).unwrap()
    }

    fn flat_prognosis(grid: &TimeGrid) -> Prognosis {
        Prognosis {
            price: vec![EuroPerWh(0.00001); grid.steps()],
            generation: vec![WattHour::ZERO; grid.steps()],
        }
    }

    fn full_instance() -> Instance {
        let grid = grid();
        let prognosis = flat_prognosis(&grid);
        let constant = ConstantAction {
            id: ConstantActionId(0),
            earliest_start: grid.horizon_start(),
            latest_end: grid.horizon_end(),
            duration: ChronoDuration::hours(1),
            power: Watt(1000.0),
        };
        let variable = VariableAction {
            id: VariableActionId(0),
            window_start: grid.horizon_start(),
            window_end: grid.horizon_end(),
            total_energy: WattHour(4000.0),
            max_power: Watt(1000.0),
        };
        let battery = Battery {
            id: BatteryId(0),
            capacity: WattHour(4000.0),
            max_charge_rate: Watt(1000.0),
            max_discharge_rate: Watt(1000.0),
            initial_charge: WattHour(2000.0),
        };
        Instance::new(grid, prognosis, vec![constant], vec![variable], vec![battery], vec![]).unwrap()
    }

    #[test]
    fn shift_constant_undo_restores_net_demand() {
        let instance = full_instance();
        let mut state = ScheduleState::initial(&instance).unwrap();
        let before = state.net_demand().to_vec();

        let mut generator = MoveGenerator::new(1, MoveWeights { shift_constant: 1.0, reallocate_variable: 0.0, perturb_battery: 0.0 });
        for _ in 0..20 {
            let proposal = generator.propose(&instance, &mut state).expect("a constant action to move");
            assert_eq!(proposal.kind, MoveKind::ShiftConstant);
            generator.undo(&instance, &mut state, proposal.undo);
        }
        assert_eq!(state.net_demand(), before.as_slice());
    }

    #[test]
    fn reallocate_variable_undo_restores_net_demand() {
        let instance = full_instance();
        let mut state = ScheduleState::initial(&instance).unwrap();
        let before = state.net_demand().to_vec();

        let mut generator = MoveGenerator::new(2, MoveWeights { shift_constant: 0.0, reallocate_variable: 1.0, perturb_battery: 0.0 });
        for _ in 0..20 {
            if let Some(proposal) = generator.propose(&instance, &mut state) {
                assert_eq!(proposal.kind, MoveKind::ReallocateVariable);
                generator.undo(&instance, &mut state, proposal.undo);
            }
        }
        assert_eq!(state.net_demand(), before.as_slice());
    }

    #[test]
    fn perturb_battery_undo_restores_net_demand_and_level() {
        let instance = full_instance();
        let mut state = ScheduleState::initial(&instance).unwrap();
        let before_demand = state.net_demand().to_vec();
        let before_level = state.battery_level(0).to_vec();

        let mut generator = MoveGenerator::new(3, MoveWeights { shift_constant: 0.0, reallocate_variable: 0.0, perturb_battery: 1.0 });
        for _ in 0..20 {
            let proposal = generator.propose(&instance, &mut state).expect("a battery move");
            assert_eq!(proposal.kind, MoveKind::PerturbBattery);
            generator.undo(&instance, &mut state, proposal.undo);
        }
        assert_eq!(state.net_demand(), before_demand.as_slice());
        assert_eq!(state.battery_level(0), before_level.as_slice());
    }

    #[test]
    fn accepted_move_matches_a_full_recompute() {
        let instance = full_instance();
        let mut state = ScheduleState::initial(&instance).unwrap();

        let mut generator = MoveGenerator::new(4, MoveWeights::default());
        let proposal = generator.propose(&instance, &mut state).expect("some move to exist");
        let incremental_cost = cost::total_cost(&instance, &state);

        let mut recomputed = state.clone();
        recomputed.full_recompute(&instance);
        assert!((cost::total_cost(&instance, &recomputed).0 - incremental_cost.0).abs() < 1e-9);
        let _ = proposal;
    }

    #[test]
    fn pick_category_skips_empty_categories() {
        let mut rng = StdRng::seed_from_u64(7);
        let weights = MoveWeights { shift_constant: 1.0, reallocate_variable: 1.0, perturb_battery: 1.0 };
        for _ in 0..50 {
            let kind = pick_category(&mut rng, &weights, false, false, true);
            assert_eq!(kind, Some(MoveKind::PerturbBattery));
        }
        assert_eq!(pick_category(&mut rng, &weights, false, false, false), None);
    }
}
