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

//! Output types produced by a completed solve.
//!
//! These are plain data, independent of the annealer's internal
//! representation, meant to be serialized and handed to a caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BatteryId, ConstantActionId, VariableActionId};
use crate::units::{Euro, Watt, WattHour};

/// A constant-power action placed at a concrete start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedConstantAction {
    pub action_id: ConstantActionId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub power: Watt,
    pub energy: WattHour,
    pub cost: Euro,
}

/// A variable-power action's per-step allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedVariableAction {
    pub action_id: VariableActionId,
    /// One entry per timestep of the horizon, in chronological order.
    pub allocation: Vec<Watt>,
    pub total_energy: WattHour,
    pub cost: Euro,
}

/// A single battery's per-step charge/discharge flow and resulting level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedBattery {
    pub battery_id: BatteryId,
    /// Positive is charging, negative is discharging, one entry per timestep.
    pub flow: Vec<Watt>,
    /// Charge level at the *start* of each timestep, one entry per timestep.
    pub level: Vec<WattHour>,
    pub net_cost: Euro,
}

/// The full result of a solve: a placement for every action and battery,
/// plus the objective value the annealer converged to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub horizon_start: DateTime<Utc>,
    pub horizon_end: DateTime<Utc>,
    pub constant_actions: Vec<AssignedConstantAction>,
    pub variable_actions: Vec<AssignedVariableAction>,
    pub batteries: Vec<AssignedBattery>,
    pub total_cost: Euro,
    /// Number of annealing iterations actually performed.
    pub iterations: u64,
    /// True if the run terminated because of a caller-requested cancellation
    /// rather than convergence; the schedule still reflects the best state
    /// found before cancellation.
    pub cancelled: bool,
}

impl Schedule {
    /// The constant action assigned to `id`, if any.
    pub fn constant_action(&self, id: ConstantActionId) -> Option<&AssignedConstantAction> {
        self.constant_actions.iter().find(|a| a.action_id == id)
    }

    /// The variable action assigned to `id`, if any.
    pub fn variable_action(&self, id: VariableActionId) -> Option<&AssignedVariableAction> {
        self.variable_actions.iter().find(|a| a.action_id == id)
    }

    /// The battery plan for `id`, if any.
    pub fn battery(&self, id: BatteryId) -> Option<&AssignedBattery> {
        self.batteries.iter().find(|b| b.battery_id == id)
    }

    /// Whether `at` falls within `[horizon_start, horizon_end)`.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        at >= self.horizon_start && at < self.horizon_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_schedule() -> Schedule {
        let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Schedule {
            horizon_start: start,
            horizon_end: start + Duration::hours(24),
            constant_actions: vec![AssignedConstantAction {
                action_id: ConstantActionId(0),
                start,
                end: start + Duration::hours(1),
                power: Watt(2000.0),
                energy: WattHour(2000.0),
                cost: Euro(0.20),
            }],
            variable_actions: vec![],
            batteries: vec![],
            total_cost: Euro(0.20),
            iterations: 100,
            cancelled: false,
        }
    }

    #[test]
    fn looks_up_constant_action_by_id() {
        let schedule = sample_schedule();
        assert!(schedule.constant_action(ConstantActionId(0)).is_some());
        assert!(schedule.constant_action(ConstantActionId(1)).is_none());
    }

    #[test]
    fn covers_checks_half_open_horizon() {
        let schedule = sample_schedule();
        assert!(schedule.covers(schedule.horizon_start));
        assert!(!schedule.covers(schedule.horizon_end));
    }
}
