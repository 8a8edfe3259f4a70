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

//! Caller-supplied entities: the loads and batteries a solve schedules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fluxion_types::{BatteryId, ConstantActionId, VariableActionId, Watt, WattHour};

/// A deferrable load of fixed shape: only its start time is a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantAction {
    pub id: ConstantActionId,
    /// Earliest instant the action may start.
    pub earliest_start: DateTime<Utc>,
    /// Latest instant by which the action must have finished.
    pub latest_end: DateTime<Utc>,
    pub duration: chrono::Duration,
    pub power: Watt,
}

/// A deferrable load whose per-step consumption is itself a decision,
/// subject to a total-energy target and a per-step power cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableAction {
    pub id: VariableActionId,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub total_energy: WattHour,
    pub max_power: Watt,
}

/// A storage element scheduled alongside loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    pub id: BatteryId,
    pub capacity: WattHour,
    pub max_charge_rate: Watt,
    pub max_discharge_rate: Watt,
    pub initial_charge: WattHour,
}

/// An already-committed constant action contributing to the baseline load
/// curve. Not a decision variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PastConstantAction {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub power: Watt,
}

impl ConstantAction {
    /// The latest step a placement may start at, given `steps` covered and
    /// the action spanning `window_steps` grid steps total. Inclusive range
    /// is `[earliest_step, latest_start_step]`.
    pub fn feasible_start_range(&self, earliest_step: usize, window_steps: usize, duration_steps: usize) -> Option<(usize, usize)> {
        if duration_steps > window_steps {
            return None;
        }
        let latest_start = earliest_step + (window_steps - duration_steps);
        Some((earliest_step, latest_start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feasible_start_range_excludes_overhang() {
        let action = ConstantAction {
            id: ConstantActionId(0),
            earliest_start: Utc::now(),
            latest_end: Utc::now(),
            duration: chrono::Duration::hours(1),
            power: Watt(1000.0),
        };
        assert_eq!(action.feasible_start_range(0, 24, 1), Some((0, 23)));
        assert_eq!(action.feasible_start_range(0, 1, 2), None);
    }
}
