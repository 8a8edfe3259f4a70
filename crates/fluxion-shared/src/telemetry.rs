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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one annealer run, suitable for logging or export alongside
/// the schedule it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveTelemetry {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub iterations: u64,
    pub accepted_moves: u64,
    pub rejected_moves: u64,
    pub initial_temperature: f64,
    pub final_temperature: f64,
    pub initial_cost_eur: f64,
    pub best_cost_eur: f64,
    pub cancelled: bool,
}

impl SolveTelemetry {
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.accepted_moves + self.rejected_moves;
        if total == 0 {
            0.0
        } else {
            self.accepted_moves as f64 / total as f64
        }
    }

    pub fn improvement_eur(&self) -> f64 {
        self.initial_cost_eur - self.best_cost_eur
    }
}
