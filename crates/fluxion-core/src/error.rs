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

use fluxion_plugins::PrognosisError;
use thiserror::Error;

/// Everything that can make a solve fail to produce a schedule.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid horizon: {0}")]
    InvalidHorizon(String),

    #[error("no feasible initial state: {0}")]
    InfeasibleInstance(String),

    #[error("prognosis provider failed: {0}")]
    PrognosisUnavailable(#[from] PrognosisError),

    #[error("numerical drift detected: incremental cost {incremental} vs recomputed {full} (tolerance {tolerance})")]
    Numerical {
        incremental: f64,
        full: f64,
        tolerance: f64,
    },
}

pub type SolveResult<T> = Result<T, SolveError>;
