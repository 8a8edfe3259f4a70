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

//! Cost-minimizing schedule optimizer.
//!
//! Given a price forecast, optional generation forecast, and a set of
//! deferrable loads and batteries, [`ScheduleContext::solve`] runs a
//! simulated-annealing search over load placements, load allocations and
//! battery flows and returns the cheapest feasible schedule it finds.
//!
//! Typical use:
//!
//! ```no_run
//! use chrono::{DateTime, Duration, Utc};
//! use fluxion_core::{CancellationToken, ScheduleContext, SolverConfig};
//! use fluxion_plugins::FnProvider;
//! use fluxion_types::EuroPerWh;
//!
//! let start: DateTime<Utc> = Utc::now();
//! let price = FnProvider::new(|_start, _end| Ok(EuroPerWh(0.00003)));
//! let ctx = ScheduleContext::new(start, Duration::hours(24), Duration::minutes(15), &price);
//! let (total_cost, schedule) = ctx.solve(&SolverConfig::default(), &CancellationToken::new())?;
//! # Ok::<(), fluxion_core::SolveError>(())
//! ```

pub mod actions;
pub mod annealer;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod cost;
pub mod error;
pub mod feasibility;
pub mod instance;
pub mod materializer;
pub mod moves;
pub mod prognosis;
pub mod schedule_state;
pub mod time_grid;

pub use actions::{Battery, ConstantAction, PastConstantAction, VariableAction};
pub use annealer::SolveStats;
pub use cancellation::CancellationToken;
pub use config::{MoveWeights, SolverConfig};
pub use context::ScheduleContext;
pub use error::{SolveError, SolveResult};
pub use instance::{Instance, StepWindow};
pub use prognosis::Prognosis;
pub use schedule_state::ScheduleState;
pub use time_grid::TimeGrid;
