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

//! Command-line front end for the schedule optimizer: reads a solve request
//! from a JSON file, runs it through [`fluxion_core::ScheduleContext`], and
//! writes the resulting schedule back out as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;

use fluxion_core::{Battery, CancellationToken, ConstantAction, PastConstantAction, ScheduleContext, SolverConfig, VariableAction};
use fluxion_plugins::TableProvider;
use fluxion_shared::SolveTelemetry;
use fluxion_types::{EuroPerWh, Schedule, WattHour};

#[derive(Debug, Parser)]
#[command(name = "fluxion", version, about = "Cost-minimizing load and battery schedule optimizer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve a scheduling instance described by a JSON request file.
    Solve {
        /// Path to a JSON-encoded `SolveRequest`.
        input: PathBuf,
        /// Where to write the resulting schedule. Printed to stdout if omitted.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Overrides the request's RNG seed, for reproducing a specific run.
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    fluxion_shared::init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Solve { input, output, seed } => run_solve(&input, output.as_deref(), seed),
    }
}

/// One price or generation sample in the request's prognosis tables. Generic
/// over the sampled quantity so that deserialization runs through that
/// quantity's own finiteness check (see `fluxion_types::units`) rather than
/// passing a bare `f64` through unchecked.
#[derive(Debug, Deserialize)]
struct Sample<Q> {
    at: DateTime<Utc>,
    value: Q,
}

/// On-disk shape of a single solve invocation.
#[derive(Debug, Deserialize)]
struct SolveRequest {
    start: DateTime<Utc>,
    horizon_hours: f64,
    step_minutes: i64,
    price_eur_per_wh: Vec<Sample<EuroPerWh>>,
    #[serde(default)]
    generation_wh: Vec<Sample<WattHour>>,
    #[serde(default)]
    constant_actions: Vec<ConstantAction>,
    #[serde(default)]
    variable_actions: Vec<VariableAction>,
    #[serde(default)]
    batteries: Vec<Battery>,
    #[serde(default)]
    past_actions: Vec<PastConstantAction>,
    #[serde(default)]
    config: Option<SolverConfig>,
}

fn run_solve(input: &Path, output: Option<&Path>, seed_override: Option<u64>) -> Result<()> {
    let raw = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let request: SolveRequest = serde_json::from_str(&raw).with_context(|| format!("parsing {}", input.display()))?;

    let horizon = Duration::milliseconds((request.horizon_hours * 3_600_000.0).round() as i64);
    let step = Duration::minutes(request.step_minutes);
    let table_end = request.start + horizon;

    let price_entries: Vec<(DateTime<Utc>, EuroPerWh)> = request.price_eur_per_wh.iter().map(|s| (s.at, s.value)).collect();
    let price_provider = TableProvider::new(price_entries, table_end);

    let generation_entries: Vec<(DateTime<Utc>, WattHour)> = request.generation_wh.iter().map(|s| (s.at, s.value)).collect();
    let generation_provider = (!generation_entries.is_empty()).then(|| TableProvider::new(generation_entries, table_end));

    let mut config = request.config.unwrap_or_default();
    if let Some(seed) = seed_override {
        config.rng_seed = seed;
    }

    let mut ctx = ScheduleContext::new(request.start, horizon, step, &price_provider)
        .with_constant_actions(request.constant_actions)
        .with_variable_actions(request.variable_actions)
        .with_batteries(request.batteries)
        .with_past_actions(request.past_actions);
    if let Some(provider) = &generation_provider {
        ctx = ctx.with_generation_provider(provider);
    }

    info!(input = %input.display(), "starting solve");
    let cancellation = CancellationToken::new();
    let started_at = Utc::now();
    let (total_cost, schedule, stats) = ctx.solve_with_stats(&config, &cancellation)?;
    let telemetry = SolveTelemetry {
        started_at,
        finished_at: Utc::now(),
        iterations: stats.iterations,
        accepted_moves: stats.accepted_moves,
        rejected_moves: stats.rejected_moves,
        initial_temperature: stats.initial_temperature,
        final_temperature: stats.final_temperature,
        initial_cost_eur: stats.initial_cost.0,
        best_cost_eur: stats.best_cost.0,
        cancelled: stats.cancelled,
    };
    info!(
        total_cost = %total_cost,
        iterations = telemetry.iterations,
        acceptance_rate = telemetry.acceptance_rate(),
        improvement_eur = telemetry.improvement_eur(),
        "solve finished"
    );

    write_schedule(&schedule, output)
}

fn write_schedule(schedule: &Schedule, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(schedule)?;
    match output {
        Some(path) => fs::write(path, json).with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
