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

//! The one type callers build directly: a [`ScheduleContext`] collects the
//! horizon, prognosis providers, loads and batteries for a single batch
//! solve, then [`ScheduleContext::solve`] wires together every other module
//! in the crate — grid, sampler, instance, initial state, annealer,
//! materializer — and hands back the priced result.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use fluxion_plugins::PrognosisProvider;
use fluxion_types::{Euro, EuroPerWh, Schedule, WattHour};

use crate::actions::{Battery, ConstantAction, PastConstantAction, VariableAction};
use crate::annealer::{self, SolveStats};
use crate::cancellation::CancellationToken;
use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::instance::Instance;
use crate::materializer;
use crate::prognosis::Prognosis;
use crate::schedule_state::ScheduleState;
use crate::time_grid::TimeGrid;

/// A single solve's inputs: horizon, prognosis sources, and the entities to
/// schedule. Assembled with the `with_*` builder methods and consumed by
/// [`ScheduleContext::solve`].
pub struct ScheduleContext<'p> {
    start: DateTime<Utc>,
    horizon: Duration,
    step: Duration,
    price_provider: &'p dyn PrognosisProvider<EuroPerWh>,
    generation_provider: Option<&'p dyn PrognosisProvider<WattHour>>,
    constants: Vec<ConstantAction>,
    variables: Vec<VariableAction>,
    batteries: Vec<Battery>,
    past_actions: Vec<PastConstantAction>,
}

impl<'p> ScheduleContext<'p> {
    /// Starts a context for the horizon `[start, start + horizon)`,
    /// discretized into steps of `step`. `price_provider` is consulted once
    /// per step at [`Self::solve`] time; it is the only mandatory prognosis.
    pub fn new(
        start: DateTime<Utc>,
        horizon: Duration,
        step: Duration,
        price_provider: &'p dyn PrognosisProvider<EuroPerWh>,
    ) -> Self {
        Self {
            start,
            horizon,
            step,
            price_provider,
            generation_provider: None,
            constants: Vec::new(),
            variables: Vec::new(),
            batteries: Vec::new(),
            past_actions: Vec::new(),
        }
    }

    /// Supplies on-site generation. Steps are treated as zero generation if
    /// this is never called.
    pub fn with_generation_provider(mut self, provider: &'p dyn PrognosisProvider<WattHour>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    pub fn with_constant_action(mut self, action: ConstantAction) -> Self {
        self.constants.push(action);
        self
    }

    pub fn with_constant_actions(mut self, actions: impl IntoIterator<Item = ConstantAction>) -> Self {
        self.constants.extend(actions);
        self
    }

    pub fn with_variable_action(mut self, action: VariableAction) -> Self {
        self.variables.push(action);
        self
    }

    pub fn with_variable_actions(mut self, actions: impl IntoIterator<Item = VariableAction>) -> Self {
        self.variables.extend(actions);
        self
    }

    pub fn with_battery(mut self, battery: Battery) -> Self {
        self.batteries.push(battery);
        self
    }

    pub fn with_batteries(mut self, batteries: impl IntoIterator<Item = Battery>) -> Self {
        self.batteries.extend(batteries);
        self
    }

    pub fn with_past_action(mut self, action: PastConstantAction) -> Self {
        self.past_actions.push(action);
        self
    }

    pub fn with_past_actions(mut self, actions: impl IntoIterator<Item = PastConstantAction>) -> Self {
        self.past_actions.extend(actions);
        self
    }

    /// Runs one batch solve: builds the grid, samples the prognosis
    /// providers exactly once, validates every entity against the grid,
    /// constructs the canonical initial feasible state, anneals, and
    /// materializes the best state found. Validation errors
    /// (`InvalidInput`, `InvalidHorizon`, `InfeasibleInstance`) and prognosis
    /// failures are reported eagerly, before the annealing loop starts.
    pub fn solve(self, config: &SolverConfig, cancellation: &CancellationToken) -> Result<(Euro, Schedule), SolveError> {
        let (cost, schedule, _stats) = self.solve_with_stats(config, cancellation)?;
        Ok((cost, schedule))
    }

    /// Same as [`Self::solve`], but also returns the annealer's run
    /// statistics (iteration/acceptance counts, temperature trajectory) for
    /// a caller that wants to log or export them alongside the schedule —
    /// see `fluxion_shared::SolveTelemetry`.
    pub fn solve_with_stats(
        self,
        config: &SolverConfig,
        cancellation: &CancellationToken,
    ) -> Result<(Euro, Schedule, SolveStats), SolveError> {
        if self.horizon <= Duration::zero() {
            return Err(SolveError::InvalidHorizon("horizon must be positive".into()));
        }
        if self.step <= Duration::zero() {
            return Err(SolveError::InvalidHorizon("timestep must be positive".into()));
        }
        if self.horizon.num_milliseconds() % self.step.num_milliseconds() != 0 {
            return Err(SolveError::InvalidHorizon(format!(
                "horizon of {} seconds is not a multiple of the {}-second timestep",
                self.horizon.num_seconds(),
                self.step.num_seconds()
            )));
        }
        let steps = (self.horizon.num_milliseconds() / self.step.num_milliseconds()) as usize;
        let grid = TimeGrid::new(self.start, self.step, steps)?;

        let prognosis = Prognosis::sample(&grid, self.price_provider, self.generation_provider)?;

        info!(
            steps,
            constants = self.constants.len(),
            variables = self.variables.len(),
            batteries = self.batteries.len(),
            "building instance"
        );
        let instance = Instance::new(grid, prognosis, self.constants, self.variables, self.batteries, self.past_actions)?;

        let initial_state = ScheduleState::initial(&instance)?;
        let outcome = annealer::run(&instance, config, initial_state, cancellation)?;
        let stats = SolveStats::from(&outcome);

        let schedule = materializer::materialize(
            &instance,
            &outcome.best_state,
            outcome.best_cost,
            outcome.iterations,
            outcome.cancelled,
        );
        Ok((outcome.best_cost, schedule, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_plugins::FnProvider;
    use fluxion_types::{BatteryId, ConstantActionId, VariableActionId, Watt};

    fn t(hour: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::hours(hour)
    }

    #[test]
    fn empty_context_costs_only_the_baseline() {
        let price = FnProvider::new(|_s, _e| Ok(EuroPerWh(0.00001)));
        let ctx = ScheduleContext::new(t(0), Duration::hours(4), Duration::hours(1), &price);
        let (cost, schedule) = ctx.solve(&SolverConfig::default(), &CancellationToken::new()).unwrap();
        assert_eq!(cost.0, 0.0);
        assert!(schedule.constant_actions.is_empty());
        assert!(schedule.batteries.is_empty());
    }

    #[test]
    fn solve_with_stats_reports_the_same_cost_as_solve() {
        let price = FnProvider::new(|_s, _e| Ok(EuroPerWh(0.00001)));
        let ctx = ScheduleContext::new(t(0), Duration::hours(4), Duration::hours(1), &price);
        let (cost, schedule, stats) = ctx.solve_with_stats(&SolverConfig::default(), &CancellationToken::new()).unwrap();
        assert_eq!(cost.0, stats.best_cost.0);
        assert_eq!(schedule.iterations, stats.iterations);
        assert_eq!(schedule.cancelled, stats.cancelled);
    }

    #[test]
    fn rejects_horizon_not_a_multiple_of_step() {
        let price = FnProvider::new(|_s, _e| Ok(EuroPerWh(0.00001)));
        let ctx = ScheduleContext::new(t(0), Duration::minutes(90), Duration::hours(1), &price);
        let result = ctx.solve(&SolverConfig::default(), &CancellationToken::new());
        assert!(matches!(result, Err(SolveError::InvalidHorizon(_))));
    }

    #[test]
    fn schedules_a_constant_action_into_the_cheaper_half() {
        let price = FnProvider::new(|start: DateTime<Utc>, _end| {
            let hour = (start - t(0)).num_hours();
            Ok(if hour < 12 { EuroPerWh(0.00001) } else { EuroPerWh(0.0000001) })
        });
        let action = ConstantAction {
            id: ConstantActionId(0),
            earliest_start: t(0),
            latest_end: t(24),
            duration: Duration::hours(1),
            power: Watt(1000.0),
        };
        let mut config = SolverConfig::default();
        config.max_iterations = 20_000;
        let ctx = ScheduleContext::new(t(0), Duration::hours(24), Duration::hours(1), &price).with_constant_action(action);
        let (_cost, schedule) = ctx.solve(&config, &CancellationToken::new()).unwrap();
        let assigned = schedule.constant_action(ConstantActionId(0)).unwrap();
        let start_hour = (assigned.start - t(0)).num_hours();
        assert!(start_hour >= 12, "expected the cheap half, got hour {start_hour}");
    }

    #[test]
    fn variable_action_shifts_allocation_toward_the_cheap_half() {
        let price = FnProvider::new(|start: DateTime<Utc>, _end| {
            let hour = (start - t(0)).num_hours();
            Ok(if hour < 12 { EuroPerWh(0.0001) } else { EuroPerWh(0.000001) })
        });
        let action = VariableAction {
            id: VariableActionId(0),
            window_start: t(0),
            window_end: t(24),
            total_energy: WattHour(4000.0),
            max_power: Watt(1000.0),
        };
        let mut config = SolverConfig::default();
        config.max_iterations = 20_000;
        let ctx = ScheduleContext::new(t(0), Duration::hours(24), Duration::hours(1), &price).with_variable_action(action);
        let (_cost, schedule) = ctx.solve(&config, &CancellationToken::new()).unwrap();
        let assigned = schedule.variable_action(VariableActionId(0)).unwrap();

        let cheap_half: WattHour = assigned.allocation[12..].iter().map(|&w| w.over(std::time::Duration::from_secs(3600))).sum();
        let expensive_half: WattHour = assigned.allocation[..12].iter().map(|&w| w.over(std::time::Duration::from_secs(3600))).sum();
        assert!(
            cheap_half.0 > expensive_half.0,
            "expected most energy in the cheap half, got {cheap_half:?} vs {expensive_half:?}"
        );
    }

    #[test]
    fn battery_arbitrages_between_cheap_and_expensive_steps() {
        let price = FnProvider::new(|start: DateTime<Utc>, _end| {
            let hour = (start - t(0)).num_hours();
            Ok(if hour < 12 { EuroPerWh(0.00001) } else { EuroPerWh(0.0005) })
        });
        let battery = Battery {
            id: BatteryId(0),
            capacity: WattHour(4000.0),
            max_charge_rate: Watt(1000.0),
            max_discharge_rate: Watt(1000.0),
            initial_charge: WattHour(0.0),
        };
        let mut config = SolverConfig::default();
        config.max_iterations = 30_000;
        let ctx = ScheduleContext::new(t(0), Duration::hours(24), Duration::hours(1), &price).with_battery(battery);
        let (cost, _schedule) = ctx.solve(&config, &CancellationToken::new()).unwrap();
        assert!(cost.0 < 0.0, "expected the battery to turn a profit, got {cost:?}");
    }

    #[test]
    fn identical_seed_and_inputs_reproduce_the_same_schedule() {
        let price = FnProvider::new(|start: DateTime<Utc>, _end| {
            let hour = (start - t(0)).num_hours();
            Ok(if hour < 12 { EuroPerWh(0.00001) } else { EuroPerWh(0.0000001) })
        });
        let make_action = || ConstantAction {
            id: ConstantActionId(0),
            earliest_start: t(0),
            latest_end: t(24),
            duration: Duration::hours(1),
            power: Watt(1000.0),
        };
        let mut config = SolverConfig::default();
        config.max_iterations = 5_000;
        config.rng_seed = 42;

        let ctx_a = ScheduleContext::new(t(0), Duration::hours(24), Duration::hours(1), &price).with_constant_action(make_action());
        let (cost_a, schedule_a) = ctx_a.solve(&config, &CancellationToken::new()).unwrap();

        let ctx_b = ScheduleContext::new(t(0), Duration::hours(24), Duration::hours(1), &price).with_constant_action(make_action());
        let (cost_b, schedule_b) = ctx_b.solve(&config, &CancellationToken::new()).unwrap();

        assert_eq!(cost_a.0, cost_b.0);
        assert_eq!(schedule_a.iterations, schedule_b.iterations);
        let assigned_a = schedule_a.constant_action(ConstantActionId(0)).unwrap();
        let assigned_b = schedule_b.constant_action(ConstantActionId(0)).unwrap();
        assert_eq!(assigned_a.start, assigned_b.start);
    }

    #[test]
    fn cancelling_before_the_first_iteration_returns_the_initial_state() {
        let price = FnProvider::new(|_s, _e| Ok(EuroPerWh(0.00001)));
        let action = ConstantAction {
            id: ConstantActionId(0),
            earliest_start: t(0),
            latest_end: t(24),
            duration: Duration::hours(1),
            power: Watt(1000.0),
        };
        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let ctx = ScheduleContext::new(t(0), Duration::hours(24), Duration::hours(1), &price).with_constant_action(action);
        let (_cost, schedule, stats) = ctx.solve_with_stats(&SolverConfig::default(), &cancellation).unwrap();

        assert!(stats.cancelled);
        assert!(schedule.cancelled);
        assert_eq!(stats.iterations, 0);
        assert_eq!(stats.accepted_moves, 0);
        let assigned = schedule.constant_action(ConstantActionId(0)).unwrap();
        let start_hour = (assigned.start - t(0)).num_hours();
        assert_eq!(start_hour, 0, "cancellation before any move should leave the earliest-start placement");
    }
}
