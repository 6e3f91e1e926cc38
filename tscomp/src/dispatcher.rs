//! The state machine that owns iteration over base times, slices and periods.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use tscomp_core::{
    AggregatePeriod, BoundClosure, CompError, IfQuestionable, MissingAction, RunFailure,
    RunSummary, Sample, SampleFlags, TimeSeriesStore,
};

use crate::algorithm::{AlgoKind, Algorithm};
use crate::computation::{AggregateSetup, Bindings, InputBinding};
use crate::context::{RunContext, default_output_time};
use crate::missing;
use crate::slice::TimeSlice;
use crate::working::WorkingSet;

/// Where a dispatcher is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Constructed, not yet run.
    Idle,
    /// Deriving base times from the trigger data.
    CollectingBaseTimes,
    /// Evaluating one slice per base time.
    TimeSliceLoop,
    /// Evaluating slices grouped into aggregate periods.
    AggregatePeriodLoop,
    /// Finished, successfully or not.
    Done,
}

/// Drives one run of one computation over its working set.
///
/// A dispatcher is single-use: [`SliceDispatcher::run`] consumes the
/// algorithm's lifecycle once, after which the working set holds the
/// pending output.
pub struct SliceDispatcher<'a> {
    bindings: &'a Bindings,
    algorithm: &'a mut dyn Algorithm,
    store: &'a dyn TimeSeriesStore,
    work: WorkingSet,
    state: DispatchState,
    summary: RunSummary,
    warnings: Vec<CompError>,
}

impl<'a> SliceDispatcher<'a> {
    /// A dispatcher in the `Idle` state.
    pub fn new(
        bindings: &'a Bindings,
        algorithm: &'a mut dyn Algorithm,
        store: &'a dyn TimeSeriesStore,
        work: WorkingSet,
    ) -> Self {
        Self {
            bindings,
            algorithm,
            store,
            work,
            state: DispatchState::Idle,
            summary: RunSummary::default(),
            warnings: Vec::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> DispatchState {
        self.state
    }

    /// The working set, with whatever the run has marked so far.
    #[must_use]
    pub const fn working_set(&self) -> &WorkingSet {
        &self.work
    }

    /// Runs the full callback lifecycle.
    ///
    /// # Errors
    /// Returns the first fatal error, located at the base time and/or period
    /// being processed. Pending output marked before the failure stays in the
    /// working set.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "tscomp::dispatch",
            level = "debug",
            skip(self),
            fields(algorithm = self.algorithm.name(), kind = ?self.bindings.kind()),
        )
    )]
    pub fn run(&mut self) -> Result<RunSummary, RunFailure> {
        let result = self.run_inner();
        self.state = DispatchState::Done;
        result
    }

    /// Consumes the dispatcher, returning the working set and collected warnings.
    #[must_use]
    pub fn into_parts(self) -> (WorkingSet, Vec<CompError>) {
        (self.work, self.warnings)
    }

    fn run_inner(&mut self) -> Result<RunSummary, RunFailure> {
        let bindings = self.bindings;
        self.state = DispatchState::CollectingBaseTimes;
        let base_times = self.collect_base_times();
        self.summary.base_times = base_times.len();

        #[cfg(feature = "tracing")]
        tracing::debug!(base_times = base_times.len(), "collected base times");

        self.invoke(None, None, |a, c| a.before_all(c))
            .map_err(RunFailure::unlocated)?;

        match bindings.aggregate() {
            None => {
                self.state = DispatchState::TimeSliceLoop;
                self.time_slice_loop(&base_times)?;
            }
            Some(setup) => {
                self.state = DispatchState::AggregatePeriodLoop;
                self.period_loop(setup, base_times)?;
            }
        }

        self.invoke(None, None, |a, c| a.after_all(c))
            .map_err(RunFailure::unlocated)?;

        for (_, sample) in self.work.pending(bindings) {
            if sample.flags().contains(SampleFlags::TO_DELETE) {
                self.summary.deleted += 1;
            } else {
                self.summary.written += 1;
            }
        }
        Ok(self.summary)
    }

    fn invoke<F>(
        &mut self,
        slice: Option<&mut TimeSlice>,
        period: Option<AggregatePeriod>,
        f: F,
    ) -> Result<(), CompError>
    where
        F: FnOnce(&mut dyn Algorithm, &mut RunContext<'_>) -> Result<(), CompError>,
    {
        let mut ctx = RunContext::new(
            self.bindings,
            self.store,
            &mut self.work,
            slice,
            period,
            &mut self.warnings,
        );
        f(&mut *self.algorithm, &mut ctx)
    }

    /// Trigger times shifted back by each role's `delta_t`, rounded and
    /// limited to the effective range.
    fn collect_base_times(&self) -> BTreeSet<DateTime<Utc>> {
        let bindings = self.bindings;
        let config = bindings.config();
        let mut out = BTreeSet::new();
        for (role, binding) in &bindings.inputs {
            let Some(series) = self.work.inputs.get(role) else {
                continue;
            };
            for sample in series.triggers() {
                let t = round_to(base_of(binding, sample.time()), config.round_secs);
                if self.in_effective_range(t) {
                    out.insert(t);
                }
            }
        }
        out
    }

    fn in_effective_range(&self, t: DateTime<Utc>) -> bool {
        let config = self.bindings.config();
        config.effective_start.is_none_or(|s| t >= s) && config.effective_end.is_none_or(|e| t <= e)
    }

    fn sole_output(&self) -> Option<&'static str> {
        match self.bindings.schema.outputs.as_slice() {
            [only] if self.bindings.outputs.contains_key(only.name) => Some(only.name),
            _ => None,
        }
    }

    fn time_slice_loop(&mut self, base_times: &BTreeSet<DateTime<Utc>>) -> Result<(), RunFailure> {
        self.invoke(None, None, |a, c| a.before_time_slices(c))
            .map_err(RunFailure::unlocated)?;
        let sole = self.sole_output();
        for &base in base_times {
            self.work.tracker.state_mut().begin_slice();
            self.do_time_slice(base, None)?;
            if let Some(t) = sole.and_then(|r| default_output_time(self.bindings, r, Some(base), None)) {
                self.work.tracker.auto_delete(sole, t);
            }
        }
        self.invoke(None, None, |a, c| a.after_time_slices(c))
            .map_err(RunFailure::unlocated)
    }

    fn period_loop(
        &mut self,
        setup: &AggregateSetup,
        mut base_times: BTreeSet<DateTime<Utc>>,
    ) -> Result<(), RunFailure> {
        let running = self.bindings.kind() == AlgoKind::RunningAggregate;
        let calc = &setup.calculator;
        if running {
            self.synthesize_running(setup, &mut base_times)
                .map_err(RunFailure::unlocated)?;
        }

        let mut processed = BTreeSet::new();
        for base in base_times {
            let at_base = |error| RunFailure {
                error,
                base_time: Some(base),
                period: None,
            };
            let period = if running {
                calc.running_period(base, &setup.interval)
            } else {
                calc.period_containing(base, &setup.interval)
            }
            .map_err(at_base)?;
            if processed.insert(period.begin()) {
                self.process_period(period, setup)?;
            }
            // With both bounds closed a boundary base time also opens the next period.
            if !running && setup.closure().both_closed() && period.end() == base {
                let next = calc
                    .period_opened_by(base, &setup.interval)
                    .map_err(at_base)?;
                if processed.insert(next.begin()) {
                    self.process_period(next, setup)?;
                }
            }
        }
        Ok(())
    }

    /// Keeps a running window advancing after the last trigger: base times
    /// every input interval up to one window past the last one.
    fn synthesize_running(
        &self,
        setup: &AggregateSetup,
        base_times: &mut BTreeSet<DateTime<Utc>>,
    ) -> Result<(), CompError> {
        let Some(last) = base_times.last().copied() else {
            return Ok(());
        };
        let Some(step) = self
            .bindings
            .inputs
            .values()
            .find(|b| b.interval.is_regular())
            .map(|b| b.interval.increment())
            .transpose()?
        else {
            return Ok(());
        };
        if step.count <= 0 {
            return Err(CompError::config(format!(
                "running aggregate cannot step by '{step}'"
            )));
        }
        let calendar = setup.calculator.calendar();
        let horizon = calendar.add(last, setup.interval.increment()?)?;
        let upper = setup.closure().upper;
        let mut t = calendar.add(last, step)?;
        while t < horizon || (upper && t == horizon) {
            if self.in_effective_range(t) {
                base_times.insert(t);
            }
            t = calendar.add(t, step)?;
        }
        Ok(())
    }

    fn process_period(
        &mut self,
        period: AggregatePeriod,
        setup: &AggregateSetup,
    ) -> Result<(), RunFailure> {
        let in_period = |error| RunFailure {
            error,
            base_time: None,
            period: Some(period),
        };
        let closure = setup.closure();

        #[cfg(feature = "tracing")]
        tracing::debug!(%period, "processing period");

        self.work.tracker.state_mut().begin_period(period);
        let iterate = !self.bindings.config().aggregate.no_aggregate_fill;
        if iterate {
            self.fill_period(period, closure).map_err(in_period)?;
        }

        let bindings = self.bindings;
        let mut slice_times = BTreeSet::new();
        let round = bindings.config().round_secs;
        // Without aggregate fill the period gets only its before/after hooks.
        for (role, binding) in bindings.inputs.iter().take_while(|_| iterate) {
            let Some(series) = self.work.inputs.get(role) else {
                continue;
            };
            let delta = TimeDelta::seconds(binding.delta_t_secs);
            for sample in series.between(period.begin() + delta, period.end() + delta, closure) {
                let t = round_to(base_of(binding, sample.time()), round);
                if period.contains(t, closure) {
                    slice_times.insert(t);
                }
            }
        }

        self.invoke(None, Some(period), |a, c| a.before_time_slices(c))
            .map_err(in_period)?;
        for base in slice_times {
            self.work.tracker.state_mut().begin_slice();
            self.do_time_slice(base, Some(period))?;
        }
        self.invoke(None, Some(period), |a, c| a.after_time_slices(c))
            .map_err(in_period)?;

        let sole = self.sole_output();
        if let Some(t) = sole.and_then(|r| default_output_time(self.bindings, r, None, Some(period))) {
            self.work.tracker.auto_delete(sole, t);
        }
        self.summary.periods += 1;
        Ok(())
    }

    /// Pulls the rest of each input's data for `period` from the store.
    /// Samples already in the working set win.
    fn fill_period(
        &mut self,
        period: AggregatePeriod,
        closure: BoundClosure,
    ) -> Result<(), CompError> {
        let bindings = self.bindings;
        for (&role, binding) in &bindings.inputs {
            let delta = TimeDelta::seconds(binding.delta_t_secs);
            let fetched = self.store.range_fill(
                &binding.series,
                period.begin() + delta,
                period.end() + delta,
                closure,
            )?;
            let series = self.work.inputs.entry(role).or_default();
            for sample in fetched {
                if series.get(sample.time()).is_none() {
                    series.upsert(sample.without_bits(SampleFlags::TRIGGER | SampleFlags::INTENT));
                }
            }
        }
        Ok(())
    }

    /// Binds inputs, applies the missing-data policy and runs the per-slice
    /// callback. Returns whether the callback ran to completion.
    fn do_time_slice(
        &mut self,
        base: DateTime<Utc>,
        period: Option<AggregatePeriod>,
    ) -> Result<bool, RunFailure> {
        let located = |error| RunFailure {
            error,
            base_time: Some(base),
            period,
        };
        let mut slice = TimeSlice::new(base);
        if !self.bind_slice(&mut slice, period).map_err(located)? {
            self.summary.slices_skipped += 1;
            return Ok(false);
        }
        match self.invoke(Some(&mut slice), period, |a, c| a.on_time_slice(c)) {
            Ok(()) => {
                self.summary.slices_executed += 1;
                Ok(true)
            }
            Err(e) if !e.is_fatal() => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, %base, "slice skipped after data error");
                self.warnings.push(e);
                self.summary.slices_skipped += 1;
                Ok(false)
            }
            Err(e) => Err(located(e)),
        }
    }

    /// Fills `slice` with the sample of every bound input. Returns `false`
    /// when the slice must be skipped.
    fn bind_slice(
        &mut self,
        slice: &mut TimeSlice,
        period: Option<AggregatePeriod>,
    ) -> Result<bool, CompError> {
        let bindings = self.bindings;
        let fudge = bindings.fudge_secs();
        let mut run = true;
        for (&role, binding) in &bindings.inputs {
            let t = binding.param_time(slice.base_time());
            let required = binding.missing == MissingAction::Fail || binding.missing.fills();
            let found = self
                .work
                .inputs
                .get(role)
                .and_then(|ts| ts.find_within(t, fudge))
                .cloned();
            let sample = match found {
                Some(s) => Some(s),
                None => self.fill_input(role, binding, t)?,
            };

            let Some(sample) = sample else {
                if required {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(role, %t, "required input missing, slice skipped");
                    run = false;
                }
                continue;
            };

            if sample.flags().was_deleted() {
                self.work.tracker.state_mut().mark_input_deleted();
                if required {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(role, %t, "required input deleted, deleting outputs");
                    let roles: Vec<&'static str> = bindings.outputs.keys().copied().collect();
                    for out in roles {
                        if let Some(at) = default_output_time(bindings, out, Some(slice.base_time()), period) {
                            self.work.tracker.delete(out, at);
                        }
                    }
                    run = false;
                    continue;
                }
            } else if sample.flags().is_questionable() {
                match bindings.config().if_questionable {
                    IfQuestionable::SkipTimeslice => run = false,
                    IfQuestionable::QuestionOutput => {
                        self.work.tracker.state_mut().question_output = true;
                    }
                    _ => {}
                }
            }
            slice.inputs.insert(role, sample);
        }
        Ok(run)
    }

    fn fill_input(
        &mut self,
        role: &str,
        binding: &InputBinding,
        t: DateTime<Utc>,
    ) -> Result<Option<Sample>, CompError> {
        let series = self.work.inputs.get(role);
        match missing::fill(binding, self.bindings.config(), series, self.store, t) {
            Ok(filled) => Ok(filled),
            Err(e) if !e.is_fatal() => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, role, %t, "fill failed, input treated as missing");
                self.warnings.push(e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn base_of(binding: &InputBinding, param_time: DateTime<Utc>) -> DateTime<Utc> {
    param_time - TimeDelta::seconds(binding.delta_t_secs)
}

/// Rounds to the nearest multiple of `secs`; `secs <= 1` leaves `t` alone.
fn round_to(t: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    if secs <= 1 {
        return t;
    }
    let rounded = (t.timestamp() + secs / 2).div_euclid(secs) * secs;
    DateTime::from_timestamp(rounded, 0).unwrap_or(t)
}
