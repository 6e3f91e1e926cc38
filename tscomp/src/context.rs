//! The handle every algorithm callback receives.

use chrono::{DateTime, TimeDelta, Utc};
use tscomp_core::{
    AggregatePeriod, CompError, MISSING_F64, MISSING_I64, Sample, SampleFlags, SeriesKey,
    TimeSeries, TimeSeriesStore, Value,
};

use crate::algorithm::AlgoKind;
use crate::computation::Bindings;
use crate::missing;
use crate::slice::TimeSlice;
use crate::working::WorkingSet;

/// Default output time of `role`: the slice base for time-slice algorithms,
/// the period begin (aggregating) or end (running aggregate) inside a period,
/// shifted by the output's `delta_t`.
pub(crate) fn default_output_time(
    bindings: &Bindings,
    role: &str,
    base: Option<DateTime<Utc>>,
    period: Option<AggregatePeriod>,
) -> Option<DateTime<Utc>> {
    let anchor = match (bindings.kind(), period) {
        (AlgoKind::Aggregating, Some(p)) => p.begin(),
        (AlgoKind::RunningAggregate, Some(p)) => p.end(),
        _ => base?,
    };
    let delta = bindings.output(role).map_or(0, |b| b.delta_t_secs);
    Some(anchor + TimeDelta::seconds(delta))
}

/// Read access to the current slice and period, and the only way for an
/// algorithm to produce output.
///
/// Outside `on_time_slice` there is no slice: input accessors report missing
/// and outputs default to the period time.
pub struct RunContext<'r> {
    bindings: &'r Bindings,
    store: &'r dyn TimeSeriesStore,
    work: &'r mut WorkingSet,
    slice: Option<&'r mut TimeSlice>,
    period: Option<AggregatePeriod>,
    warnings: &'r mut Vec<CompError>,
}

impl<'r> RunContext<'r> {
    pub(crate) fn new(
        bindings: &'r Bindings,
        store: &'r dyn TimeSeriesStore,
        work: &'r mut WorkingSet,
        slice: Option<&'r mut TimeSlice>,
        period: Option<AggregatePeriod>,
        warnings: &'r mut Vec<CompError>,
    ) -> Self {
        Self {
            bindings,
            store,
            work,
            slice,
            period,
            warnings,
        }
    }

    /// Base time of the current slice.
    #[must_use]
    pub fn base_time(&self) -> Option<DateTime<Utc>> {
        self.slice.as_ref().map(|s| s.base_time())
    }

    /// Aggregate period being processed.
    #[must_use]
    pub const fn period(&self) -> Option<AggregatePeriod> {
        self.period
    }

    /// Grouping behaviour of the running algorithm.
    #[must_use]
    pub const fn kind(&self) -> AlgoKind {
        self.bindings.kind()
    }

    /// The computation's resolved bindings.
    #[must_use]
    pub const fn bindings(&self) -> &Bindings {
        self.bindings
    }

    /// Raw sample bound to an input role in the current slice.
    #[must_use]
    pub fn input(&self, role: &str) -> Option<&Sample> {
        self.slice.as_ref().and_then(|s| s.input(role))
    }

    /// Flags of the input sample, if present.
    #[must_use]
    pub fn input_flags(&self, role: &str) -> Option<SampleFlags> {
        self.input(role).map(Sample::flags)
    }

    /// True when the input is absent, deleted or holds a missing sentinel.
    #[must_use]
    pub fn is_missing(&self, role: &str) -> bool {
        self.input(role)
            .is_none_or(|s| s.flags().was_deleted() || s.value().is_missing())
    }

    /// True when the input is present and flagged neither questionable nor rejected.
    #[must_use]
    pub fn is_good_quality(&self, role: &str) -> bool {
        self.input(role).is_some_and(|s| s.flags().is_good_quality())
    }

    /// True when the input arrived as a trigger of this run.
    #[must_use]
    pub fn is_trigger(&self, role: &str) -> bool {
        self.input(role).is_some_and(|s| s.flags().is_trigger())
    }

    /// Numeric input value, [`MISSING_F64`] when missing.
    ///
    /// An unconvertible value is recorded as a warning and reads as missing.
    pub fn input_f64(&mut self, role: &str) -> f64 {
        if self.is_missing(role) {
            return MISSING_F64;
        }
        let converted = self.input(role).map(|s| s.value().as_f64());
        match converted {
            Some(Ok(v)) => v,
            Some(Err(e)) => {
                self.warn(e);
                MISSING_F64
            }
            None => MISSING_F64,
        }
    }

    /// Integer input value, [`MISSING_I64`] when missing.
    ///
    /// An unconvertible value is recorded as a warning and reads as missing.
    pub fn input_i64(&mut self, role: &str) -> i64 {
        if self.is_missing(role) {
            return MISSING_I64;
        }
        let converted = self.input(role).map(|s| s.value().as_i64());
        match converted {
            Some(Ok(v)) => v,
            Some(Err(e)) => {
                self.warn(e);
                MISSING_I64
            }
            None => MISSING_I64,
        }
    }

    /// Input value rendered as text, `None` when missing.
    #[must_use]
    pub fn input_text(&self, role: &str) -> Option<String> {
        if self.is_missing(role) {
            return None;
        }
        self.input(role).map(|s| s.value().as_text())
    }

    /// Sets `bits` and clears `clear_mask` on the input sample of `role`.
    ///
    /// Only samples that are part of the run's input data can be edited. A
    /// real change marks the sample to be written back and counts as output
    /// activity. Returns whether anything changed.
    pub fn set_input_flag_bits(
        &mut self,
        role: &str,
        bits: SampleFlags,
        clear_mask: SampleFlags,
    ) -> bool {
        let Some(slice) = self.slice.as_deref_mut() else {
            return false;
        };
        let Some((&role, current)) = slice.inputs.get_key_value(role) else {
            return false;
        };
        let Some(series) = self.work.inputs.get_mut(role) else {
            return false;
        };
        if series.get(current.time()).is_none() {
            return false;
        }
        let editable = !SampleFlags::INTENT;
        let flags = current.flags().difference(clear_mask & editable) | (bits & editable);
        if flags == current.flags() {
            return false;
        }
        let edited = current
            .clone()
            .with_flags(flags | SampleFlags::TO_WRITE);
        series.upsert(edited.clone());
        slice.inputs.insert(role, edited);
        self.work.tracker.state_mut().output_written = true;
        true
    }

    /// Clears `bits` on the input sample of `role`; see [`Self::set_input_flag_bits`].
    pub fn clear_input_flag_bits(&mut self, role: &str, bits: SampleFlags) -> bool {
        self.set_input_flag_bits(role, SampleFlags::empty(), bits)
    }

    /// Time an output written without an explicit time lands on.
    #[must_use]
    pub fn output_time(&self, role: &str) -> Option<DateTime<Utc>> {
        default_output_time(self.bindings, role, self.base_time(), self.period)
    }

    /// Output working series of a bound role, including this run's pending changes.
    #[must_use]
    pub fn output(&self, role: &str) -> Option<&TimeSeries> {
        self.work.tracker.output(role)
    }

    /// Writes `value` to `role` at its default output time.
    ///
    /// Writing a missing sentinel deletes instead. Writes to an unbound role
    /// are recorded as a warning and otherwise ignored.
    ///
    /// # Errors
    /// `CompError::Algorithm` when there is no default output time (outside
    /// both slice and period), `CompError::Storage` from the existing-value
    /// lookup.
    pub fn set_output(&mut self, role: &str, value: impl Into<Value>) -> Result<(), CompError> {
        let time = self.require_output_time(role)?;
        self.set_output_at(role, value, time)
    }

    /// Writes `value` to `role` at `time`, converted to the role's declared
    /// kind; see [`Self::set_output`].
    ///
    /// # Errors
    /// `CompError::Data` when the value does not convert, `CompError::Storage`
    /// from the existing-value lookup.
    pub fn set_output_at(
        &mut self,
        role: &str,
        value: impl Into<Value>,
        time: DateTime<Utc>,
    ) -> Result<(), CompError> {
        let Some(series) = self.bound_output(role) else {
            return Ok(());
        };
        let value = match self.bindings.schema.output_role(role) {
            Some(spec) => spec.kind.coerce(value.into())?,
            None => value.into(),
        };
        self.work
            .tracker
            .write(role, &series, time, value, self.store)?;
        Ok(())
    }

    /// Deletes the value of `role` at its default output time.
    ///
    /// # Errors
    /// `CompError::Algorithm` when there is no default output time.
    pub fn delete_output(&mut self, role: &str) -> Result<(), CompError> {
        let time = self.require_output_time(role)?;
        self.delete_output_at(role, time)
    }

    /// Deletes the value of `role` at `time`.
    ///
    /// # Errors
    /// Currently infallible; kept fallible alongside the other output mutators.
    pub fn delete_output_at(&mut self, role: &str, time: DateTime<Utc>) -> Result<(), CompError> {
        if self.bound_output(role).is_some() {
            self.work.tracker.delete(role, time);
        }
        Ok(())
    }

    /// Sets flag bits on the value already written to `role` at its default
    /// output time. Intent bits are left alone. Returns whether a value was found.
    pub fn set_flag_bits(&mut self, role: &str, bits: SampleFlags) -> bool {
        self.output_time(role).is_some_and(|t| {
            self.work
                .tracker
                .edit_flags(role, t, bits, SampleFlags::empty())
        })
    }

    /// Clears flag bits; see [`Self::set_flag_bits`].
    pub fn clear_flag_bits(&mut self, role: &str, bits: SampleFlags) -> bool {
        self.output_time(role).is_some_and(|t| {
            self.work
                .tracker
                .edit_flags(role, t, SampleFlags::empty(), bits)
        })
    }

    /// Latest usable value of a bound role strictly before `before`, from this
    /// run's data or the store.
    ///
    /// # Errors
    /// `CompError::Configuration` for an unbound role, `CompError::Storage`
    /// from the store lookup.
    pub fn previous_value(
        &self,
        role: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<Sample>, CompError> {
        let (series, work) = self.lookup_target(role)?;
        missing::prev_usable(work, self.store, series, before)
    }

    /// Earliest usable value of a bound role strictly after `after`.
    ///
    /// # Errors
    /// Same as [`Self::previous_value`].
    pub fn next_value(&self, role: &str, after: DateTime<Utc>) -> Result<Option<Sample>, CompError> {
        let (series, work) = self.lookup_target(role)?;
        missing::next_usable(work, self.store, series, after)
    }

    fn lookup_target(&self, role: &str) -> Result<(&SeriesKey, Option<&TimeSeries>), CompError> {
        if let Some(b) = self.bindings.input(role) {
            return Ok((&b.series, self.work.inputs.get(role)));
        }
        if let Some(b) = self.bindings.output(role) {
            return Ok((&b.series, self.work.tracker.output(role)));
        }
        Err(CompError::config(format!("role '{role}' is not bound")))
    }

    fn require_output_time(&self, role: &str) -> Result<DateTime<Utc>, CompError> {
        self.output_time(role).ok_or_else(|| {
            CompError::algorithm(format!(
                "output '{role}' has no default time outside a slice or period"
            ))
        })
    }

    fn bound_output(&mut self, role: &str) -> Option<SeriesKey> {
        let found = self.bindings.output(role).map(|b| b.series.clone());
        if found.is_none() {
            self.warn(CompError::config(format!(
                "write to unbound output '{role}' ignored"
            )));
        }
        found
    }

    fn warn(&mut self, err: CompError) {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %err, base_time = ?self.base_time(), "callback warning");
        self.warnings.push(err);
    }
}
