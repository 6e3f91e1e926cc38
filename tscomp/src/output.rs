//! Output lifecycle: intent marking, flag preservation and auto-delete.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tscomp_core::{
    AggregatePeriod, CompError, MISSING_F64, Sample, SampleFlags, SeriesKey, TimeSeries,
    TimeSeriesStore, Value,
};

/// Values closer than this to the stored value count as unchanged.
pub const UNCHANGED_EPSILON: f64 = 1e-7;

/// How far from the output time an existing value is looked for, in seconds.
const EXISTING_TOLERANCE_SECS: i64 = 10;

/// Per-run state read at the end of each slice or period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Period being processed, for aggregating algorithms.
    pub period: Option<AggregatePeriod>,
    /// An output was written in the current unit.
    pub output_written: bool,
    /// An output was deleted in the current unit.
    pub output_deleted: bool,
    /// An input of the current slice arrived deleted.
    pub slice_inputs_deleted: bool,
    /// An input of any slice in the current period arrived deleted.
    pub period_inputs_deleted: bool,
    /// Outputs written in the current unit are flagged questionable.
    pub question_output: bool,
}

impl RunState {
    /// Resets everything for a new aggregate period.
    pub fn begin_period(&mut self, period: AggregatePeriod) {
        *self = Self {
            period: Some(period),
            ..Self::default()
        };
    }

    /// Resets slice-scoped state. Outside aggregate periods the slice is the
    /// unit, so output activity resets too.
    pub fn begin_slice(&mut self) {
        self.slice_inputs_deleted = false;
        if self.period.is_none() {
            self.output_written = false;
            self.output_deleted = false;
            self.question_output = false;
        }
    }

    /// Records that an input arrived deleted.
    pub fn mark_input_deleted(&mut self) {
        self.slice_inputs_deleted = true;
        self.period_inputs_deleted = true;
    }

    /// Whether the current unit saw a deleted input.
    #[must_use]
    pub const fn inputs_deleted(&self) -> bool {
        if self.period.is_some() {
            self.period_inputs_deleted
        } else {
            self.slice_inputs_deleted
        }
    }
}

/// Tracks what the algorithm wrote to each bound output during a run.
///
/// Writes and deletes only mark intent bits on samples in the output working
/// series; the executor flushes them once the run is over.
#[derive(Debug, Clone, Default)]
pub struct OutputTracker {
    outputs: BTreeMap<&'static str, TimeSeries>,
    state: RunState,
}

impl OutputTracker {
    /// Tracker for the given bound output roles.
    pub fn new(roles: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            outputs: roles.into_iter().map(|r| (r, TimeSeries::new())).collect(),
            state: RunState::default(),
        }
    }

    /// Current run state.
    #[must_use]
    pub const fn state(&self) -> &RunState {
        &self.state
    }

    /// Mutable run state, for the dispatcher.
    pub fn state_mut(&mut self) -> &mut RunState {
        &mut self.state
    }

    /// Output working series of a bound role.
    #[must_use]
    pub fn output(&self, role: &str) -> Option<&TimeSeries> {
        self.outputs.get(role)
    }

    /// All output working series by role.
    pub fn outputs(&self) -> impl Iterator<Item = (&'static str, &TimeSeries)> {
        self.outputs.iter().map(|(r, s)| (*r, s))
    }

    /// True if `role` is a bound output.
    #[must_use]
    pub fn is_bound(&self, role: &str) -> bool {
        self.outputs.contains_key(role)
    }

    /// Marks `value` to be written to `role` at `time`.
    ///
    /// A missing-value sentinel becomes a delete. An existing value (in this
    /// run or in the store) within a few seconds of `time` is replaced in
    /// place, keeping its timestamp; if it matches within
    /// [`UNCHANGED_EPSILON`] its flag bits are kept. An existing value flagged
    /// `NO_OVERWRITE` is left alone. Returns `false` when `role` is not bound
    /// or nothing was marked.
    ///
    /// # Errors
    /// Propagates `CompError::Storage` from the existing-value lookup.
    pub fn write(
        &mut self,
        role: &str,
        series: &SeriesKey,
        time: DateTime<Utc>,
        value: Value,
        store: &dyn TimeSeriesStore,
    ) -> Result<bool, CompError> {
        if value.is_missing() {
            return Ok(self.delete(role, time));
        }
        let Some(ts) = self.outputs.get_mut(role) else {
            return Ok(false);
        };
        let existing = match ts.find_within(time, EXISTING_TOLERANCE_SECS) {
            Some(s) => Some(s.clone()),
            None => store.point_at(series, time, EXISTING_TOLERANCE_SECS)?,
        };
        if existing
            .as_ref()
            .is_some_and(|old| old.flags().contains(SampleFlags::NO_OVERWRITE))
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(role, %time, "existing value is protected, write skipped");
            return Ok(false);
        }
        let at = existing.as_ref().map_or(time, Sample::time);
        let mut flags = match existing {
            Some(old) if unchanged(old.value(), &value) => old
                .flags()
                .difference(SampleFlags::TRIGGER | SampleFlags::TO_DELETE),
            _ => SampleFlags::empty(),
        };
        flags |= SampleFlags::TO_WRITE;
        if self.state.question_output {
            flags |= SampleFlags::QUESTIONABLE;
        }
        ts.upsert(Sample::new(at, value).with_flags(flags));
        self.state.output_written = true;
        Ok(true)
    }

    /// Marks the value of `role` at `time` for deletion. Returns `false` when
    /// `role` is not bound.
    pub fn delete(&mut self, role: &str, time: DateTime<Utc>) -> bool {
        let Some(ts) = self.outputs.get_mut(role) else {
            return false;
        };
        let sample = ts
            .get(time)
            .cloned()
            .unwrap_or_else(|| Sample::new(time, MISSING_F64));
        ts.upsert(sample.to_delete());
        self.state.output_deleted = true;
        true
    }

    /// Sets and clears flag bits on the value of `role` at `time`. Returns
    /// `false` if there is no such value.
    pub fn edit_flags(
        &mut self,
        role: &str,
        time: DateTime<Utc>,
        set: SampleFlags,
        clear: SampleFlags,
    ) -> bool {
        let Some(ts) = self.outputs.get_mut(role) else {
            return false;
        };
        let Some(current) = ts.get(time).cloned() else {
            return false;
        };
        // Intent bits belong to write/delete.
        let keep = SampleFlags::INTENT;
        let flags = (current.flags().difference(clear.difference(keep))) | set.difference(keep);
        ts.upsert(current.with_flags(flags));
        true
    }

    /// Deletes `sole_output` when the current unit wrote and deleted nothing
    /// but saw a deleted input. Returns whether a delete was issued.
    ///
    /// `sole_output` is the algorithm's only declared output role, `None`
    /// when it declares several.
    pub fn auto_delete(&mut self, sole_output: Option<&str>, time: DateTime<Utc>) -> bool {
        let Some(role) = sole_output else {
            return false;
        };
        if self.state.output_written || self.state.output_deleted || !self.state.inputs_deleted() {
            return false;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(role, %time, "auto-deleting output after deleted input");
        self.delete(role, time)
    }
}

fn unchanged(old: &Value, new: &Value) -> bool {
    match (old.as_f64(), new.as_f64()) {
        (Ok(a), Ok(b)) => (a - b).abs() <= UNCHANGED_EPSILON,
        _ => old == new,
    }
}
