use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tscomp_core::{BoundClosure, CompError, Sample, SampleFlags, SeriesKey, TimeSeries, TimeSeriesStore};

/// Series identifier whose every read and write fails.
pub const FAIL_SERIES: &str = "FAIL";

/// Instruction for how calls against a given series should behave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Serve from the in-memory data.
    Serve,
    /// Fail immediately with the provided error.
    Fail(CompError),
}

/// One change applied through [`TimeSeriesStore::add_sample`].
#[derive(Debug, Clone, PartialEq)]
pub enum AppliedWrite {
    /// A value was stored.
    Write(SeriesKey, Sample),
    /// The value at this time was removed.
    Delete(SeriesKey, DateTime<Utc>),
}

impl AppliedWrite {
    /// Series the change targeted.
    #[must_use]
    pub const fn series(&self) -> &SeriesKey {
        match self {
            Self::Write(s, _) | Self::Delete(s, _) => s,
        }
    }
}

#[derive(Default)]
struct InternalState {
    series: BTreeMap<SeriesKey, TimeSeries>,
    read_rules: HashMap<SeriesKey, MockBehavior>,
    write_rules: HashMap<SeriesKey, MockBehavior>,
    log: Vec<AppliedWrite>,
}

fn lock(state: &Mutex<InternalState>) -> MutexGuard<'_, InternalState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Controller handle used by tests to seed and inspect a [`MemoryStore`].
#[derive(Clone)]
pub struct StoreController {
    state: Arc<Mutex<InternalState>>,
}

impl StoreController {
    /// Stores samples in `series`, replacing any at the same times.
    pub fn insert(&self, series: impl Into<SeriesKey>, samples: impl IntoIterator<Item = Sample>) {
        let mut guard = lock(&self.state);
        let ts = guard.series.entry(series.into()).or_default();
        for s in samples {
            ts.upsert(s.without_bits(SampleFlags::INTENT | SampleFlags::TRIGGER));
        }
    }

    /// Set the behaviour of reads from `series`.
    pub fn set_read_behavior(&self, series: impl Into<SeriesKey>, behavior: MockBehavior) {
        lock(&self.state).read_rules.insert(series.into(), behavior);
    }

    /// Set the behaviour of writes to `series`.
    pub fn set_write_behavior(&self, series: impl Into<SeriesKey>, behavior: MockBehavior) {
        lock(&self.state).write_rules.insert(series.into(), behavior);
    }

    /// Snapshot of everything stored in `series`.
    #[must_use]
    pub fn series(&self, series: &str) -> TimeSeries {
        lock(&self.state)
            .series
            .get(&SeriesKey::new(series))
            .cloned()
            .unwrap_or_default()
    }

    /// Every change applied so far, in order.
    #[must_use]
    pub fn write_log(&self) -> Vec<AppliedWrite> {
        lock(&self.state).log.clone()
    }

    /// Changes applied to one series, in order.
    #[must_use]
    pub fn writes_to(&self, series: &str) -> Vec<AppliedWrite> {
        let key = SeriesKey::new(series);
        lock(&self.state)
            .log
            .iter()
            .filter(|w| w.series() == &key)
            .cloned()
            .collect()
    }

    /// Forget the write log.
    pub fn clear_log(&self) {
        lock(&self.state).log.clear();
    }

    /// Clear all configured behaviours.
    pub fn clear_all_behaviors(&self) {
        let mut guard = lock(&self.state);
        guard.read_rules.clear();
        guard.write_rules.clear();
    }
}

/// An in-memory [`TimeSeriesStore`] whose behaviour is driven by a
/// [`StoreController`].
pub struct MemoryStore {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl MemoryStore {
    /// Create a new store and its controller.
    #[must_use]
    pub fn new_with_controller(name: &'static str) -> (Arc<dyn TimeSeriesStore>, StoreController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = StoreController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn TimeSeriesStore>, controller)
    }

    fn check(
        rules: &HashMap<SeriesKey, MockBehavior>,
        series: &SeriesKey,
        op: &'static str,
    ) -> Result<(), CompError> {
        if series.as_str() == FAIL_SERIES {
            return Err(CompError::storage(series.as_str(), format!("forced failure: {op}")));
        }
        match rules.get(series) {
            Some(MockBehavior::Fail(e)) => Err(e.clone()),
            Some(MockBehavior::Serve) | None => Ok(()),
        }
    }

    fn read<T>(
        &self,
        series: &SeriesKey,
        op: &'static str,
        f: impl FnOnce(&TimeSeries) -> T,
    ) -> Result<T, CompError>
    where
        T: Default,
    {
        let guard = lock(&self.state);
        Self::check(&guard.read_rules, series, op)?;
        Ok(guard.series.get(series).map(f).unwrap_or_default())
    }
}

impl TimeSeriesStore for MemoryStore {
    fn name(&self) -> &'static str {
        self.name
    }

    fn range_fill(
        &self,
        series: &SeriesKey,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        closure: BoundClosure,
    ) -> Result<Vec<Sample>, CompError> {
        self.read(series, "range_fill", |ts| {
            ts.between(from, to, closure).cloned().collect()
        })
    }

    fn point_at(
        &self,
        series: &SeriesKey,
        time: DateTime<Utc>,
        tolerance_secs: i64,
    ) -> Result<Option<Sample>, CompError> {
        self.read(series, "point_at", |ts| {
            ts.find_within(time, tolerance_secs).cloned()
        })
    }

    fn previous_value(
        &self,
        series: &SeriesKey,
        before: DateTime<Utc>,
    ) -> Result<Option<Sample>, CompError> {
        self.read(series, "previous_value", |ts| ts.find_prev(before).cloned())
    }

    fn next_value(
        &self,
        series: &SeriesKey,
        after: DateTime<Utc>,
    ) -> Result<Option<Sample>, CompError> {
        self.read(series, "next_value", |ts| ts.find_next(after).cloned())
    }

    fn add_sample(&self, series: &SeriesKey, sample: Sample) -> Result<(), CompError> {
        let mut guard = lock(&self.state);
        Self::check(&guard.write_rules, series, "add_sample")?;
        let time = sample.time();
        if sample.flags().contains(SampleFlags::TO_DELETE) {
            if let Some(ts) = guard.series.get_mut(series) {
                ts.remove(time);
            }
            guard.log.push(AppliedWrite::Delete(series.clone(), time));
        } else {
            let stored = sample.without_bits(SampleFlags::INTENT | SampleFlags::TRIGGER);
            guard
                .series
                .entry(series.clone())
                .or_default()
                .upsert(stored.clone());
            guard.log.push(AppliedWrite::Write(series.clone(), stored));
        }
        Ok(())
    }
}
