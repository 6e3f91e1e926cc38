//! Runs triggered computations and flushes their output.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tscomp_core::{
    CompError, MISSING_F64, RunFailure, RunReport, Sample, SampleFlags, SeriesKey, TimeSeries, TimeSeriesStore,
    Value,
};

use crate::computation::{Bindings, Computation};
use crate::dispatcher::SliceDispatcher;
use crate::working::WorkingSet;

/// Samples that changed in the store and trigger computations, grouped by series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerBatch {
    series: BTreeMap<SeriesKey, TimeSeries>,
}

impl TriggerBatch {
    /// An empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample as-is. A later sample at the same time replaces an earlier one.
    pub fn push(&mut self, series: impl Into<SeriesKey>, sample: Sample) {
        self.series.entry(series.into()).or_default().upsert(sample);
    }

    /// Adds a value that was written to the store.
    #[must_use]
    pub fn added(
        mut self,
        series: impl Into<SeriesKey>,
        time: DateTime<Utc>,
        value: impl Into<Value>,
    ) -> Self {
        self.push(
            series,
            Sample::new(time, value).with_flags(SampleFlags::DB_ADDED),
        );
        self
    }

    /// Adds a value that was deleted from the store.
    #[must_use]
    pub fn deleted(mut self, series: impl Into<SeriesKey>, time: DateTime<Utc>) -> Self {
        self.push(
            series,
            Sample::new(time, MISSING_F64).with_flags(SampleFlags::DB_DELETED),
        );
        self
    }

    /// Samples of one series.
    #[must_use]
    pub fn samples(&self, series: &SeriesKey) -> Option<&TimeSeries> {
        self.series.get(series)
    }

    /// Total number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.values().map(TimeSeries::len).sum()
    }

    /// True when the batch holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.values().all(TimeSeries::is_empty)
    }
}

/// Runs computations against a store, one at a time.
///
/// Each run builds its own working set and dispatcher; nothing is shared
/// between runs except the store.
#[derive(Clone)]
pub struct Executor {
    store: Arc<dyn TimeSeriesStore>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("store", &self.store.name())
            .finish()
    }
}

impl Executor {
    /// Executor writing through `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TimeSeriesStore>) -> Self {
        Self { store }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TimeSeriesStore> {
        &self.store
    }

    /// Performs one triggered run of `comp`, then flushes every pending
    /// sample, including those marked before a fatal error.
    ///
    /// A sample the store refuses does not stop the flush. If the run itself
    /// succeeded, the first storage error becomes its failure and any further
    /// flush errors are reported as warnings.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "tscomp::run",
            skip(self, comp, batch),
            fields(computation = comp.name(), store = self.store.name(), triggers = batch.len()),
        )
    )]
    pub fn run(&self, comp: &mut Computation, batch: &TriggerBatch) -> RunReport {
        let name = comp.name().to_string();
        let bindings = &comp.bindings;
        let work = WorkingSet::from_batch(bindings, batch);
        let mut dispatcher =
            SliceDispatcher::new(bindings, comp.algorithm.as_mut(), self.store.as_ref(), work);
        let outcome = dispatcher.run();
        let (work, mut warnings) = dispatcher.into_parts();

        let (flushed, mut refused) = self.flush(bindings, &work);
        let outcome = outcome.and_then(|summary| {
            match refused.iter().position(|e| matches!(e, CompError::Storage { .. })) {
                Some(i) => Err(RunFailure::unlocated(refused.remove(i))),
                None => Ok(summary),
            }
        });
        warnings.extend(refused);

        #[cfg(feature = "tracing")]
        match &outcome {
            Ok(summary) => tracing::info!(?summary, "run complete"),
            Err(failure) => tracing::warn!(%failure, "run failed"),
        }
        RunReport {
            computation: name,
            outcome,
            flushed,
            warnings,
        }
    }

    /// Runs each computation in turn against the same batch. A failing run
    /// does not stop the ones after it.
    pub fn run_all(&self, comps: &mut [Computation], batch: &TriggerBatch) -> Vec<RunReport> {
        comps.iter_mut().map(|c| self.run(c, batch)).collect()
    }

    fn flush(&self, bindings: &Bindings, work: &WorkingSet) -> (usize, Vec<CompError>) {
        let mut flushed = 0;
        let mut refused = Vec::new();
        for (series, sample) in work.pending(bindings) {
            match self.store.add_sample(series, sample.clone()) {
                Ok(()) => flushed += 1,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %e, %series, time = %sample.time(), "flush failed");
                    refused.push(e);
                }
            }
        }
        (flushed, refused)
    }
}
