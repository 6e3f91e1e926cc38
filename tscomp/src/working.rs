use std::collections::BTreeMap;

use tscomp_core::{Sample, SampleFlags, SeriesKey, TimeSeries};

use crate::computation::Bindings;
use crate::executor::TriggerBatch;
use crate::output::OutputTracker;

/// Everything one run reads and writes: input series by role and the output tracker.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    pub(crate) inputs: BTreeMap<&'static str, TimeSeries>,
    pub(crate) tracker: OutputTracker,
}

impl WorkingSet {
    /// Seeds each bound input role with the batch samples of its series.
    ///
    /// Intent bits on incoming samples are dropped; only this run decides what
    /// gets written.
    pub(crate) fn from_batch(bindings: &Bindings, batch: &TriggerBatch) -> Self {
        let inputs = bindings
            .inputs
            .iter()
            .map(|(role, b)| {
                let series = batch
                    .samples(&b.series)
                    .map(|ts| {
                        ts.iter()
                            .map(|s| s.clone().without_bits(SampleFlags::INTENT))
                            .collect()
                    })
                    .unwrap_or_default();
                (*role, series)
            })
            .collect();
        Self {
            inputs,
            tracker: OutputTracker::new(bindings.outputs.keys().copied()),
        }
    }

    /// Input working series of a role.
    #[must_use]
    pub fn input(&self, role: &str) -> Option<&TimeSeries> {
        self.inputs.get(role)
    }

    /// The output tracker.
    #[must_use]
    pub const fn tracker(&self) -> &OutputTracker {
        &self.tracker
    }

    /// Every sample with a pending write or delete, paired with its series.
    ///
    /// Outputs come first, then inputs whose flags were edited.
    pub(crate) fn pending<'a>(
        &'a self,
        bindings: &'a Bindings,
    ) -> impl Iterator<Item = (&'a SeriesKey, &'a Sample)> + 'a {
        let outputs = self.tracker.outputs().filter_map(move |(role, ts)| {
            bindings.output(role).map(|b| ts.pending().map(move |s| (&b.series, s)))
        });
        let inputs = self.inputs.iter().filter_map(move |(role, ts)| {
            bindings.input(role).map(|b| ts.pending().map(move |s| (&b.series, s)))
        });
        outputs.flatten().chain(inputs.flatten())
    }
}
