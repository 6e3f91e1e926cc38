use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tscomp_types::{AggregatePeriod, BoundClosure, Sample, SampleFlags};

/// Samples of one series ordered by time, at most one per timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    samples: Vec<Sample>,
}

impl TimeSeries {
    /// An empty series.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Builds a series from unordered samples; a later sample replaces an
    /// earlier one with the same timestamp.
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        let mut ts = Self::new();
        for s in samples {
            ts.upsert(s);
        }
        ts
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the series holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in ascending time order.
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Earliest sample.
    #[must_use]
    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    /// Latest sample.
    #[must_use]
    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Sample at exactly `t`.
    #[must_use]
    pub fn get(&self, t: DateTime<Utc>) -> Option<&Sample> {
        self.samples
            .binary_search_by_key(&t, Sample::time)
            .ok()
            .map(|i| &self.samples[i])
    }

    /// Inserts `sample`, replacing and returning any sample at the same time.
    pub fn upsert(&mut self, sample: Sample) -> Option<Sample> {
        match self.samples.binary_search_by_key(&sample.time(), Sample::time) {
            Ok(i) => Some(std::mem::replace(&mut self.samples[i], sample)),
            Err(i) => {
                self.samples.insert(i, sample);
                None
            }
        }
    }

    /// Removes and returns the sample at exactly `t`.
    pub fn remove(&mut self, t: DateTime<Utc>) -> Option<Sample> {
        self.samples
            .binary_search_by_key(&t, Sample::time)
            .ok()
            .map(|i| self.samples.remove(i))
    }

    /// Samples between `from` and `to` with the given end inclusion.
    pub fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        closure: BoundClosure,
    ) -> impl Iterator<Item = &Sample> {
        let start = self.samples.partition_point(|s| {
            if closure.lower {
                s.time() < from
            } else {
                s.time() <= from
            }
        });
        self.samples[start..].iter().take_while(move |s| {
            if closure.upper {
                s.time() <= to
            } else {
                s.time() < to
            }
        })
    }

    /// Samples inside `period` under `closure`.
    pub fn in_period(
        &self,
        period: &AggregatePeriod,
        closure: BoundClosure,
    ) -> impl Iterator<Item = &Sample> {
        self.between(period.begin(), period.end(), closure)
    }

    /// Samples that arrived as triggers (added or deleted in the store).
    pub fn triggers(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter().filter(|s| s.flags().is_trigger())
    }

    /// Samples carrying a pending write or delete.
    pub fn pending(&self) -> impl Iterator<Item = &Sample> {
        self.samples
            .iter()
            .filter(|s| s.flags().intersects(SampleFlags::INTENT))
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl FromIterator<Sample> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self::from_samples(iter)
    }
}
