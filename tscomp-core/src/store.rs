use std::sync::Arc;

use chrono::{DateTime, Utc};
use tscomp_types::{BoundClosure, CompError, Sample, SeriesKey};

/// Backing store the engine reads input history from and flushes results to.
///
/// All calls are synchronous; a slow store stalls the run that issued the
/// call. Retries and timeouts are the implementation's business.
pub trait TimeSeriesStore: Send + Sync {
    /// A stable identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Every stored sample of `series` between `from` and `to`, ascending.
    ///
    /// # Errors
    /// Returns `CompError::Storage` when the read fails.
    fn range_fill(
        &self,
        series: &SeriesKey,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        closure: BoundClosure,
    ) -> Result<Vec<Sample>, CompError>;

    /// The stored sample with `time - tolerance <= t < time + tolerance`, if any.
    ///
    /// # Errors
    /// Returns `CompError::Storage` when the read fails.
    fn point_at(
        &self,
        series: &SeriesKey,
        time: DateTime<Utc>,
        tolerance_secs: i64,
    ) -> Result<Option<Sample>, CompError>;

    /// Latest stored sample strictly before `before`.
    ///
    /// # Errors
    /// Returns `CompError::Storage` when the read fails.
    fn previous_value(
        &self,
        series: &SeriesKey,
        before: DateTime<Utc>,
    ) -> Result<Option<Sample>, CompError>;

    /// Earliest stored sample strictly after `after`.
    ///
    /// # Errors
    /// Returns `CompError::Storage` when the read fails.
    fn next_value(
        &self,
        series: &SeriesKey,
        after: DateTime<Utc>,
    ) -> Result<Option<Sample>, CompError>;

    /// Applies a sample's pending intent: `TO_DELETE` removes the stored value
    /// at that time, otherwise the value is written.
    ///
    /// # Errors
    /// Returns `CompError::Storage` when the write fails.
    fn add_sample(&self, series: &SeriesKey, sample: Sample) -> Result<(), CompError>;
}

impl<S: TimeSeriesStore + ?Sized> TimeSeriesStore for Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn range_fill(
        &self,
        series: &SeriesKey,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        closure: BoundClosure,
    ) -> Result<Vec<Sample>, CompError> {
        (**self).range_fill(series, from, to, closure)
    }

    fn point_at(
        &self,
        series: &SeriesKey,
        time: DateTime<Utc>,
        tolerance_secs: i64,
    ) -> Result<Option<Sample>, CompError> {
        (**self).point_at(series, time, tolerance_secs)
    }

    fn previous_value(
        &self,
        series: &SeriesKey,
        before: DateTime<Utc>,
    ) -> Result<Option<Sample>, CompError> {
        (**self).previous_value(series, before)
    }

    fn next_value(
        &self,
        series: &SeriesKey,
        after: DateTime<Utc>,
    ) -> Result<Option<Sample>, CompError> {
        (**self).next_value(series, after)
    }

    fn add_sample(&self, series: &SeriesKey, sample: Sample) -> Result<(), CompError> {
        (**self).add_sample(series, sample)
    }
}
