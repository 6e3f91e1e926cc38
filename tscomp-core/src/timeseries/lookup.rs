use chrono::{DateTime, TimeDelta, Utc};
use tscomp_types::{CompError, Sample};

use super::TimeSeries;

impl TimeSeries {
    /// First sample with `t - tolerance <= time < t + tolerance`.
    ///
    /// A zero tolerance matches `t` exactly.
    #[must_use]
    pub fn find_within(&self, t: DateTime<Utc>, tolerance_secs: i64) -> Option<&Sample> {
        if tolerance_secs <= 0 {
            return self.get(t);
        }
        let tol = TimeDelta::seconds(tolerance_secs);
        let lo = t - tol;
        let hi = t + tol;
        self.iter().find(|s| s.time() >= lo).filter(|s| s.time() < hi)
    }

    /// Latest sample strictly before `t`.
    #[must_use]
    pub fn find_prev(&self, t: DateTime<Utc>) -> Option<&Sample> {
        self.find_prev_by(t, |_| true)
    }

    /// Earliest sample strictly after `t`.
    #[must_use]
    pub fn find_next(&self, t: DateTime<Utc>) -> Option<&Sample> {
        self.find_next_by(t, |_| true)
    }

    /// Latest sample strictly before `t` accepted by `pred`.
    pub fn find_prev_by<F>(&self, t: DateTime<Utc>, pred: F) -> Option<&Sample>
    where
        F: Fn(&Sample) -> bool,
    {
        self.iter().rev().skip_while(|s| s.time() >= t).find(|s| pred(s))
    }

    /// Earliest sample strictly after `t` accepted by `pred`.
    pub fn find_next_by<F>(&self, t: DateTime<Utc>, pred: F) -> Option<&Sample>
    where
        F: Fn(&Sample) -> bool,
    {
        self.iter().skip_while(|s| s.time() <= t).find(|s| pred(s))
    }
}

/// Linear interpolation between two numeric samples, evaluated at `t`.
///
/// # Errors
/// Returns `CompError::Data` if either value is not numeric or the samples
/// share a timestamp.
pub fn interpolate(prev: &Sample, next: &Sample, t: DateTime<Utc>) -> Result<f64, CompError> {
    let span = (next.time() - prev.time()).num_milliseconds();
    if span == 0 {
        return Err(CompError::data(format!(
            "cannot interpolate between two samples at {}",
            prev.time()
        )));
    }
    let v0 = prev.value().as_f64()?;
    let v1 = next.value().as_f64()?;
    #[allow(clippy::cast_precision_loss)]
    let frac = (t - prev.time()).num_milliseconds() as f64 / span as f64;
    Ok((v1 - v0).mul_add(frac, v0))
}
