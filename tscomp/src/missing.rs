//! Filling absent inputs from neighbouring samples.

use chrono::{DateTime, TimeDelta, Utc};
use tscomp_core::{
    CompError, MissingAction, RunConfig, Sample, SampleFlags, SeriesKey, TimeSeries,
    TimeSeriesStore, interpolate,
};

use crate::computation::InputBinding;

fn usable(s: &Sample) -> bool {
    !s.flags()
        .intersects(SampleFlags::DB_DELETED | SampleFlags::TO_DELETE)
        && !s.value().is_missing()
}

/// Latest usable sample strictly before `t`, from the working series or the
/// store, whichever is later.
///
/// A stored sample is ignored when the working series holds an unusable
/// sample at the same time; the run knows better than the store.
pub(crate) fn prev_usable(
    work: Option<&TimeSeries>,
    store: &dyn TimeSeriesStore,
    series: &SeriesKey,
    t: DateTime<Utc>,
) -> Result<Option<Sample>, CompError> {
    let local = work.and_then(|ts| ts.find_prev_by(t, usable)).cloned();
    let stored = store
        .previous_value(series, t)?
        .filter(|s| usable(s) && !shadowed(work, s));
    Ok(match (local, stored) {
        (Some(a), Some(b)) => Some(if b.time() > a.time() { b } else { a }),
        (a, b) => a.or(b),
    })
}

/// Earliest usable sample strictly after `t`; see [`prev_usable`].
pub(crate) fn next_usable(
    work: Option<&TimeSeries>,
    store: &dyn TimeSeriesStore,
    series: &SeriesKey,
    t: DateTime<Utc>,
) -> Result<Option<Sample>, CompError> {
    let local = work.and_then(|ts| ts.find_next_by(t, usable)).cloned();
    let stored = store
        .next_value(series, t)?
        .filter(|s| usable(s) && !shadowed(work, s));
    Ok(match (local, stored) {
        (Some(a), Some(b)) => Some(if b.time() < a.time() { b } else { a }),
        (a, b) => a.or(b),
    })
}

fn shadowed(work: Option<&TimeSeries>, stored: &Sample) -> bool {
    work.and_then(|ts| ts.get(stored.time()))
        .is_some_and(|s| !usable(s))
}

/// Fills the input at `t` according to the binding's missing action.
///
/// Returns `Ok(None)` when the action does not fill, a neighbour is missing,
/// or the gap exceeds the configured limits.
///
/// # Errors
/// `CompError::Storage` from neighbour lookups; `CompError::Data` when
/// interpolation meets non-numeric neighbours.
pub(crate) fn fill(
    binding: &InputBinding,
    config: &RunConfig,
    work: Option<&TimeSeries>,
    store: &dyn TimeSeriesStore,
    t: DateTime<Utc>,
) -> Result<Option<Sample>, CompError> {
    let action = binding.missing;
    if !action.fills() {
        return Ok(None);
    }
    let prev = if action.needs_prev() {
        prev_usable(work, store, &binding.series, t)?
    } else {
        None
    };
    let next = if action.needs_next() {
        next_usable(work, store, &binding.series, t)?
    } else {
        None
    };
    let limits = Limits::new(binding, config);

    let filled = match action {
        MissingAction::Prev => prev.filter(|p| limits.allows(t - p.time())),
        MissingAction::Next => next.filter(|n| limits.allows(n.time() - t)),
        MissingAction::Closest => {
            let pick = match (prev, next) {
                (Some(p), Some(n)) => Some(if t - p.time() <= n.time() - t { p } else { n }),
                (p, n) => p.or(n),
            };
            pick.filter(|s| limits.allows((s.time() - t).abs()))
        }
        MissingAction::Interp => match (prev, next) {
            (Some(p), Some(n)) if limits.allows_interp(n.time() - p.time()) => {
                let v = interpolate(&p, &n, t)?;
                Some(p.with_value(v))
            }
            _ => None,
        },
        _ => None,
    };

    #[cfg(feature = "tracing")]
    if filled.is_none() {
        tracing::debug!(series = %binding.series, %t, ?action, "fill refused");
    }

    Ok(filled.map(|s| {
        s.with_time(t)
            .without_bits(SampleFlags::TRIGGER | SampleFlags::INTENT)
    }))
}

struct Limits {
    max_time: TimeDelta,
    max_values: Option<TimeDelta>,
    max_interp: Option<TimeDelta>,
}

fn saturating_seconds(secs: Option<i64>) -> TimeDelta {
    secs.and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

impl Limits {
    /// Limits past the representable range saturate to no limit.
    fn new(binding: &InputBinding, config: &RunConfig) -> Self {
        let interval = binding.interval.approx_seconds();
        let intervals = |n: u32| {
            interval.map(|s| saturating_seconds(s.checked_mul(i64::from(n))))
        };
        Self {
            max_time: saturating_seconds(Some(config.max_missing_time_for_fill_secs)),
            max_values: intervals(config.max_missing_values_for_fill),
            max_interp: intervals(config.max_interp_intervals),
        }
    }

    fn allows(&self, gap: TimeDelta) -> bool {
        gap <= self.max_time && self.max_values.is_none_or(|m| gap <= m)
    }

    fn allows_interp(&self, gap: TimeDelta) -> bool {
        self.allows(gap) && self.max_interp.is_none_or(|m| gap <= m)
    }
}
