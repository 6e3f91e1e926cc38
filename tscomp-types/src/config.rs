//! Configuration types consumed by the computation engine.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CompError;

/// How a slice treats an input flagged questionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum IfQuestionable {
    /// No special handling.
    #[default]
    ProcessAsNormal,
    /// Run the slice, but flag every output it writes as questionable.
    QuestionOutput,
    /// Treat the input as missing and skip the slice.
    SkipTimeslice,
}

impl FromStr for IfQuestionable {
    type Err = CompError;

    /// Parses by first letter, like the property editors always have.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('p') => Ok(Self::ProcessAsNormal),
            Some('q') => Ok(Self::QuestionOutput),
            Some('s') => Ok(Self::SkipTimeslice),
            _ => Err(CompError::config(format!("bad ifQuestionable value '{s}'"))),
        }
    }
}

/// What to do when an input has no value at a slice's param time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MissingAction {
    /// Required input: the slice is skipped.
    Fail,
    /// Leave missing and let the algorithm decide.
    #[default]
    Ignore,
    /// Use the closer of the previous and next values.
    Closest,
    /// Use the previous value.
    Prev,
    /// Use the next value.
    Next,
    /// Interpolate linearly between previous and next values.
    Interp,
}

impl MissingAction {
    /// True for the actions that fill from neighbouring samples.
    #[must_use]
    pub const fn fills(self) -> bool {
        matches!(self, Self::Closest | Self::Prev | Self::Next | Self::Interp)
    }

    /// True when the action needs a sample before the gap.
    #[must_use]
    pub const fn needs_prev(self) -> bool {
        matches!(self, Self::Closest | Self::Prev | Self::Interp)
    }

    /// True when the action needs a sample after the gap.
    #[must_use]
    pub const fn needs_next(self) -> bool {
        matches!(self, Self::Closest | Self::Next | Self::Interp)
    }
}

impl FromStr for MissingAction {
    type Err = CompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "" | "ignore" => Ok(Self::Ignore),
            "closest" => Ok(Self::Closest),
            "prev" | "previous" => Ok(Self::Prev),
            "next" => Ok(Self::Next),
            "interp" | "interpolate" => Ok(Self::Interp),
            other => Err(CompError::config(format!("unknown missing action '{other}'"))),
        }
    }
}

/// Settings controlling how aggregate periods are determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Include the beginning of the period. `None` picks the algorithm kind's default.
    pub lower_bound_closed: Option<bool>,
    /// Include the end of the period. `None` picks the algorithm kind's default.
    pub upper_bound_closed: Option<bool>,
    /// Zone in which calendar boundaries are evaluated.
    pub time_zone: Tz,
    /// Overrides the controlling output's interval, e.g. `"1 day"`.
    pub period_interval: Option<String>,
    /// Offset applied to period boundaries, e.g. `"8 hours 15 minutes"`.
    pub time_offset: Option<String>,
    /// Skip the store refill and the time slices of each period; only the
    /// before/after period callbacks run.
    pub no_aggregate_fill: bool,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            lower_bound_closed: None,
            upper_bound_closed: None,
            time_zone: chrono_tz::UTC,
            period_interval: None,
            time_offset: None,
            no_aggregate_fill: false,
        }
    }
}

/// Per-computation run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Aggregate-period settings (ignored by time-slice algorithms).
    pub aggregate: AggregateConfig,
    /// Handling of questionable inputs.
    pub if_questionable: IfQuestionable,
    /// Maximum gap, in input intervals, that `Interp` may bridge.
    pub max_interp_intervals: u32,
    /// Maximum gap, in input intervals, that any fill action may bridge.
    pub max_missing_values_for_fill: u32,
    /// Maximum gap, in seconds, that any fill action may bridge.
    pub max_missing_time_for_fill_secs: i64,
    /// Base times are rounded to this many seconds; samples match within half of it.
    pub round_secs: i64,
    /// Base times before this instant are ignored.
    pub effective_start: Option<DateTime<Utc>>,
    /// Base times after this instant are ignored.
    pub effective_end: Option<DateTime<Utc>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            aggregate: AggregateConfig::default(),
            if_questionable: IfQuestionable::default(),
            max_interp_intervals: 10,
            max_missing_values_for_fill: 3,
            max_missing_time_for_fill_secs: 3 * 3600,
            round_secs: 60,
            effective_start: None,
            effective_end: None,
        }
    }
}

impl RunConfig {
    /// Builds a run configuration from the string property map attached to a computation.
    ///
    /// Names match case-insensitively. Unknown names are left for the
    /// algorithm's own schema.
    ///
    /// # Errors
    /// Returns `CompError::Configuration` when a recognised property has a malformed value.
    pub fn from_properties(props: &BTreeMap<String, String>) -> Result<Self, CompError> {
        let mut cfg = Self::default();
        for (name, raw) in props {
            let v = raw.trim();
            if v.is_empty() {
                continue;
            }
            match name.to_ascii_lowercase().as_str() {
                "agglowerboundclosed" => cfg.aggregate.lower_bound_closed = Some(parse_bool(name, v)?),
                "aggupperboundclosed" => cfg.aggregate.upper_bound_closed = Some(parse_bool(name, v)?),
                "aggregatetimezone" => {
                    cfg.aggregate.time_zone = v.parse::<Tz>().map_err(|_| {
                        CompError::config(format!("invalid aggregateTimeZone '{v}'"))
                    })?;
                }
                "aggperiodinterval" => cfg.aggregate.period_interval = Some(v.to_string()),
                "aggregatetimeoffset" => cfg.aggregate.time_offset = Some(v.to_string()),
                "noaggregatefill" => cfg.aggregate.no_aggregate_fill = parse_bool(name, v)?,
                "ifquestionable" => cfg.if_questionable = v.parse()?,
                "maxinterpintervals" => cfg.max_interp_intervals = parse_num(name, v)?,
                "maxmissingvaluesforfill" => cfg.max_missing_values_for_fill = parse_num(name, v)?,
                "maxmissingtimeforfill" => cfg.max_missing_time_for_fill_secs = parse_num(name, v)?,
                "timeround" => cfg.round_secs = parse_time_round(v)?,
                _ => {}
            }
        }
        Ok(cfg)
    }
}

/// Parses a boolean property value (`true`/`false`, `yes`/`no`, `on`/`off`, `1`/`0`, or initials).
///
/// # Errors
/// Returns `CompError::Configuration` naming the property for any other spelling.
pub fn parse_bool(name: &str, v: &str) -> Result<bool, CompError> {
    match v.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Ok(false),
        _ => Err(CompError::config(format!("property '{name}' requires a boolean, got '{v}'"))),
    }
}

fn parse_num<T: FromStr>(name: &str, v: &str) -> Result<T, CompError> {
    v.parse::<T>()
        .map_err(|_| CompError::config(format!("property '{name}' requires a number, got '{v}'")))
}

/// Parses `SS`, `MM:SS` or `HH:MM:SS` into seconds.
fn parse_time_round(v: &str) -> Result<i64, CompError> {
    let bad = || CompError::config(format!("bad timeRound '{v}'"));
    let parts = v
        .split(':')
        .map(|p| p.trim().parse::<i64>().map_err(|_| bad()))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [s] => Ok(*s),
        [m, s] => Ok(m * 60 + s),
        [h, m, s] => Ok(h * 3600 + m * 60 + s),
        _ => Err(bad()),
    }
}
