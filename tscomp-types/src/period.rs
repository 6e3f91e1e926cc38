//! The window an aggregating computation accumulates over.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CompError;

/// Which ends of an aggregate period include samples that land exactly on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundClosure {
    /// Samples at `begin` belong to the period.
    pub lower: bool,
    /// Samples at `end` belong to the period.
    pub upper: bool,
}

impl BoundClosure {
    /// Closed lower, open upper: the calendar-aggregate default.
    pub const AGGREGATE: Self = Self {
        lower: true,
        upper: false,
    };

    /// Open lower, closed upper: the running-aggregate default.
    pub const RUNNING: Self = Self {
        lower: false,
        upper: true,
    };

    /// True when both ends are closed, so a boundary sample belongs to two periods.
    #[must_use]
    pub const fn both_closed(self) -> bool {
        self.lower && self.upper
    }
}

/// Immutable `(begin, end)` pair with `begin < end`.
///
/// Closure is run configuration ([`BoundClosure`]), not part of the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregatePeriod {
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl AggregatePeriod {
    /// Construct a period.
    ///
    /// # Errors
    /// Returns `CompError::Configuration` if `begin` is not strictly before `end`.
    pub fn new(begin: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CompError> {
        if begin >= end {
            return Err(CompError::config(format!(
                "empty aggregate period: begin {begin} is not before end {end}"
            )));
        }
        Ok(Self { begin, end })
    }

    /// Start of the period.
    #[must_use]
    pub const fn begin(&self) -> DateTime<Utc> {
        self.begin
    }

    /// End of the period.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the period.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.begin
    }

    /// Whether `t` falls inside the period under the given closure.
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>, closure: BoundClosure) -> bool {
        let above = if closure.lower { t >= self.begin } else { t > self.begin };
        let below = if closure.upper { t <= self.end } else { t < self.end };
        above && below
    }
}

impl fmt::Display for AggregatePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.begin, self.end)
    }
}
