//! Interval grammar: `"1 hour"`, `"15Minutes"`, `"8 hours 15 minutes"`, `"wy"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tscomp_types::CompError;

/// Calendar unit an interval is expressed in, ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CalendarUnit {
    /// Seconds.
    Second,
    /// Minutes.
    Minute,
    /// Hours.
    Hour,
    /// Days (local calendar days in the aggregate zone).
    Day,
    /// Weeks starting Monday.
    Week,
    /// Calendar months.
    Month,
    /// Calendar years.
    Year,
}

impl CalendarUnit {
    /// Nominal length in seconds (month = 30 days, year = 365 days).
    #[must_use]
    pub const fn nominal_seconds(self) -> i64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
            Self::Week => 7 * 86_400,
            Self::Month => 30 * 86_400,
            Self::Year => 365 * 86_400,
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        let l = label.to_ascii_lowercase();
        let singular = l.strip_suffix('s').filter(|s| !s.is_empty()).unwrap_or(l.as_str());
        Some(match singular {
            "s" | "sec" | "second" => Self::Second,
            "min" | "minute" => Self::Minute,
            "h" | "hr" | "hour" => Self::Hour,
            "d" | "day" => Self::Day,
            "w" | "wk" | "week" => Self::Week,
            "mon" | "month" => Self::Month,
            "y" | "yr" | "year" => Self::Year,
            _ => return None,
        })
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// A signed count of calendar units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalIncrement {
    /// Unit of the increment.
    pub unit: CalendarUnit,
    /// Number of units; negative counts step backwards.
    pub count: i32,
}

impl IntervalIncrement {
    /// Construct an increment.
    #[must_use]
    pub const fn new(unit: CalendarUnit, count: i32) -> Self {
        Self { unit, count }
    }

    /// The same increment pointing the other way.
    #[must_use]
    pub const fn negate(self) -> Self {
        Self {
            unit: self.unit,
            count: -self.count,
        }
    }

    /// Nominal length in seconds.
    #[must_use]
    pub const fn nominal_seconds(self) -> i64 {
        self.unit.nominal_seconds() * self.count as i64
    }

    /// Parses a single `"<n> <unit>"` increment.
    ///
    /// # Errors
    /// Returns `CompError::Configuration` unless the text holds exactly one
    /// increment with a positive count.
    pub fn parse(s: &str) -> Result<Self, CompError> {
        match Self::parse_multi(s)?.as_slice() {
            [one] if one.count > 0 => Ok(*one),
            _ => Err(CompError::config(format!("invalid interval '{s}'"))),
        }
    }

    /// Parses a list of increments such as `"8 hours 15 minutes"`.
    ///
    /// # Errors
    /// Returns `CompError::Configuration` on an unknown unit, a malformed
    /// number or empty input.
    pub fn parse_multi(s: &str) -> Result<Vec<Self>, CompError> {
        let bad = || CompError::config(format!("invalid interval '{s}'"));
        let chars: Vec<char> = s.trim().chars().collect();
        let mut out = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            while i < chars.len() && (chars[i].is_whitespace() || chars[i] == ',') {
                i += 1;
            }
            if i == chars.len() {
                break;
            }
            let num_start = i;
            if chars[i] == '-' || chars[i] == '+' {
                i += 1;
            }
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let digits: String = chars[num_start..i].iter().collect();
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            let label_start = i;
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                i += 1;
            }
            let label: String = chars[label_start..i].iter().collect();
            if label.is_empty() {
                return Err(bad());
            }
            let count = if digits.is_empty() {
                1
            } else {
                digits.parse::<i32>().map_err(|_| bad())?
            };
            let unit = CalendarUnit::from_label(&label).ok_or_else(bad)?;
            out.push(Self::new(unit, count));
        }
        if out.is_empty() {
            return Err(bad());
        }
        Ok(out)
    }
}

impl fmt::Display for IntervalIncrement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.count == 1 { "" } else { "s" };
        write!(f, "{} {}{}", self.count, self.unit.label(), plural)
    }
}

/// A resolved interval: a calendar increment, the water year, or irregular data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalSpec {
    /// A regular calendar increment.
    Calendar(IntervalIncrement),
    /// October 1 through the following October 1.
    WaterYear,
    /// Instantaneous data with no regular spacing.
    Irregular,
}

impl IntervalSpec {
    /// Parses an interval name.
    ///
    /// # Errors
    /// Returns `CompError::Configuration` for unrecognised text.
    pub fn parse(s: &str) -> Result<Self, CompError> {
        let t = s.trim().to_ascii_lowercase();
        match t.as_str() {
            "wy" | "water year" | "wateryear" => Ok(Self::WaterYear),
            "0" | "instant" | "irregular" => Ok(Self::Irregular),
            _ if t.starts_with('~') => Ok(Self::Irregular),
            _ => IntervalIncrement::parse(&t).map(Self::Calendar),
        }
    }

    /// The calendar increment this interval steps by.
    ///
    /// # Errors
    /// Returns `CompError::Configuration` for irregular intervals, which have no step.
    pub fn increment(&self) -> Result<IntervalIncrement, CompError> {
        match self {
            Self::Calendar(inc) => Ok(*inc),
            Self::WaterYear => Ok(IntervalIncrement::new(CalendarUnit::Year, 1)),
            Self::Irregular => Err(CompError::config(
                "an irregular interval cannot define an aggregate period or step",
            )),
        }
    }

    /// Nominal length in seconds, `None` for irregular intervals.
    #[must_use]
    pub const fn approx_seconds(&self) -> Option<i64> {
        match self {
            Self::Calendar(inc) => Some(inc.nominal_seconds()),
            Self::WaterYear => Some(CalendarUnit::Year.nominal_seconds()),
            Self::Irregular => None,
        }
    }

    /// True for every interval except [`IntervalSpec::Irregular`].
    #[must_use]
    pub const fn is_regular(&self) -> bool {
        !matches!(self, Self::Irregular)
    }
}

impl FromStr for IntervalSpec {
    type Err = CompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for IntervalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calendar(inc) => inc.fmt(f),
            Self::WaterYear => f.write_str("wy"),
            Self::Irregular => f.write_str("0"),
        }
    }
}
