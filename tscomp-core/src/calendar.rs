//! Wall-clock arithmetic in an aggregate time zone.

use chrono::offset::{LocalResult, Offset};
use chrono::{DateTime, Months, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};
use tscomp_types::CompError;

use crate::interval::{CalendarUnit, IntervalIncrement};

/// A time zone plus the rules used to move through its local calendar.
///
/// Second, minute and hour increments are absolute durations. Day and coarser
/// increments move the local wall clock, so a day across a DST transition is
/// 23 or 25 hours long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZonedCalendar {
    tz: Tz,
}

impl ZonedCalendar {
    /// Calendar evaluated in `tz`.
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// The zone this calendar evaluates in.
    #[must_use]
    pub const fn tz(&self) -> Tz {
        self.tz
    }

    /// Local wall-clock reading of an instant.
    #[must_use]
    pub fn local(&self, t: DateTime<Utc>) -> NaiveDateTime {
        t.with_timezone(&self.tz).naive_local()
    }

    /// Maps a local wall-clock time back to an instant.
    ///
    /// Times skipped by a forward transition keep the offset in force before
    /// the gap. Repeated times resolve to the earlier instant.
    #[must_use]
    pub fn resolve(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        self.resolve_near(naive, None)
    }

    /// Like [`ZonedCalendar::resolve`], but a repeated wall-clock time picks
    /// the mapping whose offset matches `hint`.
    #[must_use]
    pub fn resolve_near(&self, naive: NaiveDateTime, hint: Option<DateTime<Utc>>) -> DateTime<Utc> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(early, late) => {
                let wanted = hint.map(|h| self.offset_seconds(h));
                if wanted == Some(late.offset().fix().local_minus_utc()) {
                    late.with_timezone(&Utc)
                } else {
                    early.with_timezone(&Utc)
                }
            }
            LocalResult::None => {
                let before = self
                    .tz
                    .offset_from_utc_datetime(&(naive - TimeDelta::days(1)))
                    .fix();
                let utc = naive - TimeDelta::seconds(i64::from(before.local_minus_utc()));
                Utc.from_utc_datetime(&utc)
            }
        }
    }

    /// Moves `t` by `inc`.
    ///
    /// # Errors
    /// Returns `CompError::Configuration` if the result is outside the
    /// representable date range.
    pub fn add(&self, t: DateTime<Utc>, inc: IntervalIncrement) -> Result<DateTime<Utc>, CompError> {
        let overflow = || CompError::config(format!("adding {inc} to {t} leaves the calendar"));
        let count = i64::from(inc.count);
        match inc.unit {
            CalendarUnit::Second | CalendarUnit::Minute | CalendarUnit::Hour => t
                .checked_add_signed(TimeDelta::seconds(count * inc.unit.nominal_seconds()))
                .ok_or_else(overflow),
            CalendarUnit::Day | CalendarUnit::Week => {
                let days = if inc.unit == CalendarUnit::Week { count * 7 } else { count };
                let moved = self
                    .local(t)
                    .checked_add_signed(TimeDelta::days(days))
                    .ok_or_else(overflow)?;
                Ok(self.resolve_near(moved, Some(t)))
            }
            CalendarUnit::Month | CalendarUnit::Year => {
                let months = if inc.unit == CalendarUnit::Year { count * 12 } else { count };
                let moved = add_months(self.local(t), months).ok_or_else(overflow)?;
                Ok(self.resolve_near(moved, Some(t)))
            }
        }
    }

    /// True when daylight-saving time is in force at `t`.
    #[must_use]
    pub fn in_daylight(&self, t: DateTime<Utc>) -> bool {
        t.with_timezone(&self.tz).offset().dst_offset() != TimeDelta::zero()
    }

    fn offset_seconds(&self, t: DateTime<Utc>) -> i32 {
        t.with_timezone(&self.tz).offset().fix().local_minus_utc()
    }
}

/// Adds signed months, clamping the day of month.
pub(crate) fn add_months(naive: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let n = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        naive.checked_add_months(n)
    } else {
        naive.checked_sub_months(n)
    }
}
