//! Determination of the aggregate period a base time belongs to.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use tscomp_types::{AggregatePeriod, BoundClosure, CompError};

use crate::calendar::{ZonedCalendar, add_months};
use crate::interval::{CalendarUnit, IntervalIncrement, IntervalSpec};

/// Computes calendar-aligned and running aggregate periods.
///
/// A `PeriodCalculator` is a pure function of its configuration and inputs;
/// one instance may be shared freely between runs.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use tscomp_core::{IntervalSpec, PeriodCalculator};
///
/// let calc = PeriodCalculator::new(chrono_tz::UTC);
/// let day = IntervalSpec::parse("1 day").unwrap();
/// let p = calc
///     .period_containing(Utc.with_ymd_and_hms(2024, 5, 6, 13, 0, 0).unwrap(), &day)
///     .unwrap();
/// assert_eq!(p.begin(), Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap());
/// assert_eq!(p.end(), Utc.with_ymd_and_hms(2024, 5, 7, 0, 0, 0).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodCalculator {
    calendar: ZonedCalendar,
    closure: BoundClosure,
    offset: Vec<IntervalIncrement>,
}

impl PeriodCalculator {
    /// Calculator for `tz` with the calendar-aggregate closure and no offset.
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self {
            calendar: ZonedCalendar::new(tz),
            closure: BoundClosure::AGGREGATE,
            offset: Vec::new(),
        }
    }

    /// Sets which period bounds include boundary samples.
    #[must_use]
    pub fn with_closure(mut self, closure: BoundClosure) -> Self {
        self.closure = closure;
        self
    }

    /// Shifts every calendar boundary by the given increments, e.g. a water day
    /// starting at 08:00 uses `[8 hours]`.
    #[must_use]
    pub fn with_time_offset(mut self, offset: Vec<IntervalIncrement>) -> Self {
        self.offset = offset;
        self
    }

    /// Boundary closure in effect.
    #[must_use]
    pub const fn closure(&self) -> BoundClosure {
        self.closure
    }

    /// The calendar periods are evaluated in.
    #[must_use]
    pub const fn calendar(&self) -> &ZonedCalendar {
        &self.calendar
    }

    /// The calendar period containing `base`.
    ///
    /// With a closed upper bound, a `base` exactly on a boundary belongs to the
    /// period ending there.
    ///
    /// # Errors
    /// Returns `CompError::Configuration` for irregular intervals or dates the
    /// calendar cannot represent.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip(self), fields(tz = %self.calendar.tz()))
    )]
    pub fn period_containing(
        &self,
        base: DateTime<Utc>,
        interval: &IntervalSpec,
    ) -> Result<AggregatePeriod, CompError> {
        match interval {
            IntervalSpec::WaterYear => self.water_year(base),
            IntervalSpec::Calendar(inc) => self.calendar_period(base, *inc),
            IntervalSpec::Irregular => Err(CompError::config(
                "an irregular interval cannot define an aggregate period",
            )),
        }
    }

    /// The running window `(base - interval, base)`.
    ///
    /// # Errors
    /// Returns `CompError::Configuration` for irregular intervals.
    pub fn running_period(
        &self,
        base: DateTime<Utc>,
        interval: &IntervalSpec,
    ) -> Result<AggregatePeriod, CompError> {
        let inc = interval.increment()?;
        let begin = self.calendar.add(base, inc.negate())?;
        AggregatePeriod::new(begin, base)
    }

    /// The period that `boundary` opens, ignoring the upper-closed tie-break.
    ///
    /// With both bounds closed a boundary sample belongs to two periods; this
    /// is the later one.
    ///
    /// # Errors
    /// Same as [`PeriodCalculator::period_containing`].
    pub fn period_opened_by(
        &self,
        boundary: DateTime<Utc>,
        interval: &IntervalSpec,
    ) -> Result<AggregatePeriod, CompError> {
        let open_upper = Self {
            closure: BoundClosure {
                lower: self.closure.lower,
                upper: false,
            },
            ..self.clone()
        };
        open_upper.period_containing(boundary, interval)
    }

    fn water_year(&self, base: DateTime<Utc>) -> Result<AggregatePeriod, CompError> {
        let local = self.calendar.local(base);
        let mut year = if local.month() < 10 {
            local.year() - 1
        } else {
            local.year()
        };
        let mut begin = self.october_first(year)?;
        if self.closure.upper && begin == base {
            year -= 1;
            begin = self.october_first(year)?;
        }
        AggregatePeriod::new(begin, self.october_first(year + 1)?)
    }

    fn october_first(&self, year: i32) -> Result<DateTime<Utc>, CompError> {
        let naive = NaiveDate::from_ymd_opt(year, 10, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| CompError::config(format!("water year {year} out of range")))?;
        Ok(self.calendar.resolve(naive))
    }

    fn calendar_period(
        &self,
        base: DateTime<Utc>,
        inc: IntervalIncrement,
    ) -> Result<AggregatePeriod, CompError> {
        if inc.count <= 0 {
            return Err(CompError::config(format!("aggregate interval {inc} is not positive")));
        }
        let (begin, end) = self.aligned(base, inc)?;
        if !(self.closure.upper && begin == base) {
            return AggregatePeriod::new(begin, end);
        }
        // Boundary sample with a closed upper bound: use the period ending here.
        let (prev_begin, prev_end) = self.aligned(base - TimeDelta::nanoseconds(1), inc)?;
        if prev_end == base {
            return AggregatePeriod::new(prev_begin, prev_end);
        }
        AggregatePeriod::new(self.calendar.add(begin, inc.negate())?, base)
    }

    /// The lower-closed calendar period containing `base` as `(begin, end)`.
    fn aligned(
        &self,
        base: DateTime<Utc>,
        inc: IntervalIncrement,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), CompError> {
        let out_of_range = || CompError::config(format!("cannot truncate {base} to {inc}"));
        let cal = &self.calendar;

        let mut naive = truncate(cal.local(base), inc).ok_or_else(out_of_range)?;
        let mut shifted = false;
        for off in self.offset.iter().filter(|o| o.unit <= inc.unit) {
            naive = shift(naive, *off).ok_or_else(out_of_range)?;
            shifted = true;
        }
        let mut begin = cal.resolve_near(naive, Some(base));
        if shifted && begin > base {
            begin = cal.add(begin, inc.negate())?;
        }
        let mut end = cal.add(begin, inc)?;

        // Keep multi-hour periods on the same wall-clock hours across a transition day.
        if inc.unit == CalendarUnit::Hour && (3..=12).contains(&inc.count) {
            match (cal.in_daylight(begin), cal.in_daylight(end)) {
                (true, false) => end += TimeDelta::hours(1),
                (false, true) => end -= TimeDelta::hours(1),
                _ => {}
            }
        }
        Ok((begin, end))
    }
}

/// Zeroes the units finer than `inc` and floors the target unit to a multiple
/// of the count.
fn truncate(local: NaiveDateTime, inc: IntervalIncrement) -> Option<NaiveDateTime> {
    let n = u32::try_from(inc.count).ok()?;
    let date = local.date();
    let floor = |v: u32| (v / n) * n;
    let floor1 = |v: u32| ((v - 1) / n) * n + 1;
    match inc.unit {
        CalendarUnit::Second => date.and_hms_opt(local.hour(), local.minute(), floor(local.second())),
        CalendarUnit::Minute => date.and_hms_opt(local.hour(), floor(local.minute()), 0),
        CalendarUnit::Hour => date.and_hms_opt(floor(local.hour()), 0, 0),
        CalendarUnit::Day => date.with_day(floor1(date.day()))?.and_hms_opt(0, 0, 0),
        CalendarUnit::Week => {
            let monday =
                date - TimeDelta::days(i64::from(date.weekday().num_days_from_monday()));
            let extra_weeks = (monday.iso_week().week() - 1) % n;
            (monday - TimeDelta::weeks(i64::from(extra_weeks))).and_hms_opt(0, 0, 0)
        }
        CalendarUnit::Month => NaiveDate::from_ymd_opt(date.year(), floor1(date.month()), 1)?
            .and_hms_opt(0, 0, 0),
        CalendarUnit::Year => {
            let year = date.year().div_euclid(inc.count) * inc.count;
            NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)
        }
    }
}

/// Adds an offset increment to a truncated wall-clock boundary.
fn shift(naive: NaiveDateTime, off: IntervalIncrement) -> Option<NaiveDateTime> {
    let count = i64::from(off.count);
    match off.unit {
        CalendarUnit::Month => add_months(naive, count),
        CalendarUnit::Year => add_months(naive, count * 12),
        unit => naive.checked_add_signed(TimeDelta::seconds(count * unit.nominal_seconds())),
    }
}
