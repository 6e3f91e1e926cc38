use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use tscomp_core::Sample;

/// A UTC instant; panics on an invalid date, which only fixtures may do.
pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .expect("valid fixture instant")
}

/// A wall-clock time in `tz`, resolved to its earliest instant.
pub fn local(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, 0))
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .expect("valid fixture local time")
        .with_timezone(&Utc)
}

/// One sample per hour starting at `start`, valued from `values`.
pub fn hourly_from(start: DateTime<Utc>, values: &[f64]) -> Vec<Sample> {
    values
        .iter()
        .zip(0i64..)
        .map(|(v, i)| Sample::new(start + TimeDelta::hours(i), *v))
        .collect()
}

/// Hourly samples valued `1.0..=n` that end at `end`.
pub fn hourly(end: DateTime<Utc>, n: u32) -> Vec<Sample> {
    let values: Vec<f64> = (1..=n).map(f64::from).collect();
    hourly_from(end - TimeDelta::hours(i64::from(n) - 1), &values)
}
