//! tscomp-core
//!
//! Pure building blocks shared by the tscomp engine and its collaborators.
//!
//! - `interval`: the interval grammar (`"1 hour"`, `"wy"`, `"8 hours 15 minutes"`).
//! - `calendar`: wall-clock arithmetic in an aggregate time zone.
//! - `period`: the [`PeriodCalculator`] that maps base times to aggregate periods.
//! - `timeseries`: the ordered in-memory series used as a run's working set.
//! - `store`: the [`TimeSeriesStore`] contract the engine reads and flushes through.
//!
//! Nothing in this crate holds per-run state; every type here may be shared
//! between concurrent runs.
#![warn(missing_docs)]

/// Wall-clock arithmetic in a `chrono_tz` zone.
pub mod calendar;
/// Interval names and calendar increments.
pub mod interval;
/// Aggregate period determination.
pub mod period;
/// The backing-store contract.
pub mod store;
/// Ordered in-memory series.
pub mod timeseries;

pub use calendar::ZonedCalendar;
pub use interval::{CalendarUnit, IntervalIncrement, IntervalSpec};
pub use period::PeriodCalculator;
pub use store::TimeSeriesStore;
pub use timeseries::{TimeSeries, interpolate};
pub use tscomp_types::*;
