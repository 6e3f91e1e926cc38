//! tscomp runs pluggable computations over time-series data.
//!
//! Overview
//! - An [`Algorithm`] declares its roles, properties and grouping behaviour in
//!   an [`AlgorithmSchema`] and implements a handful of lifecycle callbacks.
//! - A [`Computation`] binds those roles to concrete series and types the
//!   string properties it was configured with.
//! - The [`Executor`] turns a [`TriggerBatch`] of changed samples into base
//!   times, lets a [`SliceDispatcher`] drive the callbacks, and flushes every
//!   pending write and delete to the [`TimeSeriesStore`].
//!
//! Key behaviors and trade-offs
//! - Grouping:
//!   - `TimeSlice`: one callback per base time; simple and local.
//!   - `Aggregating`: slices grouped into calendar periods in the configured
//!     zone; each touched period is recomputed in full, refilled from the store.
//!     With `noAggregateFill` a period only gets its before/after callbacks.
//!   - `RunningAggregate`: a window ending at every base time; base times keep
//!     advancing past the last trigger so windows drain as data ages out.
//! - Missing data: per-input `MissingAction` decides whether an absent value
//!   skips the slice, is left for the algorithm, or is filled from neighbours
//!   within configured gap limits.
//! - Output: writes only mark intent; unchanged values keep their stored flags
//!   so recomputation does not re-trigger downstream computations.
//! - Failure: a data error skips one slice; anything else aborts the run, but
//!   output already marked is still flushed (at-least-once at the store). A
//!   store refusing a flushed sample fails an otherwise successful run.
//!
//! Examples
//! ```rust,ignore
//! use std::sync::Arc;
//! use tscomp::{Computation, Executor, InputBinding, IntervalSpec, OutputBinding, TriggerBatch};
//!
//! let mut comp = Computation::builder("daily-flow", Box::new(Averager::new()))
//!     .input("input", InputBinding::new("flow.hourly", IntervalSpec::parse("1 hour")?))
//!     .output("average", OutputBinding::new("flow.daily", IntervalSpec::parse("1 day")?))
//!     .property("aggregateTimeZone", "America/Denver")
//!     .build()?;
//!
//! let executor = Executor::new(Arc::new(store));
//! let report = executor.run(&mut comp, &batch);
//! ```
#![warn(missing_docs)]

/// The algorithm contract and its declared schema.
pub mod algorithm;
/// Computations: an algorithm bound to series and properties.
pub mod computation;
/// The handle passed to every callback.
pub mod context;
/// The iteration state machine.
pub mod dispatcher;
/// Batch runner and trigger batches.
pub mod executor;
mod missing;
/// Output intent tracking and run state.
pub mod output;
/// Typed algorithm properties.
pub mod properties;
/// Per-instant input bindings.
pub mod slice;
/// Per-run input and output data.
pub mod working;

pub use algorithm::{
    AlgoKind, Algorithm, AlgorithmSchema, PropertyKind, PropertySpec, RoleSpec, ValueKind,
};
pub use computation::{
    AggregateSetup, Bindings, Computation, ComputationBuilder, InputBinding, OutputBinding,
};
pub use context::RunContext;
pub use dispatcher::{DispatchState, SliceDispatcher};
pub use executor::{Executor, TriggerBatch};
pub use output::{OutputTracker, RunState, UNCHANGED_EPSILON};
pub use properties::{BoundProperties, PropertyValue};
pub use slice::TimeSlice;
pub use working::WorkingSet;

pub use tscomp_core::{
    AggregatePeriod, BoundClosure, CalendarUnit, CompError, IfQuestionable, IntervalIncrement,
    IntervalSpec, MISSING_F64, MISSING_I64, MissingAction, PeriodCalculator, RunConfig,
    RunFailure, RunReport, RunSummary, Sample, SampleFlags, SeriesKey, TimeSeries,
    TimeSeriesStore, Value, is_missing,
};
