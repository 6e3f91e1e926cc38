//! CI-safe collaborators for tscomp tests and demos.
//!
//! - [`MemoryStore`]: an in-memory [`tscomp_core::TimeSeriesStore`] with
//!   per-series failure injection and a log of everything flushed to it.
//!   Any call against the series [`FAIL_SERIES`] fails.
//! - [`fixtures`]: deterministic instants and hourly sample runs.
//! - [`Scaler`] and [`Averager`]: reference algorithms for each grouping kind.
#![warn(missing_docs)]

mod algorithms;
pub mod fixtures;
mod store;

pub use algorithms::{Averager, Scaler};
pub use store::{AppliedWrite, FAIL_SERIES, MemoryStore, MockBehavior, StoreController};
