//! Deterministic sample data.

mod series;

pub use series::{at, hourly, hourly_from, local};
