//! In-memory ordered series used as the working set of a run.
//!
//! - `series`: the ordered container and range queries
//! - `lookup`: tolerance and neighbour lookups, interpolation
mod lookup;
mod series;

pub use lookup::interpolate;
pub use series::TimeSeries;
