//! Value types, flags, configuration and errors shared by the tscomp crates.
#![warn(missing_docs)]

mod config;
mod error;
mod flags;
mod period;
mod reports;
mod sample;
mod series_key;

pub use config::{AggregateConfig, IfQuestionable, MissingAction, RunConfig, parse_bool};
pub use error::CompError;
pub use flags::SampleFlags;
pub use period::{AggregatePeriod, BoundClosure};
pub use reports::{RunFailure, RunReport, RunSummary};
pub use sample::{MISSING_F64, MISSING_F64_ALT, MISSING_I64, Sample, Value, is_missing};
pub use series_key::SeriesKey;
