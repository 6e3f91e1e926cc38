use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the tscomp workspace.
///
/// Configuration and storage problems abort a run; data problems are local to
/// the slice in which they occur.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompError {
    /// Invalid interval string, unresolvable controlling output, bad or missing property.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A sample value could not be converted to the type a role requires.
    #[error("data error: {0}")]
    Data(String),

    /// The backing store failed to read or write.
    #[error("storage error on '{series}': {msg}")]
    Storage {
        /// Series the failing operation targeted.
        series: String,
        /// Human-readable error message.
        msg: String,
    },

    /// An algorithm callback failed.
    #[error("algorithm error: {0}")]
    Algorithm(String),
}

impl CompError {
    /// Helper: build a `Configuration` error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Helper: build a `Data` error.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Helper: build a `Storage` error for a series identifier.
    pub fn storage(series: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Storage {
            series: series.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build an `Algorithm` error.
    pub fn algorithm(msg: impl Into<String>) -> Self {
        Self::Algorithm(msg.into())
    }

    /// Whether this error aborts the whole run.
    ///
    /// Only `Data` errors are recoverable; the affected slice is skipped.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Data(_))
    }
}
