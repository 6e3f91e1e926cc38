//! Series identifiers usable across crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one stored time series (site, parameter, interval, version...).
///
/// The engine treats the key as opaque; stores decide how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesKey(String);

impl SeriesKey {
    /// Construct a key from any string-like identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SeriesKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}
