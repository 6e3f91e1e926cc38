use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tscomp_core::Sample;

/// One evaluation instant: the base time plus the sample each input role sees.
///
/// Roles absent from the map had no value at their parameter time and were
/// not filled.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlice {
    base_time: DateTime<Utc>,
    pub(crate) inputs: BTreeMap<&'static str, Sample>,
}

impl TimeSlice {
    pub(crate) const fn new(base_time: DateTime<Utc>) -> Self {
        Self {
            base_time,
            inputs: BTreeMap::new(),
        }
    }

    /// The slice's base time.
    #[must_use]
    pub const fn base_time(&self) -> DateTime<Utc> {
        self.base_time
    }

    /// Sample bound to `role`, if present.
    #[must_use]
    pub fn input(&self, role: &str) -> Option<&Sample> {
        self.inputs.get(role)
    }

    /// Bound roles and their samples.
    pub fn inputs(&self) -> impl Iterator<Item = (&'static str, &Sample)> {
        self.inputs.iter().map(|(r, s)| (*r, s))
    }
}
