//! Report envelopes produced by the executor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CompError;
use crate::period::AggregatePeriod;

/// Counters describing a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Distinct base times found in the triggering input data.
    pub base_times: usize,
    /// Time slices whose per-slice callback ran.
    pub slices_executed: usize,
    /// Time slices skipped by missing-data policy or a data error.
    pub slices_skipped: usize,
    /// Aggregate periods processed (zero for time-slice algorithms).
    pub periods: usize,
    /// Samples marked to-write across all outputs and edited inputs.
    pub written: usize,
    /// Samples marked to-delete across all outputs.
    pub deleted: usize,
}

/// A fatal error together with where in the run it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    /// The error that aborted the run.
    pub error: CompError,
    /// Base time of the slice being processed, if any.
    pub base_time: Option<DateTime<Utc>>,
    /// Aggregate period being processed, if any.
    pub period: Option<AggregatePeriod>,
}

impl RunFailure {
    /// Failure with no location, e.g. before iteration started.
    #[must_use]
    pub const fn unlocated(error: CompError) -> Self {
        Self {
            error,
            base_time: None,
            period: None,
        }
    }
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(p) = &self.period {
            write!(f, " in period {p}")?;
        }
        if let Some(t) = self.base_time {
            write!(f, " at base time {t}")?;
        }
        Ok(())
    }
}

/// Result of one triggered computation run.
///
/// Each queued run reports independently; a failure here says nothing about
/// other runs in the same batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Name of the computation.
    pub computation: String,
    /// Summary on success, located failure otherwise.
    pub outcome: Result<RunSummary, RunFailure>,
    /// Samples handed to the store during the flush that follows the run.
    pub flushed: usize,
    /// Non-fatal issues, such as skipped slices or flush errors beyond the
    /// first.
    pub warnings: Vec<CompError>,
}

impl RunReport {
    /// True if the run completed without a fatal error.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            Ok(s) => write!(
                f,
                "{}: run ok, {} base times, {} slices ({} skipped), {} periods, {} written, {} deleted",
                self.computation,
                s.base_times,
                s.slices_executed,
                s.slices_skipped,
                s.periods,
                s.written,
                s.deleted,
            )?,
            Err(failure) => write!(f, "{}: run failed: {failure}", self.computation)?,
        }
        write!(f, "; {} flushed", self.flushed)?;
        if !self.warnings.is_empty() {
            write!(f, ", {} warnings", self.warnings.len())?;
        }
        Ok(())
    }
}
