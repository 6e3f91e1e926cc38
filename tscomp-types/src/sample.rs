//! Timestamped values and the missing-value sentinels algorithms see.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CompError;
use crate::flags::SampleFlags;

/// Sentinel a numeric input takes when absent or deleted.
pub const MISSING_F64: f64 = f64::NEG_INFINITY;

/// Second numeric sentinel: the smallest positive subnormal double.
pub const MISSING_F64_ALT: f64 = f64::from_bits(1);

/// Sentinel an integer input takes when absent or deleted.
pub const MISSING_I64: i64 = i64::MIN;

/// Returns true if `v` is one of the numeric missing-value markers.
#[must_use]
pub fn is_missing(v: f64) -> bool {
    v == MISSING_F64 || v.to_bits() == MISSING_F64_ALT.to_bits()
}

/// Payload of a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Floating-point measurement.
    Number(f64),
    /// Integral measurement or code.
    Integer(i64),
    /// Free text.
    Text(String),
}

impl Value {
    /// True when this value is one of the reserved missing markers.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Number(v) => is_missing(*v),
            Self::Integer(i) => *i == MISSING_I64,
            Self::Text(_) => false,
        }
    }

    /// Numeric view of this value.
    ///
    /// # Errors
    /// Returns `CompError::Data` when the value is text that does not parse as a number.
    pub fn as_f64(&self) -> Result<f64, CompError> {
        match self {
            Self::Number(v) => Ok(*v),
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(i) => Ok(*i as f64),
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| CompError::data(format!("'{s}' is not a number"))),
        }
    }

    /// Integer view of this value (numbers are rounded).
    ///
    /// # Errors
    /// Returns `CompError::Data` for non-finite numbers or unparseable text.
    pub fn as_i64(&self) -> Result<i64, CompError> {
        match self {
            Self::Integer(i) => Ok(*i),
            Self::Number(v) if v.is_finite() => {
                #[allow(clippy::cast_possible_truncation)]
                Ok(v.round() as i64)
            }
            Self::Number(v) => Err(CompError::data(format!("{v} has no integer value"))),
            Self::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| CompError::data(format!("'{s}' is not an integer"))),
        }
    }

    /// Text view of this value.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(v) => v.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One timestamped value with its provenance flags.
///
/// Samples are values: changing the flags or time produces a new sample and
/// the owner replaces the stored one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    time: DateTime<Utc>,
    value: Value,
    flags: SampleFlags,
}

impl Sample {
    /// Construct a sample with empty flags.
    pub fn new(time: DateTime<Utc>, value: impl Into<Value>) -> Self {
        Self {
            time,
            value: value.into(),
            flags: SampleFlags::empty(),
        }
    }

    /// Timestamp of the sample.
    #[must_use]
    pub const fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Payload of the sample.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Current flag bits.
    #[must_use]
    pub const fn flags(&self) -> SampleFlags {
        self.flags
    }

    /// Replace all flag bits.
    #[must_use]
    pub fn with_flags(mut self, flags: SampleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the given bits, leaving the others alone.
    #[must_use]
    pub fn with_bits(mut self, bits: SampleFlags) -> Self {
        self.flags |= bits;
        self
    }

    /// Clear the given bits, leaving the others alone.
    #[must_use]
    pub fn without_bits(mut self, bits: SampleFlags) -> Self {
        self.flags &= !bits;
        self
    }

    /// Move the sample to another timestamp.
    #[must_use]
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    /// Replace the payload.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// Marks this sample for writing, clearing any pending delete.
    #[must_use]
    pub fn to_write(self) -> Self {
        self.without_bits(SampleFlags::TO_DELETE)
            .with_bits(SampleFlags::TO_WRITE)
    }

    /// Marks this sample for deletion, clearing any pending write.
    #[must_use]
    pub fn to_delete(self) -> Self {
        self.without_bits(SampleFlags::TO_WRITE)
            .with_bits(SampleFlags::TO_DELETE)
    }
}
