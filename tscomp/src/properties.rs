//! Typed binding of string properties against an algorithm's declared schema.

use std::collections::BTreeMap;

use tscomp_core::{CompError, IntervalSpec, parse_bool};

use crate::algorithm::{PropertyKind, PropertySpec};

/// A property value after type checking.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Floating point.
    Number(f64),
    /// Integer.
    Integer(i64),
    /// Boolean.
    Bool(bool),
    /// Free text.
    Text(String),
    /// A parsed interval.
    Interval(IntervalSpec),
}

impl PropertyValue {
    fn parse(spec: &PropertySpec, raw: &str) -> Result<Self, CompError> {
        let v = raw.trim();
        let bad = |what: &str| {
            CompError::config(format!("property '{}' requires {what}, got '{v}'", spec.name))
        };
        Ok(match spec.kind {
            PropertyKind::Number => Self::Number(v.parse().map_err(|_| bad("a number"))?),
            PropertyKind::Integer => Self::Integer(v.parse().map_err(|_| bad("an integer"))?),
            PropertyKind::Bool => Self::Bool(parse_bool(spec.name, v)?),
            PropertyKind::Text => Self::Text(raw.to_string()),
            PropertyKind::Interval => {
                Self::Interval(IntervalSpec::parse(v).map_err(|_| bad("an interval"))?)
            }
        })
    }
}

/// Properties of one computation, typed according to the algorithm schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundProperties {
    values: BTreeMap<&'static str, PropertyValue>,
}

impl BoundProperties {
    /// Types each declared property from `raw`, falling back to its default.
    ///
    /// Names match case-insensitively. Undeclared entries are ignored; they
    /// may belong to the run configuration.
    ///
    /// # Errors
    /// Returns `CompError::Configuration` for a malformed value or a required
    /// property that is absent.
    pub fn bind(specs: &[PropertySpec], raw: &BTreeMap<String, String>) -> Result<Self, CompError> {
        let mut values = BTreeMap::new();
        for spec in specs {
            let supplied = raw
                .iter()
                .find(|(k, v)| k.eq_ignore_ascii_case(spec.name) && !v.trim().is_empty())
                .map(|(_, v)| v.as_str());
            match supplied.or(spec.default) {
                Some(text) => {
                    values.insert(spec.name, PropertyValue::parse(spec, text)?);
                }
                None if spec.required => {
                    return Err(CompError::config(format!(
                        "missing required property '{}'",
                        spec.name
                    )));
                }
                None => {}
            }
        }
        Ok(Self { values })
    }

    /// The bound value of `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Numeric property; integers widen.
    ///
    /// # Errors
    /// `CompError::Configuration` if unset or not numeric.
    pub fn number(&self, name: &str) -> Result<f64, CompError> {
        match self.get(name) {
            Some(PropertyValue::Number(v)) => Ok(*v),
            #[allow(clippy::cast_precision_loss)]
            Some(PropertyValue::Integer(v)) => Ok(*v as f64),
            other => Err(Self::mismatch(name, "number", other)),
        }
    }

    /// Integer property.
    ///
    /// # Errors
    /// `CompError::Configuration` if unset or not an integer.
    pub fn integer(&self, name: &str) -> Result<i64, CompError> {
        match self.get(name) {
            Some(PropertyValue::Integer(v)) => Ok(*v),
            other => Err(Self::mismatch(name, "integer", other)),
        }
    }

    /// Boolean property.
    ///
    /// # Errors
    /// `CompError::Configuration` if unset or not a boolean.
    pub fn flag(&self, name: &str) -> Result<bool, CompError> {
        match self.get(name) {
            Some(PropertyValue::Bool(v)) => Ok(*v),
            other => Err(Self::mismatch(name, "boolean", other)),
        }
    }

    /// Text property.
    ///
    /// # Errors
    /// `CompError::Configuration` if unset or not text.
    pub fn text(&self, name: &str) -> Result<&str, CompError> {
        match self.get(name) {
            Some(PropertyValue::Text(v)) => Ok(v),
            other => Err(Self::mismatch(name, "text", other)),
        }
    }

    /// Interval property.
    ///
    /// # Errors
    /// `CompError::Configuration` if unset or not an interval.
    pub fn interval(&self, name: &str) -> Result<IntervalSpec, CompError> {
        match self.get(name) {
            Some(PropertyValue::Interval(v)) => Ok(*v),
            other => Err(Self::mismatch(name, "interval", other)),
        }
    }

    fn mismatch(name: &str, wanted: &str, got: Option<&PropertyValue>) -> CompError {
        match got {
            None => CompError::config(format!("property '{name}' is not set")),
            Some(v) => CompError::config(format!("property '{name}' is not a {wanted}: {v:?}")),
        }
    }
}
