use tscomp_core::{BoundClosure, CompError, Value};

use crate::context::RunContext;
use crate::properties::BoundProperties;

/// How an algorithm groups time slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgoKind {
    /// One evaluation per base time.
    TimeSlice,
    /// Slices grouped into calendar-aligned aggregate periods.
    Aggregating,
    /// Slices grouped into a window ending at every base time.
    RunningAggregate,
}

impl AlgoKind {
    /// True for both aggregating kinds.
    #[must_use]
    pub const fn is_aggregating(self) -> bool {
        !matches!(self, Self::TimeSlice)
    }

    /// Boundary closure used when the run configuration does not set one.
    #[must_use]
    pub const fn default_closure(self) -> BoundClosure {
        match self {
            Self::RunningAggregate => BoundClosure::RUNNING,
            _ => BoundClosure::AGGREGATE,
        }
    }
}

/// Value type a role reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Floating point.
    Number,
    /// Integer.
    Integer,
    /// Text.
    Text,
}

impl ValueKind {
    /// Converts `value` to this kind. Missing sentinels pass through unchanged
    /// so they still read as deletes.
    ///
    /// # Errors
    /// `CompError::Data` when the value has no representation in this kind.
    pub fn coerce(self, value: Value) -> Result<Value, CompError> {
        if value.is_missing() {
            return Ok(value);
        }
        Ok(match (self, value) {
            (Self::Number, v @ Value::Number(_))
            | (Self::Integer, v @ Value::Integer(_))
            | (Self::Text, v @ Value::Text(_)) => v,
            (Self::Number, v) => Value::Number(v.as_f64()?),
            (Self::Integer, v) => Value::Integer(v.as_i64()?),
            (Self::Text, v) => Value::Text(v.as_text()),
        })
    }
}

/// A named input or output parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSpec {
    /// Role name, matched case-sensitively against bindings.
    pub name: &'static str,
    /// Value type of the role.
    pub kind: ValueKind,
}

impl RoleSpec {
    /// A numeric role.
    #[must_use]
    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: ValueKind::Number,
        }
    }

    /// An integer role.
    #[must_use]
    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ValueKind::Integer,
        }
    }

    /// A text role.
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ValueKind::Text,
        }
    }
}

/// Type of an algorithm property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Floating point.
    Number,
    /// Integer.
    Integer,
    /// Boolean.
    Bool,
    /// Free text.
    Text,
    /// An interval name such as `"1 day"`.
    Interval,
}

/// A typed, named algorithm property with an optional default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    /// Property name, matched case-insensitively.
    pub name: &'static str,
    /// Expected type.
    pub kind: PropertyKind,
    /// Default used when the property is not supplied.
    pub default: Option<&'static str>,
    /// Absent with no default is a configuration error.
    pub required: bool,
    /// One-line description for editors.
    pub description: &'static str,
}

impl PropertySpec {
    /// A property that must be supplied.
    #[must_use]
    pub const fn required(name: &'static str, kind: PropertyKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            default: None,
            required: true,
            description,
        }
    }

    /// A property that falls back to `default` (or stays unset when `None`).
    #[must_use]
    pub const fn optional(
        name: &'static str,
        kind: PropertyKind,
        default: Option<&'static str>,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            default,
            required: false,
            description,
        }
    }
}

/// Everything the engine needs to know about an algorithm before running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmSchema {
    /// Grouping behaviour.
    pub kind: AlgoKind,
    /// Declared input roles.
    pub inputs: Vec<RoleSpec>,
    /// Declared output roles.
    pub outputs: Vec<RoleSpec>,
    /// Declared properties.
    pub properties: Vec<PropertySpec>,
    /// Output whose interval defines the aggregate period when
    /// `aggPeriodInterval` is not set.
    pub controlling_output: Option<&'static str>,
}

impl AlgorithmSchema {
    /// An empty schema of the given kind.
    #[must_use]
    pub const fn new(kind: AlgoKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            properties: Vec::new(),
            controlling_output: None,
        }
    }

    /// Declares an input role.
    #[must_use]
    pub fn input(mut self, role: RoleSpec) -> Self {
        self.inputs.push(role);
        self
    }

    /// Declares an output role.
    #[must_use]
    pub fn output(mut self, role: RoleSpec) -> Self {
        self.outputs.push(role);
        self
    }

    /// Declares a property.
    #[must_use]
    pub fn property(mut self, spec: PropertySpec) -> Self {
        self.properties.push(spec);
        self
    }

    /// Names the output whose interval defines aggregate periods.
    #[must_use]
    pub fn controlling_output(mut self, role: &'static str) -> Self {
        self.controlling_output = Some(role);
        self
    }

    /// Looks up a declared input role.
    #[must_use]
    pub fn input_role(&self, name: &str) -> Option<&RoleSpec> {
        self.inputs.iter().find(|r| r.name == name)
    }

    /// Looks up a declared output role.
    #[must_use]
    pub fn output_role(&self, name: &str) -> Option<&RoleSpec> {
        self.outputs.iter().find(|r| r.name == name)
    }
}

/// A pluggable computation.
///
/// The engine owns iteration. Per run it calls
/// `before_all`, then `before_time_slices`, `on_time_slice` for every slice and
/// `after_time_slices` (once per aggregate period, or once in total for
/// time-slice algorithms), then `after_all`. Every callback receives a
/// [`RunContext`] for reading inputs and writing outputs.
///
/// Returning `CompError::Data` from `on_time_slice` skips that slice; any
/// other error aborts the run.
pub trait Algorithm: Send {
    /// A stable identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Roles, properties and grouping behaviour.
    fn schema(&self) -> AlgorithmSchema;

    /// Receives the bound properties once, when the computation is built.
    ///
    /// # Errors
    /// Implementations return `CompError::Configuration` for unusable settings.
    fn init(&mut self, props: &BoundProperties) -> Result<(), CompError> {
        let _ = props;
        Ok(())
    }

    /// Called once at the start of a run.
    ///
    /// # Errors
    /// Any error aborts the run.
    fn before_all(&mut self, ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        let _ = ctx;
        Ok(())
    }

    /// Called before the slices of each aggregate period, or once before all
    /// slices of a time-slice run.
    ///
    /// # Errors
    /// Any error aborts the run.
    fn before_time_slices(&mut self, ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        let _ = ctx;
        Ok(())
    }

    /// Called once per time slice that passes the missing-data policy.
    ///
    /// # Errors
    /// `CompError::Data` skips the slice; anything else aborts the run.
    fn on_time_slice(&mut self, ctx: &mut RunContext<'_>) -> Result<(), CompError>;

    /// Called after the slices of each aggregate period, or once after all
    /// slices of a time-slice run.
    ///
    /// # Errors
    /// Any error aborts the run.
    fn after_time_slices(&mut self, ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        let _ = ctx;
        Ok(())
    }

    /// Called once at the end of a successful run.
    ///
    /// # Errors
    /// Any error aborts the run.
    fn after_all(&mut self, ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        let _ = ctx;
        Ok(())
    }
}
