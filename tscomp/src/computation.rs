use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use tscomp_core::{
    BoundClosure, CompError, IntervalIncrement, IntervalSpec, MissingAction, PeriodCalculator,
    RunConfig, SeriesKey,
};

use crate::algorithm::{AlgoKind, Algorithm, AlgorithmSchema};
use crate::properties::BoundProperties;

/// Binds an input role to a concrete series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBinding {
    /// Series the role reads.
    pub series: SeriesKey,
    /// Nominal interval of the series.
    pub interval: IntervalSpec,
    /// Seconds added to a base time to get this role's parameter time.
    pub delta_t_secs: i64,
    /// What to do when the role has no value at a parameter time.
    pub missing: MissingAction,
}

impl InputBinding {
    /// Binding with no time shift and the `Ignore` missing action.
    pub fn new(series: impl Into<SeriesKey>, interval: IntervalSpec) -> Self {
        Self {
            series: series.into(),
            interval,
            delta_t_secs: 0,
            missing: MissingAction::default(),
        }
    }

    /// Shifts the parameter time by `secs`.
    #[must_use]
    pub const fn delta_t(mut self, secs: i64) -> Self {
        self.delta_t_secs = secs;
        self
    }

    /// Sets the missing-data action.
    #[must_use]
    pub const fn missing(mut self, action: MissingAction) -> Self {
        self.missing = action;
        self
    }

    pub(crate) fn param_time(&self, base: DateTime<Utc>) -> DateTime<Utc> {
        base + TimeDelta::seconds(self.delta_t_secs)
    }
}

/// Binds an output role to a concrete series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBinding {
    /// Series the role writes.
    pub series: SeriesKey,
    /// Nominal interval of the series.
    pub interval: IntervalSpec,
    /// Seconds added to the default output time.
    pub delta_t_secs: i64,
}

impl OutputBinding {
    /// Binding with no time shift.
    pub fn new(series: impl Into<SeriesKey>, interval: IntervalSpec) -> Self {
        Self {
            series: series.into(),
            interval,
            delta_t_secs: 0,
        }
    }

    /// Shifts the default output time by `secs`.
    #[must_use]
    pub const fn delta_t(mut self, secs: i64) -> Self {
        self.delta_t_secs = secs;
        self
    }
}

/// Period settings resolved for aggregating algorithms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSetup {
    /// Calculator configured with zone, closure and offset.
    pub calculator: PeriodCalculator,
    /// Interval each period spans.
    pub interval: IntervalSpec,
}

impl AggregateSetup {
    /// Boundary closure in effect.
    #[must_use]
    pub const fn closure(&self) -> BoundClosure {
        self.calculator.closure()
    }
}

/// The resolved, immutable side of a computation.
#[derive(Debug, Clone)]
pub struct Bindings {
    pub(crate) schema: AlgorithmSchema,
    pub(crate) inputs: BTreeMap<&'static str, InputBinding>,
    pub(crate) outputs: BTreeMap<&'static str, OutputBinding>,
    pub(crate) config: RunConfig,
    pub(crate) aggregate: Option<AggregateSetup>,
}

impl Bindings {
    /// Grouping behaviour of the algorithm.
    #[must_use]
    pub const fn kind(&self) -> AlgoKind {
        self.schema.kind
    }

    /// The algorithm's declared schema.
    #[must_use]
    pub const fn schema(&self) -> &AlgorithmSchema {
        &self.schema
    }

    /// Run configuration parsed from the computation properties.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Binding of an input role.
    #[must_use]
    pub fn input(&self, role: &str) -> Option<&InputBinding> {
        self.inputs.get(role)
    }

    /// Binding of an output role.
    #[must_use]
    pub fn output(&self, role: &str) -> Option<&OutputBinding> {
        self.outputs.get(role)
    }

    /// Period settings, for aggregating algorithms.
    #[must_use]
    pub const fn aggregate(&self) -> Option<&AggregateSetup> {
        self.aggregate.as_ref()
    }

    /// Tolerance used to match samples to parameter times.
    pub(crate) const fn fudge_secs(&self) -> i64 {
        self.config.round_secs / 2
    }
}

/// An algorithm bound to series, properties and run configuration.
pub struct Computation {
    name: String,
    pub(crate) algorithm: Box<dyn Algorithm>,
    pub(crate) bindings: Bindings,
}

impl std::fmt::Debug for Computation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computation")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm.name())
            .field("bindings", &self.bindings)
            .finish()
    }
}

impl Computation {
    /// Start building a computation around `algorithm`.
    ///
    /// ```rust,ignore
    /// let comp = Computation::builder("daily-mean", Box::new(Averager::new()))
    ///     .input("input", InputBinding::new("flow.hourly", IntervalSpec::parse("1 hour")?))
    ///     .output("average", OutputBinding::new("flow.daily", IntervalSpec::parse("1 day")?))
    ///     .property("aggregateTimeZone", "America/Los_Angeles")
    ///     .build()?;
    /// ```
    pub fn builder(name: impl Into<String>, algorithm: Box<dyn Algorithm>) -> ComputationBuilder {
        ComputationBuilder {
            name: name.into(),
            algorithm,
            inputs: Vec::new(),
            outputs: Vec::new(),
            properties: BTreeMap::new(),
            effective: (None, None),
        }
    }

    /// Name used in reports.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the bound algorithm.
    #[must_use]
    pub fn algorithm_name(&self) -> &'static str {
        self.algorithm.name()
    }

    /// Resolved bindings and configuration.
    #[must_use]
    pub const fn bindings(&self) -> &Bindings {
        &self.bindings
    }
}

/// Builder for [`Computation`].
pub struct ComputationBuilder {
    name: String,
    algorithm: Box<dyn Algorithm>,
    inputs: Vec<(String, InputBinding)>,
    outputs: Vec<(String, OutputBinding)>,
    properties: BTreeMap<String, String>,
    effective: (Option<DateTime<Utc>>, Option<DateTime<Utc>>),
}

impl ComputationBuilder {
    /// Binds an input role.
    #[must_use]
    pub fn input(mut self, role: impl Into<String>, binding: InputBinding) -> Self {
        self.inputs.push((role.into(), binding));
        self
    }

    /// Binds an output role.
    #[must_use]
    pub fn output(mut self, role: impl Into<String>, binding: OutputBinding) -> Self {
        self.outputs.push((role.into(), binding));
        self
    }

    /// Sets a property; later values replace earlier ones.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Sets several properties.
    #[must_use]
    pub fn properties<I, K, V>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.properties
            .extend(props.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Limits base times to `[start, end]`; `None` leaves that side open.
    #[must_use]
    pub fn effective_range(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.effective = (start, end);
        self
    }

    /// Validates the bindings, resolves the aggregate period settings and
    /// initialises the algorithm.
    ///
    /// # Errors
    /// Returns `CompError::Configuration` for unknown or duplicate roles, bad
    /// property values, an irregular or unresolvable aggregate interval, or an
    /// error from the algorithm's `init`.
    pub fn build(mut self) -> Result<Computation, CompError> {
        let schema = self.algorithm.schema();
        let mut config = RunConfig::from_properties(&self.properties)?;
        (config.effective_start, config.effective_end) = self.effective;
        let props = BoundProperties::bind(&schema.properties, &self.properties)?;

        let mut inputs = BTreeMap::new();
        for (role, binding) in self.inputs {
            let spec = schema.input_role(&role).ok_or_else(|| {
                CompError::config(format!("'{}' has no input role '{role}'", self.name))
            })?;
            if inputs.insert(spec.name, binding).is_some() {
                return Err(CompError::config(format!("input role '{role}' bound twice")));
            }
        }
        let mut outputs = BTreeMap::new();
        for (role, binding) in self.outputs {
            let spec = schema.output_role(&role).ok_or_else(|| {
                CompError::config(format!("'{}' has no output role '{role}'", self.name))
            })?;
            if outputs.insert(spec.name, binding).is_some() {
                return Err(CompError::config(format!("output role '{role}' bound twice")));
            }
        }

        let aggregate = if schema.kind.is_aggregating() {
            Some(resolve_aggregate(&schema, &config, &outputs)?)
        } else {
            None
        };

        self.algorithm.init(&props)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            computation = %self.name,
            algorithm = self.algorithm.name(),
            inputs = inputs.len(),
            outputs = outputs.len(),
            "computation built"
        );

        Ok(Computation {
            name: self.name,
            algorithm: self.algorithm,
            bindings: Bindings {
                schema,
                inputs,
                outputs,
                config,
                aggregate,
            },
        })
    }
}

fn resolve_aggregate(
    schema: &AlgorithmSchema,
    config: &RunConfig,
    outputs: &BTreeMap<&'static str, OutputBinding>,
) -> Result<AggregateSetup, CompError> {
    let agg = &config.aggregate;
    let interval = match &agg.period_interval {
        Some(text) => IntervalSpec::parse(text)?,
        None => {
            let role = schema
                .controlling_output
                .or_else(|| schema.outputs.first().map(|r| r.name))
                .ok_or_else(|| CompError::config("aggregating algorithm declares no outputs"))?;
            outputs
                .get(role)
                .map(|b| b.interval)
                .ok_or_else(|| {
                    CompError::config(format!(
                        "controlling output '{role}' is not bound and aggPeriodInterval is not set"
                    ))
                })?
        }
    };
    if !interval.is_regular() {
        return Err(CompError::config(format!(
            "aggregate period cannot use irregular interval '{interval}'"
        )));
    }

    let defaults = schema.kind.default_closure();
    let closure = BoundClosure {
        lower: agg.lower_bound_closed.unwrap_or(defaults.lower),
        upper: agg.upper_bound_closed.unwrap_or(defaults.upper),
    };
    let offset = match &agg.time_offset {
        Some(text) => IntervalIncrement::parse_multi(text)?,
        None => Vec::new(),
    };
    Ok(AggregateSetup {
        calculator: PeriodCalculator::new(agg.time_zone)
            .with_closure(closure)
            .with_time_offset(offset),
        interval,
    })
}
