//! Small reference algorithms, one per grouping kind.

use tscomp::{
    AlgoKind, Algorithm, AlgorithmSchema, BoundProperties, CompError, PropertyKind, PropertySpec,
    RoleSpec, RunContext, is_missing,
};

/// `output = input * multiplier + offset`, one slice at a time.
///
/// A missing input produces no output, leaving the auto-delete rule to clean
/// up after deleted inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    multiplier: f64,
    offset: f64,
}

impl Default for Scaler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scaler {
    /// Identity scaling until properties are bound.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            multiplier: 1.0,
            offset: 0.0,
        }
    }
}

impl Algorithm for Scaler {
    fn name(&self) -> &'static str {
        "scaler"
    }

    fn schema(&self) -> AlgorithmSchema {
        AlgorithmSchema::new(AlgoKind::TimeSlice)
            .input(RoleSpec::number("input"))
            .output(RoleSpec::number("output"))
            .property(PropertySpec::optional(
                "multiplier",
                PropertyKind::Number,
                Some("1"),
                "factor applied to the input",
            ))
            .property(PropertySpec::optional(
                "offset",
                PropertyKind::Number,
                Some("0"),
                "added after scaling",
            ))
    }

    fn init(&mut self, props: &BoundProperties) -> Result<(), CompError> {
        self.multiplier = props.number("multiplier")?;
        self.offset = props.number("offset")?;
        Ok(())
    }

    fn on_time_slice(&mut self, ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        let v = ctx.input_f64("input");
        if is_missing(v) {
            return Ok(());
        }
        ctx.set_output("output", v * self.multiplier + self.offset)
    }
}

/// Mean of the inputs of each period, periodic or running.
///
/// With fewer than `minSamplesNeeded` values the period's output is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Averager {
    kind: AlgoKind,
    min_samples: i64,
    sum: f64,
    count: i64,
}

impl Averager {
    /// Averages over calendar periods.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_kind(AlgoKind::Aggregating)
    }

    /// Averages over a window ending at every base time.
    #[must_use]
    pub const fn running() -> Self {
        Self::with_kind(AlgoKind::RunningAggregate)
    }

    const fn with_kind(kind: AlgoKind) -> Self {
        Self {
            kind,
            min_samples: 1,
            sum: 0.0,
            count: 0,
        }
    }
}

impl Default for Averager {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for Averager {
    fn name(&self) -> &'static str {
        match self.kind {
            AlgoKind::RunningAggregate => "running-average",
            _ => "average",
        }
    }

    fn schema(&self) -> AlgorithmSchema {
        AlgorithmSchema::new(self.kind)
            .input(RoleSpec::number("input"))
            .output(RoleSpec::number("average"))
            .controlling_output("average")
            .property(PropertySpec::optional(
                "minSamplesNeeded",
                PropertyKind::Integer,
                Some("1"),
                "fewest values that still produce an average",
            ))
    }

    fn init(&mut self, props: &BoundProperties) -> Result<(), CompError> {
        self.min_samples = props.integer("minSamplesNeeded")?;
        if self.min_samples < 1 {
            return Err(CompError::config("minSamplesNeeded must be at least 1"));
        }
        Ok(())
    }

    fn before_time_slices(&mut self, _ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        self.sum = 0.0;
        self.count = 0;
        Ok(())
    }

    fn on_time_slice(&mut self, ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        let v = ctx.input_f64("input");
        if !is_missing(v) {
            self.sum += v;
            self.count += 1;
        }
        Ok(())
    }

    fn after_time_slices(&mut self, ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        if self.count >= self.min_samples {
            #[allow(clippy::cast_precision_loss)]
            let mean = self.sum / self.count as f64;
            ctx.set_output("average", mean)
        } else {
            ctx.delete_output("average")
        }
    }
}
