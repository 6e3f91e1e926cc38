// Shared fixtures so tests can `use crate::helpers::*;`
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tscomp::{
    AlgoKind, Algorithm, AlgorithmSchema, CompError, Executor, IntervalSpec, PropertySpec,
    RoleSpec, RunContext, RunSummary,
};
use tscomp_mock::{AppliedWrite, MemoryStore, StoreController};

pub use tscomp_mock::fixtures::{at, hourly, hourly_from, local};

/// Callback body supplied by a test.
pub type Hook = Box<dyn FnMut(&mut RunContext<'_>) -> Result<(), CompError> + Send>;

/// An algorithm whose callbacks are supplied by the test and which records
/// every lifecycle call.
pub struct Scripted {
    kind: AlgoKind,
    inputs: Vec<&'static str>,
    outputs: Vec<&'static str>,
    properties: Vec<PropertySpec>,
    on_slice: Hook,
    after_slices: Option<Hook>,
    log: Arc<Mutex<Vec<String>>>,
}

impl Scripted {
    pub fn new(kind: AlgoKind) -> Self {
        Self {
            kind,
            inputs: vec!["a"],
            outputs: vec!["out"],
            properties: Vec::new(),
            on_slice: Box::new(|_| Ok(())),
            after_slices: None,
            log: Arc::default(),
        }
    }

    pub fn inputs(mut self, roles: &[&'static str]) -> Self {
        self.inputs = roles.to_vec();
        self
    }

    pub fn outputs(mut self, roles: &[&'static str]) -> Self {
        self.outputs = roles.to_vec();
        self
    }

    pub fn property(mut self, spec: PropertySpec) -> Self {
        self.properties.push(spec);
        self
    }

    pub fn on_slice(
        mut self,
        f: impl FnMut(&mut RunContext<'_>) -> Result<(), CompError> + Send + 'static,
    ) -> Self {
        self.on_slice = Box::new(f);
        self
    }

    pub fn after_slices(
        mut self,
        f: impl FnMut(&mut RunContext<'_>) -> Result<(), CompError> + Send + 'static,
    ) -> Self {
        self.after_slices = Some(Box::new(f));
        self
    }

    /// Handle to the lifecycle log; valid after the algorithm is boxed.
    pub fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }

    fn record(&self, event: impl Into<String>) {
        self.log.lock().unwrap().push(event.into());
    }
}

impl Algorithm for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn schema(&self) -> AlgorithmSchema {
        let mut schema = AlgorithmSchema::new(self.kind);
        for r in &self.inputs {
            schema = schema.input(RoleSpec::number(*r));
        }
        for r in &self.outputs {
            schema = schema.output(RoleSpec::number(*r));
        }
        for p in &self.properties {
            schema = schema.property(*p);
        }
        schema
    }

    fn before_all(&mut self, _ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        self.record("before_all");
        Ok(())
    }

    fn before_time_slices(&mut self, _ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        self.record("before_time_slices");
        Ok(())
    }

    fn on_time_slice(&mut self, ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        self.record(format!(
            "slice {}",
            ctx.base_time().map_or(-1, |t| t.timestamp())
        ));
        (self.on_slice)(ctx)
    }

    fn after_time_slices(&mut self, ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        self.record("after_time_slices");
        match self.after_slices.as_mut() {
            Some(f) => f(ctx),
            None => Ok(()),
        }
    }

    fn after_all(&mut self, _ctx: &mut RunContext<'_>) -> Result<(), CompError> {
        self.record("after_all");
        Ok(())
    }
}

pub fn executor() -> (Executor, StoreController) {
    let (store, controller) = MemoryStore::new_with_controller("mem");
    (Executor::new(store), controller)
}

pub fn hour() -> IntervalSpec {
    IntervalSpec::parse("1 hour").unwrap()
}

pub fn day() -> IntervalSpec {
    IntervalSpec::parse("1 day").unwrap()
}

/// Stored numeric value of `series` at `t`.
pub fn value_at(controller: &StoreController, series: &str, t: DateTime<Utc>) -> Option<f64> {
    controller
        .series(series)
        .get(t)
        .map(|s| s.value().as_f64().unwrap())
}

/// Number of deletes flushed to `series`.
pub fn deletes(controller: &StoreController, series: &str) -> usize {
    controller
        .writes_to(series)
        .iter()
        .filter(|w| matches!(w, AppliedWrite::Delete(..)))
        .count()
}

pub fn summary(report: &tscomp::RunReport) -> RunSummary {
    match &report.outcome {
        Ok(s) => *s,
        Err(f) => panic!("run failed: {f}"),
    }
}
