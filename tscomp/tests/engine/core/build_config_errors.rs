use tscomp::{
    AlgoKind, CompError, Computation, InputBinding, IntervalSpec, OutputBinding, PropertyKind,
    PropertySpec,
};
use tscomp_mock::{Averager, Scaler};

use crate::helpers::{Scripted, day, hour};

fn config_error(result: Result<Computation, CompError>) -> String {
    match result {
        Err(CompError::Configuration(msg)) => msg,
        Err(other) => panic!("expected a configuration error, got {other}"),
        Ok(c) => panic!("expected a configuration error, built {c:?}"),
    }
}

#[test]
fn unknown_role_is_rejected() {
    let msg = config_error(
        Computation::builder("scale", Box::new(Scaler::new()))
            .input("nope", InputBinding::new("raw", hour()))
            .build(),
    );
    assert!(msg.contains("nope"));
}

#[test]
fn duplicate_role_is_rejected() {
    let msg = config_error(
        Computation::builder("scale", Box::new(Scaler::new()))
            .input("input", InputBinding::new("raw", hour()))
            .input("input", InputBinding::new("other", hour()))
            .build(),
    );
    assert!(msg.contains("twice"));
}

#[test]
fn irregular_aggregate_interval_is_rejected() {
    config_error(
        Computation::builder("avg", Box::new(Averager::new()))
            .input("input", InputBinding::new("raw", hour()))
            .output("average", OutputBinding::new("daily", day()))
            .property("aggPeriodInterval", "instant")
            .build(),
    );
}

#[test]
fn unbound_controlling_output_needs_an_explicit_interval() {
    config_error(
        Computation::builder("avg", Box::new(Averager::new()))
            .input("input", InputBinding::new("raw", hour()))
            .build(),
    );
    // With the interval given the output can stay unbound.
    assert!(
        Computation::builder("avg", Box::new(Averager::new()))
            .input("input", InputBinding::new("raw", hour()))
            .property("aggPeriodInterval", "1 month")
            .build()
            .is_ok()
    );
}

#[test]
fn missing_required_property_is_rejected() {
    let algo = Scripted::new(AlgoKind::TimeSlice).property(PropertySpec::required(
        "threshold",
        PropertyKind::Number,
        "trip level",
    ));
    let msg = config_error(
        Computation::builder("trip", Box::new(algo))
            .input("a", InputBinding::new("a", hour()))
            .build(),
    );
    assert!(msg.contains("threshold"));
}

#[test]
fn bad_run_properties_are_rejected() {
    config_error(
        Computation::builder("scale", Box::new(Scaler::new()))
            .input("input", InputBinding::new("raw", hour()))
            .property("timeRound", "1:2:3:4")
            .build(),
    );
    config_error(
        Computation::builder("scale", Box::new(Scaler::new()))
            .input("input", InputBinding::new("raw", IntervalSpec::parse("1 hour").unwrap()))
            .property("multiplier", "lots")
            .build(),
    );
}

#[test]
fn algorithm_init_errors_surface_at_build() {
    config_error(
        Computation::builder("avg", Box::new(Averager::new()))
            .input("input", InputBinding::new("raw", hour()))
            .output("average", OutputBinding::new("daily", day()))
            .property("minSamplesNeeded", "0")
            .build(),
    );
}
