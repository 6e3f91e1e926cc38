use chrono::TimeDelta;
use tscomp::{Computation, InputBinding, OutputBinding, TriggerBatch};
use tscomp_mock::Scaler;

use crate::helpers::{at, executor, hour, summary, value_at};

fn scaler(props: &[(&str, &str)]) -> Computation {
    Computation::builder("scale", Box::new(Scaler::new()))
        .input("input", InputBinding::new("raw", hour()))
        .output("output", OutputBinding::new("scaled", hour()))
        .properties(props.iter().copied())
        .build()
        .unwrap()
}

#[test]
fn writes_one_output_per_base_time() {
    let (exec, store) = executor();
    let mut comp = scaler(&[("multiplier", "2"), ("offset", "1")]);
    let t0 = at(2024, 5, 1, 0, 0);
    let batch = TriggerBatch::new()
        .added("raw", t0, 1.0)
        .added("raw", t0 + TimeDelta::hours(1), 2.0);

    let report = exec.run(&mut comp, &batch);
    let s = summary(&report);

    assert_eq!((s.base_times, s.slices_executed, s.slices_skipped), (2, 2, 0));
    assert_eq!((s.written, s.deleted, s.periods), (2, 0, 0));
    assert_eq!(report.flushed, 2);
    assert_eq!(value_at(&store, "scaled", t0), Some(3.0));
    assert_eq!(value_at(&store, "scaled", t0 + TimeDelta::hours(1)), Some(5.0));
}

#[test]
fn trigger_times_round_to_the_configured_step() {
    let (exec, store) = executor();
    let mut comp = scaler(&[]);
    let t0 = at(2024, 5, 1, 0, 0);
    let batch = TriggerBatch::new().added("raw", t0 + TimeDelta::seconds(29), 4.0);

    let report = exec.run(&mut comp, &batch);

    assert_eq!(summary(&report).slices_executed, 1);
    assert_eq!(value_at(&store, "scaled", t0), Some(4.0));
}

#[test]
fn input_delta_t_shifts_the_parameter_time() {
    let (exec, store) = executor();
    let mut comp = Computation::builder("shifted", Box::new(Scaler::new()))
        .input("input", InputBinding::new("raw", hour()).delta_t(3600))
        .output("output", OutputBinding::new("scaled", hour()).delta_t(60))
        .build()
        .unwrap();
    let t0 = at(2024, 5, 1, 0, 0);
    let batch = TriggerBatch::new().added("raw", t0 + TimeDelta::hours(1), 7.0);

    exec.run(&mut comp, &batch);

    assert_eq!(value_at(&store, "scaled", t0 + TimeDelta::minutes(1)), Some(7.0));
    assert_eq!(store.series("scaled").len(), 1);
}

#[test]
fn base_times_outside_the_effective_range_are_dropped() {
    let (exec, store) = executor();
    let t0 = at(2024, 5, 1, 0, 0);
    let mut comp = Computation::builder("limited", Box::new(Scaler::new()))
        .input("input", InputBinding::new("raw", hour()))
        .output("output", OutputBinding::new("scaled", hour()))
        .effective_range(Some(t0), Some(t0 + TimeDelta::hours(1)))
        .build()
        .unwrap();
    let batch = TriggerBatch::new()
        .added("raw", t0 - TimeDelta::hours(1), 1.0)
        .added("raw", t0, 2.0)
        .added("raw", t0 + TimeDelta::hours(1), 3.0)
        .added("raw", t0 + TimeDelta::hours(2), 4.0);

    let report = exec.run(&mut comp, &batch);

    assert_eq!(summary(&report).base_times, 2);
    let times: Vec<_> = store.series("scaled").iter().map(|s| s.time()).collect();
    assert_eq!(times, vec![t0, t0 + TimeDelta::hours(1)]);
}

#[test]
fn empty_batch_runs_the_lifecycle_without_output() {
    let (exec, store) = executor();
    let mut comp = scaler(&[]);

    let report = exec.run(&mut comp, &TriggerBatch::new());

    assert_eq!(summary(&report), tscomp::RunSummary::default());
    assert!(store.write_log().is_empty());
}
