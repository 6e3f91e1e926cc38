use chrono::TimeDelta;
use tscomp::{
    AlgoKind, Computation, InputBinding, MissingAction, OutputBinding, Sample, TriggerBatch,
};

use crate::helpers::{Scripted, at, executor, hour, summary, value_at};

/// `out = a + b`, with `b` bound under the given missing action.
fn adder(b_missing: MissingAction) -> (Computation, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
    adder_with(b_missing, &[])
}

fn adder_with(
    b_missing: MissingAction,
    props: &[(&str, &str)],
) -> (Computation, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
    let algo = Scripted::new(AlgoKind::TimeSlice)
        .inputs(&["a", "b"])
        .on_slice(|ctx| {
            let sum = ctx.input_f64("a") + ctx.input_f64("b");
            ctx.set_output("out", sum)
        });
    let log = algo.log();
    let comp = Computation::builder("adder", Box::new(algo))
        .input("a", InputBinding::new("a", hour()))
        .input("b", InputBinding::new("b", hour()).missing(b_missing))
        .output("out", OutputBinding::new("sum", hour()))
        .properties(props.iter().copied())
        .build()
        .unwrap();
    (comp, log)
}

fn slices(log: &std::sync::Mutex<Vec<String>>) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|e| e.starts_with("slice"))
        .count()
}

#[test]
fn fail_policy_skips_without_callback_or_output() {
    let (exec, store) = executor();
    let (mut comp, log) = adder(MissingAction::Fail);
    let t0 = at(2024, 2, 1, 6, 0);

    let report = exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));
    let s = summary(&report);

    assert_eq!((s.slices_executed, s.slices_skipped), (0, 1));
    assert_eq!(slices(&log), 0);
    assert!(store.write_log().is_empty());
}

#[test]
fn prev_fills_from_the_store() {
    let (exec, store) = executor();
    store.insert("b", [Sample::new(at(2024, 2, 1, 5, 0), 10.0)]);
    let (mut comp, _) = adder(MissingAction::Prev);
    let t0 = at(2024, 2, 1, 6, 0);

    exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));

    assert_eq!(value_at(&store, "sum", t0), Some(11.0));
}

#[test]
fn oversized_time_limit_means_no_limit() {
    let (exec, store) = executor();
    store.insert("b", [Sample::new(at(2024, 2, 1, 5, 0), 10.0)]);
    let (mut comp, _) = adder_with(
        MissingAction::Prev,
        &[("maxMissingTimeForFill", "99999999999999999")],
    );
    let t0 = at(2024, 2, 1, 6, 0);

    let report = exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));

    assert_eq!(summary(&report).slices_executed, 1);
    assert_eq!(value_at(&store, "sum", t0), Some(11.0));
}

/// Runs the adder with `b` stored at `b_times` and one trigger on `a` at 06:00.
fn fill_at_six(action: MissingAction, props: &[(&str, &str)], b_times: &[u32]) -> Option<f64> {
    let (exec, store) = executor();
    store.insert(
        "b",
        b_times
            .iter()
            .map(|h| Sample::new(at(2024, 2, 1, *h, 0), f64::from(*h))),
    );
    let (mut comp, _) = adder_with(action, props);
    let t0 = at(2024, 2, 1, 6, 0);
    exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));
    value_at(&store, "sum", t0)
}

#[test]
fn prev_gap_just_over_the_value_count_is_not_filled() {
    let limit = [("maxMissingValuesForFill", "2"), ("maxMissingTimeForFill", "86400")];
    assert_eq!(fill_at_six(MissingAction::Prev, &limit, &[4]), Some(5.0));
    assert_eq!(fill_at_six(MissingAction::Prev, &limit, &[3]), None);
}

#[test]
fn prev_gap_just_over_the_time_limit_is_not_filled() {
    let limit = [("maxMissingTimeForFill", "7200")];
    assert_eq!(fill_at_six(MissingAction::Prev, &limit, &[4]), Some(5.0));
    assert_eq!(fill_at_six(MissingAction::Prev, &limit, &[3]), None);
}

#[test]
fn interp_span_just_over_the_interval_limit_is_not_filled() {
    let limit = [("maxInterpIntervals", "2")];
    assert_eq!(fill_at_six(MissingAction::Interp, &limit, &[5, 7]), Some(7.0));
    assert_eq!(fill_at_six(MissingAction::Interp, &limit, &[5, 8]), None);
    let wider = [("maxInterpIntervals", "3")];
    assert_eq!(fill_at_six(MissingAction::Interp, &wider, &[5, 8]), Some(7.0));
}

#[test]
fn interp_span_over_the_value_count_is_not_filled() {
    let limit = [("maxMissingValuesForFill", "2"), ("maxInterpIntervals", "10")];
    assert_eq!(fill_at_six(MissingAction::Interp, &limit, &[5, 7]), Some(7.0));
    assert_eq!(fill_at_six(MissingAction::Interp, &limit, &[5, 8]), None);
}

#[test]
fn interp_uses_both_neighbours() {
    let (exec, store) = executor();
    store.insert(
        "b",
        [
            Sample::new(at(2024, 2, 1, 5, 0), 0.0),
            Sample::new(at(2024, 2, 1, 7, 0), 2.0),
        ],
    );
    let (mut comp, _) = adder(MissingAction::Interp);
    let t0 = at(2024, 2, 1, 6, 0);

    exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));

    assert_eq!(value_at(&store, "sum", t0), Some(2.0));
}

#[test]
fn fill_beyond_the_gap_limit_skips_the_slice() {
    let (exec, store) = executor();
    store.insert("b", [Sample::new(at(2024, 2, 1, 0, 0), 10.0)]);
    let (mut comp, _) = adder(MissingAction::Prev);
    let t0 = at(2024, 2, 1, 6, 0);

    let report = exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));

    assert_eq!(summary(&report).slices_skipped, 1);
    assert!(store.series("sum").is_empty());
}

#[test]
fn ignore_leaves_the_value_missing_for_the_algorithm() {
    let (exec, store) = executor();
    let algo = Scripted::new(AlgoKind::TimeSlice)
        .inputs(&["a", "b"])
        .on_slice(|ctx| {
            let v = if ctx.is_missing("b") { -1.0 } else { ctx.input_f64("b") };
            ctx.set_output("out", v)
        });
    let mut comp = Computation::builder("observer", Box::new(algo))
        .input("a", InputBinding::new("a", hour()))
        .input("b", InputBinding::new("b", hour()))
        .output("out", OutputBinding::new("observed", hour()))
        .build()
        .unwrap();
    let t0 = at(2024, 2, 1, 6, 0);

    exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));

    assert_eq!(value_at(&store, "observed", t0), Some(-1.0));
}

#[test]
fn deleted_required_input_deletes_outputs_and_skips() {
    let (exec, store) = executor();
    let t0 = at(2024, 2, 1, 6, 0);
    store.insert("sum", [Sample::new(t0, 42.0)]);
    let (mut comp, log) = adder(MissingAction::Fail);
    let batch = TriggerBatch::new()
        .added("a", t0, 1.0)
        .deleted("b", t0 + TimeDelta::seconds(5));

    let report = exec.run(&mut comp, &batch);
    let s = summary(&report);

    assert_eq!((s.slices_skipped, s.deleted), (1, 1));
    assert_eq!(slices(&log), 0);
    assert!(store.series("sum").is_empty());
}
