use tscomp::{AlgoKind, Computation, InputBinding, OutputBinding, Sample, TriggerBatch};
use tscomp_mock::Scaler;

use crate::helpers::{Scripted, at, deletes, executor, hour, summary};

#[test]
fn deleted_input_deletes_the_sole_output() {
    let (exec, store) = executor();
    let t0 = at(2024, 7, 1, 0, 0);
    store.insert("scaled", [Sample::new(t0, 8.0)]);
    let mut comp = Computation::builder("scale", Box::new(Scaler::new()))
        .input("input", InputBinding::new("raw", hour()))
        .output("output", OutputBinding::new("scaled", hour()))
        .build()
        .unwrap();

    let report = exec.run(&mut comp, &TriggerBatch::new().deleted("raw", t0));
    let s = summary(&report);

    // The input defaults to Ignore, so the slice runs, sees a missing value
    // and writes nothing; the auto-delete rule removes the stale output.
    assert_eq!((s.slices_executed, s.deleted), (1, 1));
    assert_eq!(deletes(&store, "scaled"), 1);
    assert!(store.series("scaled").is_empty());
}

#[test]
fn no_auto_delete_with_several_declared_outputs() {
    let (exec, store) = executor();
    let t0 = at(2024, 7, 1, 0, 0);
    store.insert("x", [Sample::new(t0, 8.0)]);
    let algo = Scripted::new(AlgoKind::TimeSlice).outputs(&["x", "y"]);
    let mut comp = Computation::builder("pair", Box::new(algo))
        .input("a", InputBinding::new("a", hour()))
        .output("x", OutputBinding::new("x", hour()))
        .build()
        .unwrap();

    let report = exec.run(&mut comp, &TriggerBatch::new().deleted("a", t0));

    assert_eq!(summary(&report).deleted, 0);
    assert_eq!(deletes(&store, "x"), 0);
    assert_eq!(store.series("x").len(), 1);
}

#[test]
fn an_explicit_write_suppresses_auto_delete() {
    let (exec, store) = executor();
    let t0 = at(2024, 7, 1, 0, 0);
    let algo = Scripted::new(AlgoKind::TimeSlice).on_slice(|ctx| ctx.set_output("out", 0.0));
    let mut comp = Computation::builder("zero", Box::new(algo))
        .input("a", InputBinding::new("a", hour()))
        .output("out", OutputBinding::new("out", hour()))
        .build()
        .unwrap();

    let report = exec.run(&mut comp, &TriggerBatch::new().deleted("a", t0));

    assert_eq!((summary(&report).written, summary(&report).deleted), (1, 0));
    assert_eq!(deletes(&store, "out"), 0);
}
