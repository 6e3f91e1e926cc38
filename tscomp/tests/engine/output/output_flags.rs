use std::sync::{Arc, Mutex};

use chrono::TimeDelta;
use tscomp::{AlgoKind, Computation, InputBinding, OutputBinding, Sample, SampleFlags, TriggerBatch};

use crate::helpers::{Scripted, at, executor, hour, summary, value_at};

fn writer(value: f64) -> Computation {
    let algo = Scripted::new(AlgoKind::TimeSlice).on_slice(move |ctx| ctx.set_output("out", value));
    Computation::builder("writer", Box::new(algo))
        .input("a", InputBinding::new("a", hour()))
        .output("out", OutputBinding::new("out", hour()))
        .build()
        .unwrap()
}

fn stored_flags(value: f64) -> SampleFlags {
    let (exec, store) = executor();
    let t0 = at(2024, 4, 1, 0, 0);
    store.insert(
        "out",
        [Sample::new(t0, 5.0).with_flags(SampleFlags::REJECTED)],
    );
    let mut comp = writer(value);

    exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));

    store.series("out").get(t0).unwrap().flags()
}

#[test]
fn rewriting_the_same_value_keeps_its_flags() {
    assert!(stored_flags(5.0 + 1e-8).contains(SampleFlags::REJECTED));
}

#[test]
fn a_changed_value_starts_with_clean_flags() {
    assert!(!stored_flags(5.1).contains(SampleFlags::REJECTED));
}

#[test]
fn flag_bits_apply_to_the_value_just_written() {
    let (exec, store) = executor();
    let algo = Scripted::new(AlgoKind::TimeSlice).on_slice(|ctx| {
        ctx.set_output("out", 3.0)?;
        assert!(ctx.set_flag_bits("out", SampleFlags::QUESTIONABLE | SampleFlags::TO_DELETE));
        Ok(())
    });
    let mut comp = Computation::builder("flagger", Box::new(algo))
        .input("a", InputBinding::new("a", hour()))
        .output("out", OutputBinding::new("out", hour()))
        .build()
        .unwrap();
    let t0 = at(2024, 4, 1, 0, 0);

    let report = exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));

    // TO_DELETE is an intent bit and is not settable through flag edits.
    assert_eq!(summary(&report).written, 1);
    let sample = store.series("out").get(t0).cloned().unwrap();
    assert!(sample.flags().is_questionable());
}

#[test]
fn input_flag_edits_are_written_back_once() {
    let (exec, store) = executor();
    let results = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&results);
    let algo = Scripted::new(AlgoKind::TimeSlice).on_slice(move |ctx| {
        let mut r = seen.lock().unwrap();
        r.push(ctx.set_input_flag_bits("a", SampleFlags::REJECTED, SampleFlags::empty()));
        r.push(ctx.set_input_flag_bits("a", SampleFlags::REJECTED, SampleFlags::empty()));
        Ok(())
    });
    let mut comp = Computation::builder("screen", Box::new(algo))
        .input("a", InputBinding::new("a", hour()))
        .output("out", OutputBinding::new("out", hour()))
        .build()
        .unwrap();
    let t0 = at(2024, 4, 1, 0, 0);

    let report = exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));

    assert_eq!(*results.lock().unwrap(), vec![true, false]);
    assert_eq!(summary(&report).written, 1);
    let sample = store.series("a").get(t0).cloned().unwrap();
    assert_eq!(sample.value().as_f64().unwrap(), 1.0);
    assert_eq!(sample.flags(), SampleFlags::REJECTED);
}

#[test]
fn writes_to_an_unbound_output_warn_and_are_dropped() {
    let (exec, store) = executor();
    let algo = Scripted::new(AlgoKind::TimeSlice)
        .outputs(&["out", "extra"])
        .on_slice(|ctx| {
            ctx.set_output("out", 1.0)?;
            ctx.set_output("extra", 2.0)
        });
    let mut comp = Computation::builder("partial", Box::new(algo))
        .input("a", InputBinding::new("a", hour()))
        .output("out", OutputBinding::new("out", hour()))
        .build()
        .unwrap();

    let report = exec.run(&mut comp, &TriggerBatch::new().added("a", at(2024, 4, 1, 0, 0), 1.0));

    assert_eq!(summary(&report).written, 1);
    assert!(!report.warnings.is_empty());
    assert_eq!(store.write_log().len(), 1);
}

#[test]
fn protected_values_survive_a_new_write() {
    let (exec, store) = executor();
    let t0 = at(2024, 4, 1, 0, 0);
    store.insert("out", [Sample::new(t0, 5.0).with_flags(SampleFlags::NO_OVERWRITE)]);
    let mut comp = writer(7.0);

    let report = exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));

    assert_eq!(summary(&report).written, 0);
    assert!(store.write_log().is_empty());
    assert_eq!(value_at(&store, "out", t0), Some(5.0));
}

#[test]
fn a_write_near_a_stored_value_replaces_it() {
    let (exec, store) = executor();
    let t0 = at(2024, 4, 1, 0, 0);
    let nearby = t0 + TimeDelta::seconds(4);
    store.insert("out", [Sample::new(nearby, 5.0)]);
    let mut comp = writer(7.0);

    exec.run(&mut comp, &TriggerBatch::new().added("a", t0, 1.0));

    let out = store.series("out");
    assert_eq!(out.len(), 1);
    assert_eq!(value_at(&store, "out", nearby), Some(7.0));
}

#[test]
fn outputs_convert_to_the_declared_kind() {
    let (exec, store) = executor();
    let algo = Scripted::new(AlgoKind::TimeSlice).on_slice(|ctx| {
        let text = if ctx.input_f64("a") > 1.0 { "high" } else { "12.5" };
        ctx.set_output("out", text)
    });
    let mut comp = Computation::builder("labeller", Box::new(algo))
        .input("a", InputBinding::new("a", hour()))
        .output("out", OutputBinding::new("out", hour()))
        .build()
        .unwrap();
    let t0 = at(2024, 4, 1, 0, 0);
    let t1 = at(2024, 4, 1, 1, 0);
    let batch = TriggerBatch::new().added("a", t0, 1.0).added("a", t1, 2.0);

    let report = exec.run(&mut comp, &batch);
    let s = summary(&report);

    // "high" is not a number, so its slice is skipped with a warning.
    assert_eq!((s.slices_executed, s.slices_skipped), (1, 1));
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(value_at(&store, "out", t0), Some(12.5));
    assert!(value_at(&store, "out", t1).is_none());
}
