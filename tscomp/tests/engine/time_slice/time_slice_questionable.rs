use tscomp::{Computation, InputBinding, OutputBinding, Sample, SampleFlags, TriggerBatch};
use tscomp_mock::Scaler;

use crate::helpers::{at, executor, hour, summary};

fn run_with_policy(policy: Option<&str>) -> (tscomp::RunSummary, Option<SampleFlags>) {
    let (exec, store) = executor();
    let mut builder = Computation::builder("scale", Box::new(Scaler::new()))
        .input("input", InputBinding::new("raw", hour()))
        .output("output", OutputBinding::new("scaled", hour()));
    if let Some(p) = policy {
        builder = builder.property("ifQuestionable", p);
    }
    let mut comp = builder.build().unwrap();
    let t0 = at(2024, 3, 1, 0, 0);
    let mut batch = TriggerBatch::new();
    batch.push(
        "raw",
        Sample::new(t0, 2.0).with_flags(SampleFlags::DB_ADDED | SampleFlags::QUESTIONABLE),
    );

    let report = exec.run(&mut comp, &batch);
    let flags = store.series("scaled").get(t0).map(Sample::flags);
    (summary(&report), flags)
}

#[test]
fn process_as_normal_is_the_default() {
    let (s, flags) = run_with_policy(None);
    assert_eq!(s.slices_executed, 1);
    assert!(!flags.unwrap().is_questionable());
}

#[test]
fn question_output_flags_what_the_slice_writes() {
    let (s, flags) = run_with_policy(Some("QuestionOutput"));
    assert_eq!(s.slices_executed, 1);
    assert!(flags.unwrap().contains(SampleFlags::QUESTIONABLE));
}

#[test]
fn skip_timeslice_treats_the_input_as_missing() {
    let (s, flags) = run_with_policy(Some("S"));
    assert_eq!((s.slices_executed, s.slices_skipped), (0, 1));
    assert!(flags.is_none());
}
