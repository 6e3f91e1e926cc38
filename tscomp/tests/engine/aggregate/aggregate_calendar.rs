use chrono::TimeDelta;
use chrono_tz::America::Los_Angeles;
use tscomp::{AlgoKind, Computation, InputBinding, OutputBinding, TriggerBatch};
use tscomp_mock::Averager;

use crate::helpers::{Scripted, at, day, executor, hour, hourly, hourly_from, local, summary, value_at};

fn daily(props: &[(&str, &str)]) -> Computation {
    Computation::builder("daily-mean", Box::new(Averager::new()))
        .input("input", InputBinding::new("hourly", hour()))
        .output("average", OutputBinding::new("daily", day()))
        .properties(props.iter().copied())
        .build()
        .unwrap()
}

#[test]
fn one_trigger_recomputes_the_whole_day_from_the_store() {
    let (exec, store) = executor();
    store.insert("hourly", hourly(at(2024, 1, 1, 23, 0), 24));
    let mut comp = daily(&[]);

    let batch = TriggerBatch::new().added("hourly", at(2024, 1, 1, 5, 0), 6.0);
    let report = exec.run(&mut comp, &batch);
    let s = summary(&report);

    assert_eq!((s.base_times, s.periods, s.slices_executed), (1, 1, 24));
    assert_eq!(value_at(&store, "daily", at(2024, 1, 1, 0, 0)), Some(12.5));
}

#[test]
fn no_aggregate_fill_skips_the_slices() {
    let (exec, store) = executor();
    store.insert("hourly", hourly(at(2024, 1, 1, 23, 0), 24));
    store.insert("daily", [tscomp::Sample::new(at(2024, 1, 1, 0, 0), 99.0)]);
    let mut comp = daily(&[("noAggregateFill", "true")]);

    let batch = TriggerBatch::new().added("hourly", at(2024, 1, 1, 5, 0), 6.0);
    let report = exec.run(&mut comp, &batch);
    let s = summary(&report);

    // The averager sees no values, so the period output goes away.
    assert_eq!((s.periods, s.slices_executed, s.deleted), (1, 0, 1));
    assert!(value_at(&store, "daily", at(2024, 1, 1, 0, 0)).is_none());
}

#[test]
fn local_days_follow_the_aggregate_zone() {
    let (exec, store) = executor();
    let values: Vec<f64> = (1..=48).map(f64::from).collect();
    store.insert("hourly", hourly_from(at(2024, 1, 1, 0, 0), &values));
    let mut comp = daily(&[("aggregateTimeZone", "America/Los_Angeles")]);

    let batch = TriggerBatch::new().added("hourly", at(2024, 1, 1, 12, 0), 13.0);
    exec.run(&mut comp, &batch);

    // 2024-01-01 local spans 08:00Z..08:00Z next day: values 9..=32.
    let begin = local(Los_Angeles, 2024, 1, 1, 0, 0);
    assert_eq!(begin, at(2024, 1, 1, 8, 0));
    assert_eq!(value_at(&store, "daily", begin), Some(20.5));
}

#[test]
fn boundary_sample_closes_then_opens_with_both_bounds_closed() {
    let (exec, store) = executor();
    let values: Vec<f64> = (1..=49).map(f64::from).collect();
    store.insert("hourly", hourly_from(at(2024, 1, 1, 0, 0), &values));
    let mut comp = daily(&[("aggLowerBoundClosed", "true"), ("aggUpperBoundClosed", "true")]);

    let batch = TriggerBatch::new().added("hourly", at(2024, 1, 2, 0, 0), 25.0);
    let report = exec.run(&mut comp, &batch);

    assert_eq!(summary(&report).periods, 2);
    // 1..=25 and 25..=49: the boundary sample counts in both.
    assert_eq!(value_at(&store, "daily", at(2024, 1, 1, 0, 0)), Some(13.0));
    assert_eq!(value_at(&store, "daily", at(2024, 1, 2, 0, 0)), Some(37.0));
}

#[test]
fn boundary_sample_belongs_to_the_period_it_closes() {
    let (exec, store) = executor();
    let values: Vec<f64> = (1..=49).map(f64::from).collect();
    store.insert("hourly", hourly_from(at(2024, 1, 1, 0, 0), &values));
    let mut comp = daily(&[("aggLowerBoundClosed", "false"), ("aggUpperBoundClosed", "true")]);

    let batch = TriggerBatch::new().added("hourly", at(2024, 1, 2, 0, 0), 25.0);
    let report = exec.run(&mut comp, &batch);

    assert_eq!(summary(&report).periods, 1);
    // (Jan 1, Jan 2]: values 2..=25.
    assert_eq!(value_at(&store, "daily", at(2024, 1, 1, 0, 0)), Some(13.5));
    assert!(value_at(&store, "daily", at(2024, 1, 2, 0, 0)).is_none());
}

#[test]
fn triggers_in_one_period_process_it_once() {
    let (exec, _store) = executor();
    let algo = Scripted::new(AlgoKind::Aggregating)
        .outputs(&["out"])
        .after_slices(|ctx| ctx.set_output("out", 1.0));
    let log = algo.log();
    let mut comp = Computation::builder("count", Box::new(algo))
        .input("a", InputBinding::new("a", hour()))
        .output("out", OutputBinding::new("out", day()))
        .property("aggPeriodInterval", "1 day")
        .build()
        .unwrap();
    let t0 = at(2024, 6, 1, 1, 0);
    let batch = TriggerBatch::new()
        .added("a", t0, 1.0)
        .added("a", t0 + TimeDelta::hours(5), 1.0)
        .added("a", t0 + TimeDelta::days(1), 1.0);

    let report = exec.run(&mut comp, &batch);

    assert_eq!(summary(&report).periods, 2);
    let afters = log
        .lock()
        .unwrap()
        .iter()
        .filter(|e| *e == "after_time_slices")
        .count();
    assert_eq!(afters, 2);
}

#[test]
fn too_few_values_delete_the_period_output() {
    let (exec, store) = executor();
    store.insert("daily", [tscomp::Sample::new(at(2024, 1, 1, 0, 0), 99.0)]);
    let mut comp = daily(&[("minSamplesNeeded", "2")]);

    let batch = TriggerBatch::new().added("hourly", at(2024, 1, 1, 5, 0), 6.0);
    let report = exec.run(&mut comp, &batch);

    assert_eq!(summary(&report).deleted, 1);
    assert!(store.series("daily").is_empty());
}
