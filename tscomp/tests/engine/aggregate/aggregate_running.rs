use chrono::TimeDelta;
use tscomp::{Computation, InputBinding, OutputBinding, TriggerBatch};
use tscomp_mock::Averager;

use crate::helpers::{at, executor, hour, summary, value_at};

fn running_daily() -> Computation {
    Computation::builder("day-trailing", Box::new(Averager::running()))
        .input("input", InputBinding::new("hourly", hour()))
        .output("average", OutputBinding::new("trailing", hour()))
        .property("aggPeriodInterval", "1 day")
        .build()
        .unwrap()
}

#[test]
fn every_base_time_ends_a_window_and_the_window_keeps_moving() {
    let (exec, store) = executor();
    let mut comp = running_daily();
    let first = at(2024, 1, 1, 0, 0);
    let last = first + TimeDelta::hours(23);
    let batch = (1..=24).fold(TriggerBatch::new(), |b, i| {
        b.added("hourly", first + TimeDelta::hours(i - 1), i as f64)
    });

    let report = exec.run(&mut comp, &batch);
    let s = summary(&report);

    // 24 triggered windows plus one window per hour until the last value
    // leaves the window.
    assert_eq!(s.periods, 48);
    assert_eq!(value_at(&store, "trailing", first), Some(1.0));
    assert_eq!(value_at(&store, "trailing", last), Some(12.5));
    assert_eq!(value_at(&store, "trailing", last + TimeDelta::hours(1)), Some(13.0));
    assert_eq!(value_at(&store, "trailing", last + TimeDelta::hours(23)), Some(24.0));
    assert!(value_at(&store, "trailing", last + TimeDelta::hours(24)).is_none());
}

#[test]
fn window_reads_earlier_values_from_the_store() {
    let (exec, store) = executor();
    let first = at(2024, 1, 1, 0, 0);
    let history: Vec<_> = (0..23)
        .map(|i| tscomp::Sample::new(first + TimeDelta::hours(i), 1.0))
        .collect();
    store.insert("hourly", history);
    let mut comp = running_daily();

    let t = first + TimeDelta::hours(23);
    let report = exec.run(&mut comp, &TriggerBatch::new().added("hourly", t, 25.0));

    assert!(summary(&report).periods >= 1);
    // (t - 1 day, t]: 23 stored ones plus the trigger.
    assert_eq!(value_at(&store, "trailing", t), Some(2.0));
}
