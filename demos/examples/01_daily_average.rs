use tscomp::{Computation, InputBinding, IntervalSpec, OutputBinding, TriggerBatch};
use tscomp_demos::common::{demo_executor, diurnal, print_series};
use tscomp_mock::{Averager, fixtures::at};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (exec, store) = demo_executor();
    let start = at(2024, 3, 9, 8, 0);
    store.insert("flow.hourly", diurnal(start, 3));

    // Local days in Los Angeles; 2024-03-10 is only 23 hours long.
    let mut comp = Computation::builder("flow-daily-mean", Box::new(Averager::new()))
        .input("input", InputBinding::new("flow.hourly", IntervalSpec::parse("1 hour")?))
        .output("average", OutputBinding::new("flow.daily", IntervalSpec::parse("1 day")?))
        .property("aggregateTimeZone", "America/Los_Angeles")
        .property("minSamplesNeeded", "20")
        .build()?;

    // A single corrected reading on each day triggers a full recompute of it.
    let batch = TriggerBatch::new()
        .added("flow.hourly", at(2024, 3, 9, 20, 0), 95.0)
        .added("flow.hourly", at(2024, 3, 10, 20, 0), 97.5)
        .added("flow.hourly", at(2024, 3, 11, 20, 0), 101.0);

    let report = exec.run(&mut comp, &batch);
    println!("{report}");
    print_series("Daily mean (local midnight, in UTC)", &store.series("flow.daily"));
    Ok(())
}
