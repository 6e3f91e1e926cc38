use chrono::TimeDelta;
use tscomp::{Computation, InputBinding, IntervalSpec, MissingAction, OutputBinding, TriggerBatch};
use tscomp_demos::common::{demo_executor, print_series};
use tscomp_mock::{Averager, fixtures::at};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (exec, store) = demo_executor();
    let hour = IntervalSpec::parse("1 hour")?;
    let mut comp = Computation::builder("stage-6h-trailing", Box::new(Averager::running()))
        .input(
            "input",
            InputBinding::new("stage.hourly", hour).missing(MissingAction::Interp),
        )
        .output("average", OutputBinding::new("stage.6h", hour))
        .property("aggPeriodInterval", "6 hours")
        .build()?;

    let t0 = at(2024, 11, 5, 0, 0);
    let readings = [3.2, 3.4, 3.9, 4.6, 5.1, 4.8, 4.2, 3.7];
    let batch = readings
        .iter()
        .zip(0..)
        .fold(TriggerBatch::new(), |b, (v, h)| {
            b.added("stage.hourly", t0 + TimeDelta::hours(h), *v)
        });

    let report = exec.run(&mut comp, &batch);
    println!("{report}");
    print_series("Six-hour trailing mean", &store.series("stage.6h"));
    Ok(())
}
