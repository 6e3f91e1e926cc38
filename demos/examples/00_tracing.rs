use tscomp::{Computation, InputBinding, IntervalSpec, OutputBinding, TriggerBatch};
use tscomp_demos::common::{demo_executor, print_series};
use tscomp_mock::{Scaler, fixtures::at};
use tracing_subscriber::fmt::format::FmtSpan;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,tscomp=debug
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .try_init();

    let (exec, store) = demo_executor();
    let hour = IntervalSpec::parse("1 hour")?;
    let mut comp = Computation::builder("celsius-to-fahrenheit", Box::new(Scaler::new()))
        .input("input", InputBinding::new("air.temp.c", hour))
        .output("output", OutputBinding::new("air.temp.f", hour))
        .property("multiplier", "1.8")
        .property("offset", "32")
        .build()?;

    let t0 = at(2024, 6, 1, 0, 0);
    let batch = TriggerBatch::new()
        .added("air.temp.c", t0, 21.5)
        .added("air.temp.c", t0 + chrono::TimeDelta::hours(1), 23.0)
        .deleted("air.temp.c", t0 + chrono::TimeDelta::hours(2));

    let report = exec.run(&mut comp, &batch);
    println!("{report}");
    print_series("Fahrenheit", &store.series("air.temp.f"));
    Ok(())
}
