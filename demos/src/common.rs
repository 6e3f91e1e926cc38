use chrono::{DateTime, TimeDelta, Utc};
use tscomp::{Executor, Sample, TimeSeries};
use tscomp_mock::{MemoryStore, StoreController};

/// An executor over a fresh in-memory store, plus the handle used to seed
/// and inspect it.
#[must_use]
pub fn demo_executor() -> (Executor, StoreController) {
    let (store, controller) = MemoryStore::new_with_controller("demo");
    (Executor::new(store), controller)
}

/// A day of hourly readings starting at `start`, following a simple diurnal
/// curve.
#[must_use]
pub fn diurnal(start: DateTime<Utc>, days: i64) -> Vec<Sample> {
    (0..days * 24)
        .map(|h| {
            let hour_of_day = (h % 24) as f64;
            let v = 100.0 + 20.0 * (hour_of_day / 24.0 * std::f64::consts::TAU).sin();
            Sample::new(start + TimeDelta::hours(h), (v * 10.0).round() / 10.0)
        })
        .collect()
}

/// Prints a series as a two-column table.
pub fn print_series(title: &str, series: &TimeSeries) {
    println!("\n## {title}");
    println!("{:<22} | {:>10}", "Time (UTC)", "Value");
    println!("{:-<23}|{:-<12}", "", "");
    for s in series.iter() {
        let value = s.value().as_f64().map_or_else(|_| s.value().as_text(), |v| format!("{v:.3}"));
        println!("{:<22} | {:>10}", s.time().format("%Y-%m-%d %H:%M"), value);
    }
}
