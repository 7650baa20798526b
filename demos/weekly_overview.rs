//! Print the weekly workload profile of a generated dataset

use chrono::Utc;
use linen_ops_workspace::linen_forecast::calendar::day_name;
use linen_ops_workspace::linen_forecast::{
    compute_weekly_patterns, generate_synthetic_dataset, ForecastError,
};

fn main() -> Result<(), ForecastError> {
    let now = Utc::now();
    let dataset = generate_synthetic_dataset(30, 90, now, 7)?;
    let patterns = compute_weekly_patterns(&dataset, now);

    println!("Weekly workload profile");
    println!("=======================");
    for pattern in patterns.iter() {
        println!(
            "{:<10} {:>8.1} lbs  {:>5.1} pickups  confidence {:.2}  outliers {}",
            day_name(pattern.day),
            pattern.avg_weight,
            pattern.avg_entries,
            pattern.confidence,
            pattern.outlier_count
        );
        for hint in &pattern.recommendations {
            println!("    {}", hint);
        }
    }

    Ok(())
}
