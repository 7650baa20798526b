use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use linen_forecast::calendar::day_name;
use linen_forecast::{
    generate_local_snapshot, AccuracyLog, ForecastConfig, ForecastEngine, ForecastReport,
    SnapshotSource,
};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Workload forecast report for linen pickups
#[derive(Debug, Parser)]
#[command(name = "forecast_report", version, about)]
struct Args {
    /// JSON snapshot with `pickups`, `invoices` and `clients`
    #[arg(short, long, required_unless_present = "demo")]
    snapshot: Option<PathBuf>,

    /// Use generated data instead of a snapshot
    #[arg(long, conflicts_with = "snapshot")]
    demo: bool,

    /// Clients in the generated dataset
    #[arg(long, default_value_t = 25)]
    demo_clients: usize,

    /// Days of generated history
    #[arg(long, default_value_t = 120)]
    demo_days: usize,

    /// Seed for the generated dataset
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Forecast configuration file (JSON)
    #[arg(short, long, env = "LINEN_FORECAST_CONFIG")]
    config: Option<PathBuf>,

    /// Accuracy history file (JSON array of accuracy records)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Days to forecast, overriding the configuration
    #[arg(short, long)]
    days: Option<usize>,

    /// Reference time (RFC 3339); defaults to the current time
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let now = args.now.unwrap_or_else(Utc::now);

    let mut config = match &args.config {
        Some(path) => ForecastConfig::from_json_file(path)?,
        None => ForecastConfig::default(),
    };
    if let Some(days) = args.days {
        config.forecast_days = days;
    }
    let engine = ForecastEngine::with_config(config)?;

    let offset = engine.config().utc_offset();
    let source = match &args.snapshot {
        Some(path) if !args.demo => SnapshotSource::from_json_file(path, offset)?,
        _ => {
            info!(
                "Generating {} days of demo data for {} clients at UTC{}",
                args.demo_days, args.demo_clients, offset
            );
            let snapshot =
                generate_local_snapshot(args.demo_clients, args.demo_days, now, args.seed, offset)?;
            SnapshotSource::new(snapshot, offset)
        }
    };
    let dataset = engine.load_dataset(&source, now)?;

    let history: AccuracyLog = match &args.history {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => AccuracyLog::new(),
    };

    let report = engine.run(&dataset, &history, now);

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(fs::File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    match args.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        }
        OutputFormat::Text => write_summary(&mut out, &report)?,
    }
    out.flush()?;

    Ok(())
}

fn write_summary(out: &mut dyn Write, report: &ForecastReport) -> io::Result<()> {
    writeln!(out, "Linen Workload Forecast")?;
    writeln!(out, "=======================")?;
    writeln!(
        out,
        "Generated {} (today {}), {} malformed records skipped",
        report.generated_at.format("%Y-%m-%d %H:%M UTC"),
        report.today,
        report.skipped_records
    )?;

    writeln!(out, "\nWeekly patterns")?;
    writeln!(
        out,
        "{:<10} {:>9} {:>8} {:>9} {:>8} {:>5} {:>6}",
        "Day", "Weight", "Entries", "Revenue", "Clients", "Peak", "Conf"
    )?;
    for pattern in report.weekly_patterns.iter() {
        let peak = pattern
            .peak_hour
            .map(|h| format!("{:02}h", h))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:<10} {:>9.1} {:>8.1} {:>9.2} {:>8.1} {:>5} {:>6.2}",
            day_name(pattern.day),
            pattern.avg_weight,
            pattern.avg_entries,
            pattern.avg_revenue,
            pattern.avg_client_count,
            peak,
            pattern.confidence
        )?;
    }

    writeln!(out, "\nDay forecasts")?;
    for forecast in &report.day_forecasts {
        let peaks: Vec<String> = forecast
            .peak_hours
            .iter()
            .map(|h| format!("{:02}:00", h))
            .collect();
        writeln!(
            out,
            "{} {:<9} {:>8.1} lbs {:>6.1} pickups ${:>8.2}  conf {:.2}  peak {}",
            forecast.date,
            day_name(forecast.day),
            forecast.total_predicted_weight,
            forecast.total_predicted_entries,
            forecast.total_predicted_revenue,
            forecast.confidence_level,
            if peaks.is_empty() {
                "-".to_string()
            } else {
                peaks.join(", ")
            }
        )?;
        writeln!(out, "    {}", forecast.staffing_recommendation)?;
        for factor in &forecast.critical_factors {
            writeln!(out, "    - {}", factor)?;
        }
    }

    writeln!(
        out,
        "\nClient predictions for {} ({})",
        report.client_prediction_date,
        report.client_predictions.len()
    )?;
    for prediction in report.client_predictions.iter().take(10) {
        writeln!(
            out,
            "{:<24} {:>5.0}% likely  {:>7.1} lbs at {}  conf {:.2}",
            prediction
                .client_name
                .as_deref()
                .unwrap_or(prediction.client_id.as_str()),
            prediction.likelihood * 100.0,
            prediction.predicted_weight,
            prediction.predicted_time_label(),
            prediction.confidence
        )?;
    }

    writeln!(out, "\nForecast vs actual")?;
    for comparison in &report.weight_comparisons {
        let actual = comparison
            .actual_pickup_weight
            .map(|w| format!("{:.1}", w))
            .unwrap_or_else(|| "-".to_string());
        let difference = comparison
            .difference_pct
            .map(|d| format!("{:+.1}%", d))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{} {} predicted {:>8.1} actual {:>8} {:>8} {}",
            comparison.date,
            if comparison.is_forecast { "F" } else { " " },
            comparison.predicted_weight,
            actual,
            difference,
            comparison.accuracy
        )?;
    }

    writeln!(out, "\nConfidence multipliers")?;
    for adjustment in report.confidence_adjustments.iter() {
        writeln!(
            out,
            "{:<32} x{:.3} ({} records)",
            adjustment.key.to_string(),
            adjustment.multiplier,
            adjustment.record_count
        )?;
    }

    Ok(())
}
