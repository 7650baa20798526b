//! # Linen Forecast
//!
//! Demand forecasting for a linen pickup and laundering operation.
//!
//! ## Features
//!
//! - Day-of-week workload patterns with IQR outlier handling
//! - Per-client pickup predictions (likelihood, weight, time of day)
//! - An ensemble day forecast for up to 14 days with staffing hints
//! - Backtesting of past dates against observed pickups
//! - Confidence multipliers learned from the accuracy history
//!
//! Every computation takes an immutable [`HistoricalDataset`] and an explicit
//! `now`, and returns a fresh value. Nothing is cached between runs.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use linen_forecast::{generate_synthetic_dataset, AccuracyLog, ForecastEngine};
//!
//! let now = Utc.with_ymd_and_hms(2024, 5, 15, 17, 0, 0).unwrap();
//! let dataset = generate_synthetic_dataset(10, 90, now, 42)?;
//!
//! let report = ForecastEngine::new().run(&dataset, &AccuracyLog::new(), now);
//! assert_eq!(report.day_forecasts.len(), 7);
//! for forecast in &report.day_forecasts {
//!     assert!((0.0..=1.0).contains(&forecast.confidence_level));
//! }
//! # Ok::<(), linen_forecast::ForecastError>(())
//! ```

pub mod backtest;
pub mod calendar;
pub mod clients;
pub mod confidence;
pub mod config;
pub mod dataset;
pub mod ensemble;
pub mod error;
pub mod patterns;
pub mod pipeline;
pub mod records;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use crate::backtest::{
    compute_weight_comparisons, ensemble_accuracy_records, AccuracyLabel, BacktestComparator,
    WeightComparison,
};
pub use crate::clients::{compute_client_predictions, ClientBehaviorPredictor, ClientPrediction};
pub use crate::confidence::{
    compute_confidence_adjustments, AccuracyLog, AccuracyRecord, AdaptiveConfidenceLearner,
    ConfidenceAdjustment, ConfidenceAdjustments, ModelKey, ModelName, PredictionType,
};
pub use crate::config::{ForecastConfig, StaffingThresholds};
pub use crate::dataset::{DailyAggregate, HistoricalDataset};
pub use crate::ensemble::{compute_day_forecasts, DayForecast, EnsembleDayForecaster};
pub use crate::error::{ForecastError, Result};
pub use crate::patterns::{
    compute_weekly_patterns, WeeklyPattern, WeeklyPatternAnalyzer, WeeklyPatterns,
};
pub use crate::pipeline::{ForecastEngine, ForecastReport};
pub use crate::records::{ClientId, ClientMeta, InvoiceRecord, LineItem, PickupRecord};
pub use crate::source::{RecordSource, Snapshot, SnapshotSource};
pub use crate::utils::{
    generate_local_snapshot, generate_synthetic_dataset, generate_synthetic_snapshot,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
