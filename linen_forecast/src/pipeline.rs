//! End-to-end forecasting run

use crate::backtest::{BacktestComparator, WeightComparison};
use crate::calendar::shift_days;
use crate::clients::{ClientBehaviorPredictor, ClientPrediction};
use crate::config::ForecastConfig;
use crate::confidence::{
    AccuracyLog, AccuracyRecord, AdaptiveConfidenceLearner, ConfidenceAdjustments,
};
use crate::dataset::HistoricalDataset;
use crate::ensemble::{DayForecast, EnsembleDayForecaster};
use crate::error::Result;
use crate::patterns::{WeeklyPatternAnalyzer, WeeklyPatterns};
use crate::source::RecordSource;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Everything one forecasting run derives from a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub generated_at: DateTime<Utc>,
    pub today: NaiveDate,
    /// Raw records dropped during ingestion
    pub skipped_records: usize,
    pub weekly_patterns: WeeklyPatterns,
    /// Date the client predictions are for (tomorrow)
    pub client_prediction_date: NaiveDate,
    pub client_predictions: Vec<ClientPrediction>,
    pub day_forecasts: Vec<DayForecast>,
    pub weight_comparisons: Vec<WeightComparison>,
    /// Accuracy records produced by this run's backtest
    pub backtest_records: Vec<AccuracyRecord>,
    pub confidence_adjustments: ConfidenceAdjustments,
}

/// Forecasting pipeline with a fixed configuration.
///
/// The component methods apply the engine's current adjustments. [`run`](Self::run)
/// performs the whole backtest and recalibration cycle instead.
#[derive(Debug, Clone, Default)]
pub struct ForecastEngine {
    config: ForecastConfig,
    adjustments: ConfidenceAdjustments,
}

impl ForecastEngine {
    /// Engine with the default configuration and no adjustments
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with a validated configuration
    pub fn with_config(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            adjustments: ConfidenceAdjustments::neutral(),
        })
    }

    /// Replace the confidence adjustments used by the component methods
    pub fn with_adjustments(mut self, adjustments: ConfidenceAdjustments) -> Self {
        self.adjustments = adjustments;
        self
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn adjustments(&self) -> &ConfidenceAdjustments {
        &self.adjustments
    }

    /// Recompute the adjustments from an accuracy history
    pub fn learn(&mut self, records: &[AccuracyRecord]) -> &ConfidenceAdjustments {
        self.adjustments = AdaptiveConfidenceLearner::new().learn(records);
        &self.adjustments
    }

    /// Load the lookback window this engine needs from a record source
    pub fn load_dataset<S: RecordSource + ?Sized>(
        &self,
        source: &S,
        now: DateTime<Utc>,
    ) -> Result<HistoricalDataset> {
        HistoricalDataset::load(source, now, &self.config)
    }

    pub fn weekly_patterns(
        &self,
        dataset: &HistoricalDataset,
        now: DateTime<Utc>,
    ) -> WeeklyPatterns {
        WeeklyPatternAnalyzer::new(&self.config, &self.adjustments).analyze(dataset, now)
    }

    pub fn client_predictions(
        &self,
        dataset: &HistoricalDataset,
        target: NaiveDate,
        confidence_threshold: f64,
        now: DateTime<Utc>,
    ) -> Vec<ClientPrediction> {
        ClientBehaviorPredictor::new(&self.config, &self.adjustments).predict(
            dataset,
            target,
            confidence_threshold,
            now,
        )
    }

    pub fn day_forecasts(
        &self,
        dataset: &HistoricalDataset,
        num_days: usize,
        now: DateTime<Utc>,
    ) -> Vec<DayForecast> {
        let patterns = self.weekly_patterns(dataset, now);
        EnsembleDayForecaster::new(&self.config, &self.adjustments)
            .forecast(dataset, &patterns, num_days, now)
    }

    pub fn weight_comparisons(
        &self,
        dataset: &HistoricalDataset,
        forecasts: &[DayForecast],
        now: DateTime<Utc>,
    ) -> Vec<WeightComparison> {
        let patterns = self.weekly_patterns(dataset, now);
        BacktestComparator::new(&self.config, &self.adjustments)
            .compare(dataset, &patterns, forecasts, now)
    }

    /// Score the unadjusted models over the backtest window
    pub fn backtest(&self, dataset: &HistoricalDataset, now: DateTime<Utc>) -> Vec<AccuracyRecord> {
        let neutral = ConfidenceAdjustments::neutral();
        let patterns = WeeklyPatternAnalyzer::new(&self.config, &neutral).analyze(dataset, now);
        BacktestComparator::new(&self.config, &neutral).accuracy_records(dataset, &patterns, now)
    }

    /// Run the full cycle: backtest, learn multipliers from `history` plus the
    /// backtest, then produce adjusted patterns, predictions and forecasts.
    pub fn run(
        &self,
        dataset: &HistoricalDataset,
        history: &AccuracyLog,
        now: DateTime<Utc>,
    ) -> ForecastReport {
        let today = dataset.today(now);
        info!(
            "Starting forecast run for {} with {} pickups and {} prior accuracy records",
            today,
            dataset.pickups().len(),
            history.len()
        );

        let backtest_records = self.backtest(dataset, now);
        let mut log = history.clone();
        log.extend(backtest_records.iter().cloned());
        let adjustments = AdaptiveConfidenceLearner::new().learn(log.records());
        debug!(
            "Learned {} confidence adjustments from {} records",
            adjustments.len(),
            log.len()
        );

        let calibrated = Self {
            config: self.config.clone(),
            adjustments,
        };
        let weekly_patterns = calibrated.weekly_patterns(dataset, now);

        let client_prediction_date = shift_days(today, 1);
        let client_predictions = calibrated.client_predictions(
            dataset,
            client_prediction_date,
            self.config.client_confidence_threshold,
            now,
        );

        let day_forecasts = EnsembleDayForecaster::new(&calibrated.config, &calibrated.adjustments)
            .forecast(dataset, &weekly_patterns, self.config.forecast_days, now);
        let weight_comparisons =
            BacktestComparator::new(&calibrated.config, &calibrated.adjustments)
                .compare(dataset, &weekly_patterns, &day_forecasts, now);

        info!(
            "Forecast run complete: {} days forecast, {} client predictions, {} comparisons",
            day_forecasts.len(),
            client_predictions.len(),
            weight_comparisons.len()
        );

        ForecastReport {
            generated_at: now,
            today,
            skipped_records: dataset.skipped_records(),
            weekly_patterns,
            client_prediction_date,
            client_predictions,
            day_forecasts,
            weight_comparisons,
            backtest_records,
            confidence_adjustments: calibrated.adjustments,
        }
    }
}
