//! Forecast versus actual comparisons and backtest accuracy records

use crate::calendar::{shift_days, start_of_local_day};
use crate::clients::ClientBehaviorPredictor;
use crate::config::ForecastConfig;
use crate::confidence::{AccuracyRecord, ConfidenceAdjustments, ModelName, PredictionType};
use crate::dataset::{DailyAggregate, HistoricalDataset};
use crate::ensemble::DayForecast;
use crate::patterns::{WeeklyPatternAnalyzer, WeeklyPatterns};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

/// Largest absolute percentage difference labelled [`AccuracyLabel::High`]
pub const HIGH_ACCURACY_PCT: f64 = 15.0;
/// Largest absolute percentage difference labelled [`AccuracyLabel::Medium`]
pub const MEDIUM_ACCURACY_PCT: f64 = 30.0;

/// Categorical accuracy of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccuracyLabel {
    High,
    Medium,
    Low,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl AccuracyLabel {
    /// Label for a prediction and an optional observed value
    pub fn classify(predicted: f64, actual: Option<f64>) -> Self {
        let Some(actual) = actual else {
            return AccuracyLabel::NotAvailable;
        };
        if predicted == 0.0 {
            return AccuracyLabel::NotAvailable;
        }
        match percent_difference(predicted, actual) {
            Some(pct) if pct.abs() <= HIGH_ACCURACY_PCT => AccuracyLabel::High,
            Some(pct) if pct.abs() <= MEDIUM_ACCURACY_PCT => AccuracyLabel::Medium,
            _ => AccuracyLabel::Low,
        }
    }
}

impl fmt::Display for AccuracyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccuracyLabel::High => write!(f, "High"),
            AccuracyLabel::Medium => write!(f, "Medium"),
            AccuracyLabel::Low => write!(f, "Low"),
            AccuracyLabel::NotAvailable => write!(f, "N/A"),
        }
    }
}

/// Predicted and observed pickup weight for one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightComparison {
    pub date: NaiveDate,
    pub day: Weekday,
    pub predicted_weight: f64,
    /// Total observed weight, when the dataset has any record on the date
    pub actual_pickup_weight: Option<f64>,
    /// (predicted - actual) / actual, in percent
    pub difference_pct: Option<f64>,
    pub accuracy: AccuracyLabel,
    /// Whether the prediction came from the ensemble rather than the weekday baseline
    pub is_forecast: bool,
}

/// Signed percentage difference of `predicted` from a positive `actual`
fn percent_difference(predicted: f64, actual: f64) -> Option<f64> {
    if actual > 0.0 {
        Some((predicted - actual) / actual * 100.0)
    } else {
        None
    }
}

/// Compares predictions with the observed record for past and future dates
#[derive(Debug, Clone)]
pub struct BacktestComparator<'a> {
    config: &'a ForecastConfig,
    adjustments: &'a ConfidenceAdjustments,
}

impl<'a> BacktestComparator<'a> {
    pub fn new(config: &'a ForecastConfig, adjustments: &'a ConfidenceAdjustments) -> Self {
        Self {
            config,
            adjustments,
        }
    }

    /// One comparison per date from `backtest_days` before today through the forecast horizon
    pub fn compare(
        &self,
        dataset: &HistoricalDataset,
        patterns: &WeeklyPatterns,
        forecasts: &[DayForecast],
        now: DateTime<Utc>,
    ) -> Vec<WeightComparison> {
        let today = dataset.today(now);
        let aggregates = dataset.daily_aggregates();
        let by_date: HashMap<NaiveDate, &DayForecast> =
            forecasts.iter().map(|f| (f.date, f)).collect();

        let horizon = forecasts
            .iter()
            .map(|f| f.days_ahead as i64 + 1)
            .max()
            .unwrap_or(0);

        let comparisons: Vec<WeightComparison> = (-self.config.backtest_days..horizon)
            .map(|offset| {
                let date = shift_days(today, offset);
                let (predicted_weight, is_forecast) = match by_date.get(&date) {
                    Some(forecast) => (forecast.total_predicted_weight, true),
                    None => (patterns.get(date.weekday()).avg_weight, false),
                };
                let actual_pickup_weight = aggregates.get(&date).map(|a| a.weight);
                WeightComparison {
                    date,
                    day: date.weekday(),
                    predicted_weight,
                    actual_pickup_weight,
                    difference_pct: actual_pickup_weight
                        .and_then(|actual| percent_difference(predicted_weight, actual)),
                    accuracy: AccuracyLabel::classify(predicted_weight, actual_pickup_weight),
                    is_forecast,
                }
            })
            .collect();

        debug!(
            "Built {} weight comparisons ({} forecast dates)",
            comparisons.len(),
            comparisons.iter().filter(|c| c.is_forecast).count()
        );
        comparisons
    }

    /// Accuracy records for the past `backtest_days` dates.
    ///
    /// The weekday baseline is scored on weight, entries and client count.
    /// The client model is replayed on records strictly before each date and
    /// scored on the expected weight and number of predicted clients that
    /// actually showed up.
    pub fn accuracy_records(
        &self,
        dataset: &HistoricalDataset,
        patterns: &WeeklyPatterns,
        now: DateTime<Utc>,
    ) -> Vec<AccuracyRecord> {
        let today = dataset.today(now);
        let aggregates = dataset.daily_aggregates();
        let dates: Vec<NaiveDate> = (1..=self.config.backtest_days)
            .rev()
            .map(|days_back| shift_days(today, -days_back))
            .filter(|date| aggregates.contains_key(date))
            .collect();

        let records: Vec<AccuracyRecord> = dates
            .par_iter()
            .flat_map_iter(|&date| {
                let mut records = Vec::new();
                if let Some(aggregate) = aggregates.get(&date) {
                    records.extend(pattern_records(patterns, aggregate));
                    records.extend(self.client_records(dataset, aggregate));
                }
                records
            })
            .collect();

        debug!(
            "Backtested {} dates into {} accuracy records",
            dates.len(),
            records.len()
        );
        records
    }

    fn client_records(
        &self,
        dataset: &HistoricalDataset,
        aggregate: &DailyAggregate,
    ) -> Vec<AccuracyRecord> {
        let date = aggregate.date;
        let prior = dataset.records_before(date);
        // Last instant of the previous local day
        let as_of = start_of_local_day(date, prior.offset()) - Duration::seconds(1);
        let predictor = ClientBehaviorPredictor::new(self.config, self.adjustments);
        let predictions =
            predictor.predict(&prior, date, self.config.client_confidence_threshold, as_of);
        if predictions.is_empty() {
            return Vec::new();
        }

        let mut observed: BTreeMap<&str, f64> = BTreeMap::new();
        for pickup in dataset.pickups() {
            if dataset.pickup_date(pickup) == date {
                *observed.entry(pickup.client_id.as_str()).or_default() += pickup.weight;
            }
        }

        let expected_weight: f64 = predictions
            .iter()
            .map(|p| p.predicted_weight * p.likelihood)
            .sum();
        let expected_clients: f64 = predictions.iter().map(|p| p.likelihood).sum();
        let actual_weight: f64 = predictions
            .iter()
            .filter_map(|p| observed.get(p.client_id.as_str()))
            .sum();
        let actual_clients = predictions
            .iter()
            .filter(|p| observed.contains_key(p.client_id.as_str()))
            .count() as f64;

        let mut records = Vec::new();
        if expected_weight > 0.0 {
            records.push(AccuracyRecord::new(
                date,
                ModelName::ClientBehavior,
                PredictionType::Weight,
                expected_weight,
                actual_weight,
            ));
        }
        if expected_clients > 0.0 {
            records.push(AccuracyRecord::new(
                date,
                ModelName::ClientBehavior,
                PredictionType::ClientActivity,
                expected_clients,
                actual_clients,
            ));
        }
        records
    }
}

/// Weekday baseline scored against one observed date
fn pattern_records(patterns: &WeeklyPatterns, aggregate: &DailyAggregate) -> Vec<AccuracyRecord> {
    let pattern = patterns.get(aggregate.date.weekday());
    [
        (PredictionType::Weight, pattern.avg_weight, aggregate.weight),
        (
            PredictionType::Entries,
            pattern.avg_entries,
            aggregate.entry_count as f64,
        ),
        (
            PredictionType::ClientActivity,
            pattern.avg_client_count,
            aggregate.client_count() as f64,
        ),
    ]
    .into_iter()
    .filter(|(_, predicted, _)| *predicted > 0.0)
    .map(|(prediction, predicted, actual)| {
        AccuracyRecord::new(
            aggregate.date,
            ModelName::WeeklyPattern,
            prediction,
            predicted,
            actual,
        )
    })
    .collect()
}

/// Weight comparisons with the default configuration and no learned adjustment
pub fn compute_weight_comparisons(
    dataset: &HistoricalDataset,
    forecasts: &[DayForecast],
    now: DateTime<Utc>,
) -> Vec<WeightComparison> {
    let config = ForecastConfig::default();
    let adjustments = ConfidenceAdjustments::neutral();
    let patterns = WeeklyPatternAnalyzer::new(&config, &adjustments).analyze(dataset, now);
    BacktestComparator::new(&config, &adjustments).compare(dataset, &patterns, forecasts, now)
}

/// Ensemble weight records for forecast dates observed before `before`.
///
/// Feed these back as history once a forecast horizon has elapsed so the
/// ensemble multiplier learns from its own misses.
pub fn ensemble_accuracy_records(
    comparisons: &[WeightComparison],
    before: NaiveDate,
) -> Vec<AccuracyRecord> {
    comparisons
        .iter()
        .filter(|c| c.is_forecast && c.date < before && c.predicted_weight > 0.0)
        .filter_map(|c| {
            c.actual_pickup_weight.map(|actual| {
                AccuracyRecord::new(
                    c.date,
                    ModelName::Ensemble,
                    PredictionType::Weight,
                    c.predicted_weight,
                    actual,
                )
            })
        })
        .collect()
}
