//! Confidence-weighted ensemble of day-ahead workload forecasts
//!
//! Three models contribute to each day:
//! - the weekly pattern for the target weekday, with weekend and Monday adjustments
//! - the sum of qualifying client predictions
//! - a first-difference trend over recent same-weekday weeks
//!
//! Their outputs are blended using each model's own confidence as its weight.

use crate::calendar::{day_name, days_between, shift_days, weekday_index};
use crate::clients::{ClientBehaviorPredictor, ClientPrediction};
use crate::config::{ForecastConfig, MAX_FORECAST_DAYS};
use crate::confidence::{ConfidenceAdjustments, ENSEMBLE_KEY};
use crate::dataset::HistoricalDataset;
use crate::patterns::{WeeklyPattern, WeeklyPatterns};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use demand_math::{mean, mean_first_difference, unit_clamp};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

const SUNDAY_FACTOR: f64 = 0.5;
const SATURDAY_FACTOR: f64 = 0.7;
const WEEKEND_MIN_CONFIDENCE: f64 = 0.6;
const MONDAY_BUILDUP_FACTOR: f64 = 1.25;
const MONDAY_MIN_CONFIDENCE: f64 = 0.5;
/// Same-weekday observations required by the trend model
const TREND_MIN_OBSERVATIONS: usize = 4;
/// Weekly buckets required by the trend model
const TREND_MIN_BUCKETS: usize = 3;
/// Confidence drop per day of horizon
const TEMPORAL_DECAY_PER_DAY: f64 = 0.05;
/// Agreement score used when fewer than two models contribute
const NEUTRAL_AGREEMENT: f64 = 0.5;

/// Sub-model of the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleModel {
    Pattern,
    ClientAggregate,
    Trend,
}

impl fmt::Display for EnsembleModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnsembleModel::Pattern => write!(f, "pattern"),
            EnsembleModel::ClientAggregate => write!(f, "client_aggregate"),
            EnsembleModel::Trend => write!(f, "trend"),
        }
    }
}

/// One model's estimate for a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub model: EnsembleModel,
    pub weight: f64,
    pub entries: Option<f64>,
    pub client_count: Option<f64>,
    pub confidence: f64,
}

/// Workload forecast for one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub day: Weekday,
    /// 0 for today
    pub days_ahead: u32,
    pub total_predicted_weight: f64,
    pub total_predicted_entries: f64,
    pub total_predicted_revenue: f64,
    pub predicted_client_count: f64,
    pub confidence_level: f64,
    pub peak_hours: Vec<u32>,
    pub staffing_recommendation: String,
    pub critical_factors: Vec<String>,
    pub models: Vec<ModelOutput>,
}

/// Weekly trend estimate for one weekday
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekdayTrend {
    /// Average change per week, in pounds
    pub trend: f64,
    pub buckets: usize,
    pub observations: usize,
}

/// Trend estimates for every weekday, with bucket boundaries fixed at the
/// start of a run so every target date sees the same buckets
#[derive(Debug, Clone, PartialEq)]
pub struct TrendBuckets {
    trends: [Option<WeekdayTrend>; 7],
}

impl TrendBuckets {
    /// Group same-weekday totals of the trend lookback window into 7-day buckets
    /// counted back from `today`
    pub fn build(dataset: &HistoricalDataset, today: NaiveDate, lookback_days: i64) -> Self {
        let start = shift_days(today, -lookback_days);
        let mut per_day: [BTreeMap<i64, Vec<f64>>; 7] = Default::default();
        let mut observations = [0usize; 7];

        for (date, aggregate) in dataset.daily_aggregates_between(start, today) {
            let index = weekday_index(date.weekday());
            let bucket = days_between(date, today) / 7;
            per_day[index]
                .entry(bucket)
                .or_default()
                .push(aggregate.weight);
            observations[index] += 1;
        }

        let trends = std::array::from_fn(|index| {
            let buckets = &per_day[index];
            if observations[index] < TREND_MIN_OBSERVATIONS || buckets.len() < TREND_MIN_BUCKETS {
                return None;
            }
            // Higher bucket index is further in the past
            let series: Vec<f64> = buckets
                .values()
                .rev()
                .filter_map(|weights| mean(weights).ok())
                .collect();
            mean_first_difference(&series).ok().map(|trend| WeekdayTrend {
                trend,
                buckets: buckets.len(),
                observations: observations[index],
            })
        });

        Self { trends }
    }

    pub fn get(&self, day: Weekday) -> Option<WeekdayTrend> {
        self.trends[weekday_index(day)]
    }
}

/// Produces day forecasts from patterns, client predictions and trends
#[derive(Debug, Clone)]
pub struct EnsembleDayForecaster<'a> {
    config: &'a ForecastConfig,
    adjustments: &'a ConfidenceAdjustments,
}

impl<'a> EnsembleDayForecaster<'a> {
    pub fn new(config: &'a ForecastConfig, adjustments: &'a ConfidenceAdjustments) -> Self {
        Self {
            config,
            adjustments,
        }
    }

    /// Forecast `num_days` dates starting today
    pub fn forecast(
        &self,
        dataset: &HistoricalDataset,
        patterns: &WeeklyPatterns,
        num_days: usize,
        now: DateTime<Utc>,
    ) -> Vec<DayForecast> {
        let horizon = num_days.clamp(1, MAX_FORECAST_DAYS);
        if horizon != num_days {
            warn!(
                "Requested {} forecast days, using {} instead",
                num_days, horizon
            );
        }

        let today = dataset.today(now);
        let trends = TrendBuckets::build(dataset, today, self.config.trend_lookback_days);
        let predictor = ClientBehaviorPredictor::new(self.config, self.adjustments);

        let forecasts: Vec<DayForecast> = (0..horizon as u32)
            .into_par_iter()
            .map(|days_ahead| {
                let target = shift_days(today, days_ahead as i64);
                let predictions = predictor.predict(
                    dataset,
                    target,
                    self.config.client_confidence_threshold,
                    now,
                );
                self.forecast_day(patterns, &predictions, &trends, target, days_ahead)
            })
            .collect();

        debug!("Forecast {} days from {}", forecasts.len(), today);
        forecasts
    }

    /// Forecast a single date from precomputed inputs
    pub fn forecast_day(
        &self,
        patterns: &WeeklyPatterns,
        predictions: &[ClientPrediction],
        trends: &TrendBuckets,
        target: NaiveDate,
        days_ahead: u32,
    ) -> DayForecast {
        let day = target.weekday();
        let pattern = patterns.get(day);
        let mut factors = Vec::new();

        let pattern_output = pattern_model(pattern, &mut factors);
        let client_output = client_model(predictions);
        let trend = trends.get(day);
        let trend_output = trend.map(|t| trend_model(pattern, t));

        let outputs: Vec<ModelOutput> = std::iter::once(pattern_output.clone())
            .chain(client_output)
            .chain(trend_output)
            .collect();
        let contributing: Vec<&ModelOutput> =
            outputs.iter().filter(|o| o.confidence > 0.0).collect();
        let total_confidence: f64 = contributing.iter().map(|o| o.confidence).sum();

        let (weight, entries, client_count) = if total_confidence > 0.0 {
            (
                weighted(&contributing, |o| Some(o.weight)).unwrap_or(pattern_output.weight),
                weighted(&contributing, |o| o.entries)
                    .unwrap_or_else(|| pattern_output.entries.unwrap_or(0.0)),
                weighted(&contributing, |o| o.client_count)
                    .unwrap_or_else(|| pattern_output.client_count.unwrap_or(0.0)),
            )
        } else {
            (
                pattern_output.weight,
                pattern_output.entries.unwrap_or(0.0),
                pattern_output.client_count.unwrap_or(0.0),
            )
        };
        let weight = weight.max(0.0);

        let client_confidence = if predictions.is_empty() {
            0.0
        } else {
            predictions.iter().map(|p| p.confidence).sum::<f64>() / predictions.len() as f64
        };
        let agreement = agreement(&contributing);
        let temporal = (1.0 - TEMPORAL_DECAY_PER_DAY * days_ahead as f64).max(0.0);

        let raw_confidence = if contributing.is_empty() {
            0.0
        } else {
            unit_clamp(
                0.4 * pattern.confidence
                    + 0.3 * client_confidence
                    + 0.2 * agreement
                    + 0.1 * temporal,
            )
        };
        let confidence_level = self.adjustments.apply(ENSEMBLE_KEY, raw_confidence);

        let rate = pattern
            .revenue_per_pound
            .unwrap_or(self.config.default_rate_per_pound);
        let revenue = weight * rate;

        let mut peak_hours: Vec<u32> = pattern.peak_hour.into_iter().collect();
        if let Some(hour) = client_peak_hour(predictions) {
            if !peak_hours.contains(&hour) {
                peak_hours.push(hour);
            }
        }

        if let Some(t) = trend {
            if pattern.avg_weight > 0.0 && t.trend.abs() > 0.1 * pattern.avg_weight {
                let direction = if t.trend > 0.0 { "Upward" } else { "Downward" };
                factors.push(format!("{} trend of {:+.0} lbs per week", direction, t.trend));
            }
        }
        if contributing.len() >= 2 && agreement < 0.5 {
            factors.push("Models disagree on expected volume".to_string());
        }
        if confidence_level < 0.4 {
            factors.push("Low forecast confidence".to_string());
        }
        if pattern.sample_count == 0 {
            factors.push(format!("No {} history", day_name(day)));
        } else if predictions.is_empty() {
            factors.push("No client reached the prediction threshold".to_string());
        }
        if let Some(factor) = dominant_client(predictions) {
            factors.push(factor);
        }

        DayForecast {
            date: target,
            day,
            days_ahead,
            total_predicted_weight: weight,
            total_predicted_entries: entries.max(0.0),
            total_predicted_revenue: revenue.max(0.0),
            predicted_client_count: client_count.max(0.0),
            confidence_level,
            peak_hours,
            staffing_recommendation: self.staffing(weight, confidence_level),
            critical_factors: factors,
            models: outputs,
        }
    }

    fn staffing(&self, weight: f64, confidence: f64) -> String {
        let thresholds = &self.config.staffing;
        if weight <= 0.0 {
            "No pickups expected: no additional staffing".to_string()
        } else if weight > thresholds.high_volume_lbs && confidence > thresholds.min_confidence {
            "High volume: add 2+ staff".to_string()
        } else if weight > thresholds.elevated_volume_lbs {
            "Elevated volume: add 1 staff member".to_string()
        } else if weight < thresholds.light_volume_lbs {
            "Light volume: minimum crew".to_string()
        } else {
            "Standard staffing".to_string()
        }
    }
}

/// Weekly pattern with weekend and Monday adjustments
fn pattern_model(pattern: &WeeklyPattern, factors: &mut Vec<String>) -> ModelOutput {
    let mut factor = 1.0;
    match pattern.day {
        Weekday::Sun if pattern.confidence > WEEKEND_MIN_CONFIDENCE => factor = SUNDAY_FACTOR,
        Weekday::Sat if pattern.confidence > WEEKEND_MIN_CONFIDENCE => factor = SATURDAY_FACTOR,
        Weekday::Mon if pattern.confidence > MONDAY_MIN_CONFIDENCE => {
            factor = MONDAY_BUILDUP_FACTOR
        }
        _ => {}
    }
    if factor < 1.0 {
        factors.push(format!("Weekend adjustment applied (x{:.1})", factor));
    } else if factor > 1.0 {
        factors.push(format!("Monday buildup expected (x{:.2})", factor));
    }

    ModelOutput {
        model: EnsembleModel::Pattern,
        weight: pattern.avg_weight * factor,
        entries: Some(pattern.avg_entries * factor),
        client_count: Some(pattern.avg_client_count * factor),
        confidence: pattern.confidence,
    }
}

/// Expected totals from individual client predictions
fn client_model(predictions: &[ClientPrediction]) -> Option<ModelOutput> {
    if predictions.is_empty() {
        return None;
    }

    let weight = predictions
        .iter()
        .map(|p| p.predicted_weight * p.weight_drift * p.likelihood * p.confidence)
        .sum();
    let expected_entries: f64 = predictions.iter().map(|p| p.likelihood * p.confidence).sum();
    let confidence =
        predictions.iter().map(|p| p.confidence).sum::<f64>() / predictions.len() as f64;

    Some(ModelOutput {
        model: EnsembleModel::ClientAggregate,
        weight,
        entries: Some(expected_entries),
        client_count: Some(expected_entries),
        confidence: unit_clamp(confidence),
    })
}

/// Pattern average projected one week forward along the weekday trend
fn trend_model(pattern: &WeeklyPattern, trend: WeekdayTrend) -> ModelOutput {
    ModelOutput {
        model: EnsembleModel::Trend,
        weight: (pattern.avg_weight + trend.trend).max(0.0),
        entries: None,
        client_count: None,
        confidence: (trend.buckets as f64 / 8.0).min(1.0),
    }
}

/// Confidence-weighted mean of a field over the models that provide it
fn weighted(outputs: &[&ModelOutput], field: impl Fn(&ModelOutput) -> Option<f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut total = 0.0;
    for output in outputs {
        if let Some(value) = field(output) {
            sum += value * output.confidence;
            total += output.confidence;
        }
    }
    if total > 0.0 {
        Some(sum / total)
    } else {
        None
    }
}

/// 1 - normalized variance of the contributing models' weights
fn agreement(outputs: &[&ModelOutput]) -> f64 {
    if outputs.len() < 2 {
        return NEUTRAL_AGREEMENT;
    }
    let weights: Vec<f64> = outputs.iter().map(|o| o.weight).collect();
    let average = mean(&weights).unwrap_or(0.0);
    let variance =
        weights.iter().map(|w| (w - average).powi(2)).sum::<f64>() / weights.len() as f64;
    let normalized = variance / (average * average).max(1.0);
    unit_clamp(1.0 - normalized.min(1.0))
}

/// Hour carrying the most expected client pickups
fn client_peak_hour(predictions: &[ClientPrediction]) -> Option<u32> {
    let mut mass = [0.0f64; 24];
    for prediction in predictions {
        mass[prediction.predicted_time.hour() as usize] +=
            prediction.likelihood * prediction.confidence;
    }
    let mut best: Option<(u32, f64)> = None;
    for (hour, &value) in mass.iter().enumerate() {
        if value <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((hour as u32, value)),
        }
    }
    best.map(|(hour, _)| hour)
}

/// A hint when one client carries a large share of the expected weight
fn dominant_client(predictions: &[ClientPrediction]) -> Option<String> {
    if predictions.len() < 2 {
        return None;
    }
    let contributions: Vec<(&ClientPrediction, f64)> = predictions
        .iter()
        .map(|p| (p, p.predicted_weight * p.likelihood))
        .collect();
    let total: f64 = contributions.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return None;
    }
    let (top, weight) = contributions
        .iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    let share = weight / total;
    if share > 0.4 {
        let name = top
            .client_name
            .clone()
            .unwrap_or_else(|| top.client_id.to_string());
        Some(format!("{} accounts for {:.0}% of expected weight", name, share * 100.0))
    } else {
        None
    }
}

/// Day forecasts with the default configuration and no learned adjustment
pub fn compute_day_forecasts(
    dataset: &HistoricalDataset,
    num_days: usize,
    now: DateTime<Utc>,
) -> Vec<DayForecast> {
    let config = ForecastConfig::default();
    let adjustments = ConfidenceAdjustments::neutral();
    let patterns =
        crate::patterns::WeeklyPatternAnalyzer::new(&config, &adjustments).analyze(dataset, now);
    EnsembleDayForecaster::new(&config, &adjustments).forecast(dataset, &patterns, num_days, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::WeeklyPatternAnalyzer;
    use crate::records::{ClientId, PickupRecord};
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveTime, Offset, TimeZone};
    use rstest::rstest;

    /// Wednesday 2024-03-27, 20:00 UTC
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 27, 20, 0, 0).unwrap()
    }

    fn empty_dataset() -> HistoricalDataset {
        HistoricalDataset::new(Vec::new(), Vec::new(), Vec::new(), Utc.fix())
    }

    /// Three clients with pickups every weekday for 10 weeks
    fn busy_dataset() -> HistoricalDataset {
        let start = Utc.with_ymd_and_hms(2024, 1, 17, 0, 0, 0).unwrap();
        let mut pickups = Vec::new();
        for day in 0..71 {
            let date = start + Duration::days(day);
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }
            pickups.push(PickupRecord::new("hotel", date + Duration::hours(8), 400.0));
            pickups.push(PickupRecord::new("clinic", date + Duration::hours(10), 250.0));
            pickups.push(PickupRecord::new("spa", date + Duration::hours(13), 150.0));
        }
        HistoricalDataset::new(pickups, Vec::new(), Vec::new(), Utc.fix())
    }

    #[test]
    fn test_empty_dataset_has_zero_confidence() {
        let forecasts = compute_day_forecasts(&empty_dataset(), 7, now());
        assert_eq!(forecasts.len(), 7);
        for forecast in &forecasts {
            assert_eq!(forecast.confidence_level, 0.0);
            assert_eq!(forecast.total_predicted_weight, 0.0);
        }
        assert_eq!(forecasts[0].date, NaiveDate::from_ymd_opt(2024, 3, 27).unwrap());
    }

    #[test]
    fn test_horizon_is_clamped() {
        assert_eq!(compute_day_forecasts(&empty_dataset(), 0, now()).len(), 1);
        assert_eq!(compute_day_forecasts(&empty_dataset(), 40, now()).len(), 14);
    }

    #[test]
    fn test_confidence_decays_with_horizon() {
        let dataset = busy_dataset();
        let config = ForecastConfig::default();
        let adjustments = ConfidenceAdjustments::neutral();
        let patterns = WeeklyPatternAnalyzer::new(&config, &adjustments).analyze(&dataset, now());
        let today = dataset.today(now());
        let trends = TrendBuckets::build(&dataset, today, config.trend_lookback_days);
        let predictions = ClientBehaviorPredictor::new(&config, &adjustments).predict(
            &dataset,
            shift_days(today, 7),
            0.6,
            now(),
        );

        let forecaster = EnsembleDayForecaster::new(&config, &adjustments);
        let target = shift_days(today, 7);
        let mut previous = f64::INFINITY;
        for days_ahead in 0..14 {
            let forecast =
                forecaster.forecast_day(&patterns, &predictions, &trends, target, days_ahead);
            assert!(forecast.confidence_level <= previous);
            previous = forecast.confidence_level;
        }
    }

    #[test]
    fn test_busy_weekday_forecast() {
        let forecasts = compute_day_forecasts(&busy_dataset(), 7, now());
        let thursday = forecasts
            .iter()
            .find(|f| f.day == Weekday::Thu)
            .unwrap();
        assert!(thursday.total_predicted_weight > 0.0);
        assert!(thursday.confidence_level > 0.0 && thursday.confidence_level <= 1.0);
        assert!(thursday.peak_hours.contains(&8));
        assert!(thursday
            .models
            .iter()
            .any(|m| m.model == EnsembleModel::ClientAggregate));
        // No invoices, so the weekday rate is zero revenue per pound
        assert_eq!(thursday.total_predicted_revenue, 0.0);

        let saturday = forecasts.iter().find(|f| f.day == Weekday::Sat).unwrap();
        assert_eq!(saturday.total_predicted_weight, 0.0);
        assert_eq!(saturday.confidence_level, 0.0);
    }

    #[test]
    fn test_trend_buckets_need_enough_weeks() {
        let dataset = busy_dataset();
        let today = dataset.today(now());
        let trends = TrendBuckets::build(&dataset, today, 60);
        let wednesday = trends.get(Weekday::Wed).unwrap();
        assert!(wednesday.buckets >= TREND_MIN_BUCKETS);
        assert!(wednesday.trend.abs() < 1e-9);
        assert!(trends.get(Weekday::Sun).is_none());

        let short = TrendBuckets::build(&dataset, today, 14);
        assert!(short.get(Weekday::Wed).is_none());
    }

    #[test]
    fn test_agreement() {
        let output = |weight: f64| ModelOutput {
            model: EnsembleModel::Pattern,
            weight,
            entries: None,
            client_count: None,
            confidence: 1.0,
        };
        let same = [output(100.0), output(100.0)];
        let apart = [output(10.0), output(1000.0)];
        assert_eq!(agreement(&same.iter().collect::<Vec<_>>()), 1.0);
        assert!(agreement(&apart.iter().collect::<Vec<_>>()) < 0.5);
        assert_eq!(agreement(&[&output(5.0)]), NEUTRAL_AGREEMENT);
    }

    #[test]
    fn test_staffing_thresholds() {
        let config = ForecastConfig::default();
        let adjustments = ConfidenceAdjustments::neutral();
        let forecaster = EnsembleDayForecaster::new(&config, &adjustments);
        assert_eq!(forecaster.staffing(1500.0, 0.8), "High volume: add 2+ staff");
        assert_eq!(
            forecaster.staffing(1500.0, 0.3),
            "Elevated volume: add 1 staff member"
        );
        assert_eq!(forecaster.staffing(200.0, 0.9), "Light volume: minimum crew");
        assert_eq!(forecaster.staffing(700.0, 0.9), "Standard staffing");
    }

    fn pattern_for(day: Weekday, avg_weight: f64, confidence: f64) -> WeeklyPattern {
        WeeklyPattern {
            avg_weight,
            avg_entries: 10.0,
            avg_client_count: 4.0,
            raw_confidence: confidence,
            confidence,
            sample_count: 8,
            ..WeeklyPattern::empty(day)
        }
    }

    #[rstest]
    #[case(Weekday::Sun, 0.7, 0.5)]
    #[case(Weekday::Sun, 0.6, 1.0)]
    #[case(Weekday::Sat, 0.7, 0.7)]
    #[case(Weekday::Sat, 0.5, 1.0)]
    #[case(Weekday::Mon, 0.6, 1.25)]
    #[case(Weekday::Mon, 0.5, 1.0)]
    #[case(Weekday::Wed, 0.9, 1.0)]
    fn test_pattern_model_day_factors(
        #[case] day: Weekday,
        #[case] confidence: f64,
        #[case] expected_factor: f64,
    ) {
        let mut factors = Vec::new();
        let output = pattern_model(&pattern_for(day, 1000.0, confidence), &mut factors);

        assert_relative_eq!(output.weight, 1000.0 * expected_factor, epsilon = 1e-9);
        assert_relative_eq!(output.entries.unwrap(), 10.0 * expected_factor, epsilon = 1e-9);
        assert_relative_eq!(output.client_count.unwrap(), 4.0 * expected_factor, epsilon = 1e-9);
        assert_eq!(output.confidence, confidence);
        assert_eq!(factors.is_empty(), expected_factor == 1.0);
    }

    #[test]
    fn test_revenue_falls_back_to_default_rate() {
        let config = ForecastConfig::default();
        let adjustments = ConfidenceAdjustments::neutral();
        let dataset = empty_dataset();
        let patterns = WeeklyPatternAnalyzer::new(&config, &adjustments).analyze(&dataset, now());
        let today = dataset.today(now());
        let trends = TrendBuckets::build(&dataset, today, config.trend_lookback_days);

        // Thursday has no weight history, only one confident client
        let target = shift_days(today, 1);
        let prediction = ClientPrediction {
            client_id: ClientId::new("hotel"),
            client_name: None,
            target_date: target,
            likelihood: 0.8,
            predicted_weight: 500.0,
            predicted_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            raw_confidence: 0.9,
            confidence: 0.9,
            weekly_presence: [false, false, false, false, true, false, false],
            weight_drift: 1.0,
            record_count: 10,
        };

        let forecast = EnsembleDayForecaster::new(&config, &adjustments).forecast_day(
            &patterns,
            &[prediction],
            &trends,
            target,
            1,
        );
        assert_eq!(forecast.day, Weekday::Thu);
        assert!(patterns.get(Weekday::Thu).revenue_per_pound.is_none());
        assert_relative_eq!(forecast.total_predicted_weight, 360.0, epsilon = 1e-9);
        assert_relative_eq!(
            forecast.total_predicted_revenue,
            360.0 * config.default_rate_per_pound,
            epsilon = 1e-9
        );
        assert_eq!(forecast.peak_hours, vec![9]);
    }

    #[test]
    fn test_trend_buckets_measure_weekly_growth() {
        // Wednesdays growing 50 lbs a week, newest on today's date
        let latest = Utc.with_ymd_and_hms(2024, 3, 27, 9, 0, 0).unwrap();
        let pickups = (0..8)
            .map(|i| {
                let weight = 1000.0 - 50.0 * i as f64;
                PickupRecord::new("hotel", latest - Duration::weeks(i), weight)
            })
            .collect();
        let dataset = HistoricalDataset::new(pickups, Vec::new(), Vec::new(), Utc.fix());
        let today = dataset.today(now());

        let trend = TrendBuckets::build(&dataset, today, 60)
            .get(Weekday::Wed)
            .unwrap();
        assert_eq!(trend.buckets, 8);
        assert_eq!(trend.observations, 8);
        assert_relative_eq!(trend.trend, 50.0, epsilon = 1e-9);

        let output = trend_model(&pattern_for(Weekday::Wed, 800.0, 0.9), trend);
        assert_eq!(output.model, EnsembleModel::Trend);
        assert_relative_eq!(output.weight, 850.0, epsilon = 1e-9);
        assert_eq!(output.confidence, 1.0);
        assert!(output.entries.is_none());
    }

    #[test]
    fn test_trend_model_confidence_and_floor() {
        let falling = WeekdayTrend {
            trend: -30.0,
            buckets: 6,
            observations: 6,
        };
        let output = trend_model(&pattern_for(Weekday::Tue, 400.0, 0.8), falling);
        assert_relative_eq!(output.weight, 370.0, epsilon = 1e-9);
        assert_relative_eq!(output.confidence, 0.75);

        let output = trend_model(&pattern_for(Weekday::Tue, 10.0, 0.8), falling);
        assert_eq!(output.weight, 0.0);
    }
}
