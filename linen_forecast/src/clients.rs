//! Per-client pickup predictions for a target date

use crate::calendar::{days_between, local_minute_of_day, month_key, shift_days, weekday_index};
use crate::config::ForecastConfig;
use crate::confidence::{ConfidenceAdjustments, CLIENT_BEHAVIOR_KEY};
use crate::dataset::HistoricalDataset;
use crate::records::{ClientId, PickupRecord};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use demand_math::{
    exponentially_weighted_average, mean, median, population_std_dev, recency_weight, safe_ratio,
    unit_clamp, LinearRegression,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Per-step decay for the recency-weighted weight average
const WEIGHT_DECAY: f64 = 0.9;
/// Scale, in days, of the recency factor on likelihood
const RECENCY_SCALE_DAYS: f64 = 14.0;
/// Most recent same-weekday records used for the weight trend
const TREND_WINDOW: usize = 8;
/// Share of the per-week slope added to the weighted average
const TREND_SHARE: f64 = 0.3;
/// Predicted time when no same-weekday history exists (09:00)
const DEFAULT_MINUTE_OF_DAY: u32 = 9 * 60;
const RECENT_DAYS: i64 = 30;

/// Expected behaviour of one client on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientPrediction {
    pub client_id: ClientId,
    pub client_name: Option<String>,
    pub target_date: NaiveDate,
    /// Probability-like score that the client has a pickup on the target date
    pub likelihood: f64,
    /// Expected weight in pounds if the pickup happens
    pub predicted_weight: f64,
    /// Expected local pickup time
    pub predicted_time: NaiveTime,
    pub raw_confidence: f64,
    pub confidence: f64,
    /// Whether the client has ever had a pickup on each weekday, Sunday first
    pub weekly_presence: [bool; 7],
    /// Ratio of the last-30-day average weight to the all-time average, clamped to [0.5, 1.5]
    pub weight_drift: f64,
    pub record_count: usize,
}

impl ClientPrediction {
    /// Predicted time as `hh:mm`
    pub fn predicted_time_label(&self) -> String {
        self.predicted_time.format("%H:%M").to_string()
    }
}

/// A pickup with its local calendar fields resolved
#[derive(Debug, Clone, Copy)]
struct LocalPickup {
    date: NaiveDate,
    minute_of_day: u32,
    weight: f64,
}

/// Predicts which clients will need a pickup on a given date
#[derive(Debug, Clone)]
pub struct ClientBehaviorPredictor<'a> {
    config: &'a ForecastConfig,
    adjustments: &'a ConfidenceAdjustments,
}

impl<'a> ClientBehaviorPredictor<'a> {
    pub fn new(config: &'a ForecastConfig, adjustments: &'a ConfidenceAdjustments) -> Self {
        Self {
            config,
            adjustments,
        }
    }

    /// Predictions for `target` whose confidence reaches `confidence_threshold`,
    /// ordered by confidence (highest first)
    pub fn predict(
        &self,
        dataset: &HistoricalDataset,
        target: NaiveDate,
        confidence_threshold: f64,
        now: DateTime<Utc>,
    ) -> Vec<ClientPrediction> {
        let today = dataset.today(now);
        let start = shift_days(today, -self.config.pattern_lookback_days);
        let offset = dataset.offset();

        let groups: Vec<(ClientId, Vec<LocalPickup>)> = dataset
            .pickups_by_client()
            .into_iter()
            .map(|(client_id, records)| {
                let local: Vec<LocalPickup> = records
                    .into_iter()
                    .map(|p: &PickupRecord| LocalPickup {
                        date: dataset.pickup_date(p),
                        minute_of_day: local_minute_of_day(p.timestamp, offset),
                        weight: p.weight,
                    })
                    .filter(|p| p.date >= start && p.date <= today)
                    .collect();
                (client_id, local)
            })
            .collect();

        let threshold = unit_clamp(confidence_threshold);
        let mut predictions: Vec<ClientPrediction> = groups
            .par_iter()
            .filter_map(|(client_id, history)| {
                self.predict_client(client_id, history, target, today)
            })
            .filter(|prediction| prediction.confidence >= threshold)
            .map(|mut prediction| {
                prediction.client_name = dataset
                    .client_name(&prediction.client_id)
                    .map(str::to_string);
                prediction
            })
            .collect();

        predictions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.client_id.cmp(&b.client_id))
        });

        debug!(
            "Predicted {} of {} clients for {}",
            predictions.len(),
            groups.len(),
            target
        );
        predictions
    }

    fn predict_client(
        &self,
        client_id: &ClientId,
        history: &[LocalPickup],
        target: NaiveDate,
        today: NaiveDate,
    ) -> Option<ClientPrediction> {
        let record_count = history.len();
        if record_count < self.config.min_client_records {
            return None;
        }
        let first = history.first()?;
        let last = history.last()?;

        let mut weekly_presence = [false; 7];
        for pickup in history {
            weekly_presence[weekday_index(pickup.date.weekday())] = true;
        }

        let target_day = target.weekday();
        let same_day: Vec<&LocalPickup> = history
            .iter()
            .filter(|p| p.date.weekday() == target_day)
            .collect();

        let elapsed_weeks = (days_between(first.date, today) as f64 / 7.0).max(1.0);
        let base_likelihood = same_day.len() as f64 / elapsed_weeks;

        let days_since_last = days_between(last.date, today).max(0) as f64;
        let recency_factor = recency_weight(days_since_last, RECENCY_SCALE_DAYS);

        let consistency_factor = consistency(&same_day);
        let seasonal_adjustment = seasonal_adjustment(history, target);

        let likelihood = unit_clamp(
            base_likelihood * recency_factor * consistency_factor * seasonal_adjustment,
        );
        if likelihood < self.config.min_client_likelihood {
            return None;
        }

        let all_weights: Vec<f64> = history.iter().map(|p| p.weight).collect();
        let same_weights: Vec<f64> = same_day.iter().map(|p| p.weight).collect();
        let overall_average = mean(&all_weights).unwrap_or(0.0);

        let predicted_weight = if same_weights.is_empty() {
            overall_average * seasonal_adjustment
        } else {
            weighted_weight(&same_weights)
        }
        .max(0.0);

        let minutes: Vec<f64> = same_day.iter().map(|p| p.minute_of_day as f64).collect();
        let predicted_minute = median(&minutes)
            .map(|m| m.round() as u32)
            .unwrap_or(DEFAULT_MINUTE_OF_DAY);
        let predicted_time = minute_to_time(predicted_minute);

        let recent: Vec<f64> = history
            .iter()
            .filter(|p| days_between(p.date, today) <= RECENT_DAYS)
            .map(|p| p.weight)
            .collect();
        let weight_drift = match mean(&recent) {
            Ok(recent_average) if overall_average > 0.0 => {
                (recent_average / overall_average).clamp(0.5, 1.5)
            }
            _ => 1.0,
        };

        let volume_factor = (record_count as f64 / 20.0).min(1.0);
        let activity_factor = (recent.len() as f64 / 10.0).min(1.0);
        let spread_sample = if same_weights.len() >= 2 {
            &same_weights
        } else {
            &all_weights
        };
        let spread_average = mean(spread_sample).unwrap_or(0.0);
        let spread = population_std_dev(spread_sample).unwrap_or(0.0);
        let variability_factor = (1.0 - spread / spread_average.max(1.0)).max(0.1);

        let raw_confidence = unit_clamp(
            likelihood
                * (0.3 * volume_factor
                    + 0.2 * activity_factor
                    + 0.3 * consistency_factor
                    + 0.2 * variability_factor),
        );
        let confidence = self.adjustments.apply(CLIENT_BEHAVIOR_KEY, raw_confidence);

        Some(ClientPrediction {
            client_id: client_id.clone(),
            client_name: None,
            target_date: target,
            likelihood,
            predicted_weight,
            predicted_time,
            raw_confidence,
            confidence,
            weekly_presence,
            weight_drift,
            record_count,
        })
    }
}

/// 1 - coefficient of variation of the same-weekday intervals, floored at 0.1
fn consistency(same_day: &[&LocalPickup]) -> f64 {
    let mut dates: Vec<NaiveDate> = same_day.iter().map(|p| p.date).collect();
    dates.dedup();
    let intervals: Vec<f64> = dates
        .windows(2)
        .map(|pair| days_between(pair[0], pair[1]) as f64)
        .collect();
    if intervals.len() < 2 {
        return 1.0;
    }

    let average = mean(&intervals).unwrap_or(0.0);
    let spread = population_std_dev(&intervals).unwrap_or(0.0);
    if average <= 0.0 {
        return 1.0;
    }
    (1.0 - spread / average).max(0.1)
}

/// Average weight in the target month relative to the average across months
fn seasonal_adjustment(history: &[LocalPickup], target: NaiveDate) -> f64 {
    let mut months: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
    for pickup in history {
        months
            .entry(month_key(pickup.date))
            .or_default()
            .push(pickup.weight);
    }

    let Some(current) = months.get(&month_key(target)).and_then(|w| mean(w).ok()) else {
        return 1.0;
    };
    let monthly: Vec<f64> = months.values().filter_map(|w| mean(w).ok()).collect();
    let across = mean(&monthly).unwrap_or(0.0);
    safe_ratio(current, across, 1.0)
}

/// Recency-weighted average of same-weekday weights plus a share of their trend
fn weighted_weight(chronological: &[f64]) -> f64 {
    let newest_first: Vec<f64> = chronological.iter().rev().copied().collect();
    let average = exponentially_weighted_average(&newest_first, WEIGHT_DECAY).unwrap_or(0.0);

    if chronological.len() < 3 {
        return average;
    }

    let window = chronological.len().min(TREND_WINDOW);
    let slope = LinearRegression::fit(window, chronological).and_then(|r| r.slope());
    match slope {
        Ok(slope) => (average + TREND_SHARE * slope).max(0.0),
        Err(_) => average,
    }
}

fn minute_to_time(minute_of_day: u32) -> NaiveTime {
    let minute_of_day = minute_of_day.min(24 * 60 - 1);
    NaiveTime::from_num_seconds_from_midnight_opt(minute_of_day * 60, 0).unwrap_or(NaiveTime::MIN)
}

/// Client predictions with the default configuration and no learned adjustment
pub fn compute_client_predictions(
    dataset: &HistoricalDataset,
    target: NaiveDate,
    confidence_threshold: f64,
    now: DateTime<Utc>,
) -> Vec<ClientPrediction> {
    let config = ForecastConfig::default();
    let adjustments = ConfidenceAdjustments::neutral();
    ClientBehaviorPredictor::new(&config, &adjustments).predict(
        dataset,
        target,
        confidence_threshold,
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Offset, TimeZone};
    use rstest::rstest;

    /// Monday 2024-03-25, 17:00 UTC
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 25, 17, 0, 0).unwrap()
    }

    fn weekly_client(weeks: i64, weight: impl Fn(i64) -> f64) -> HistoricalDataset {
        let latest = Utc.with_ymd_and_hms(2024, 3, 25, 9, 0, 0).unwrap();
        let pickups = (0..weeks)
            .map(|i| PickupRecord::new("laundromat", latest - Duration::weeks(i), weight(i)))
            .collect();
        HistoricalDataset::new(pickups, Vec::new(), Vec::new(), Utc.fix())
    }

    fn next_monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    #[test]
    fn test_regular_monday_client() {
        let dataset = weekly_client(10, |i| if i % 2 == 0 { 510.0 } else { 490.0 });
        let predictions = compute_client_predictions(&dataset, next_monday(), 0.6, now());
        assert_eq!(predictions.len(), 1);

        let prediction = &predictions[0];
        assert!(prediction.likelihood > 0.8);
        assert!((480.0..=520.0).contains(&prediction.predicted_weight));
        assert_eq!(prediction.predicted_time_label(), "09:00");
        assert!(prediction.weekly_presence[1]);
        assert!(!prediction.weekly_presence[2]);
        assert!((0.0..=1.0).contains(&prediction.confidence));
    }

    #[test]
    fn test_too_few_records_are_excluded() {
        let dataset = weekly_client(4, |_| 500.0);
        let predictions = compute_client_predictions(&dataset, next_monday(), 0.0, now());
        assert!(predictions.is_empty());
    }

    #[test]
    fn test_other_weekday_has_no_likelihood() {
        let dataset = weekly_client(10, |_| 500.0);
        let tuesday = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let predictions = compute_client_predictions(&dataset, tuesday, 0.0, now());
        assert!(predictions.is_empty());
    }

    #[rstest]
    #[case(0.0, 1)]
    #[case(0.6, 1)]
    #[case(0.99, 0)]
    fn test_threshold_filters(#[case] threshold: f64, #[case] expected: usize) {
        let dataset = weekly_client(10, |_| 500.0);
        let predictions = compute_client_predictions(&dataset, next_monday(), threshold, now());
        assert_eq!(predictions.len(), expected);
    }

    #[test]
    fn test_stale_client_loses_likelihood() {
        let dataset = weekly_client(10, |_| 500.0);
        let later = now() + Duration::weeks(6);
        let target = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        let predictions = compute_client_predictions(&dataset, target, 0.0, later);
        assert!(predictions.is_empty());
    }

    #[test]
    fn test_consistency_penalises_irregular_gaps() {
        let pickup = |date: NaiveDate| LocalPickup {
            date,
            minute_of_day: 540,
            weight: 100.0,
        };
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let regular: Vec<LocalPickup> =
            (0..4).map(|i| pickup(start + Duration::weeks(i))).collect();
        let irregular: Vec<LocalPickup> = [0, 1, 5, 6]
            .iter()
            .map(|&i| pickup(start + Duration::weeks(i)))
            .collect();

        let regular_refs: Vec<&LocalPickup> = regular.iter().collect();
        let irregular_refs: Vec<&LocalPickup> = irregular.iter().collect();
        assert_eq!(consistency(&regular_refs), 1.0);
        assert!(consistency(&irregular_refs) < 1.0);
    }

    #[test]
    fn test_predicted_time_uses_median() {
        let latest = Utc.with_ymd_and_hms(2024, 3, 25, 9, 0, 0).unwrap();
        let offsets_minutes = [0, 10, -5, 0, 240];
        let pickups = offsets_minutes
            .iter()
            .enumerate()
            .map(|(i, &m)| {
                PickupRecord::new(
                    "hotel",
                    latest - Duration::weeks(i as i64) + Duration::minutes(m),
                    300.0,
                )
            })
            .collect();
        let dataset = HistoricalDataset::new(pickups, Vec::new(), Vec::new(), Utc.fix());
        let predictions = compute_client_predictions(&dataset, next_monday(), 0.0, now());
        assert_eq!(predictions[0].predicted_time_label(), "09:00");
    }

    #[test]
    fn test_weight_drift_tracks_recent_change() {
        let dataset = weekly_client(12, |i| if i < 4 { 800.0 } else { 400.0 });
        let predictions = compute_client_predictions(&dataset, next_monday(), 0.0, now());
        assert!(predictions[0].weight_drift > 1.0);
        assert!(predictions[0].weight_drift <= 1.5);
    }

    #[test]
    fn test_rising_client_adds_share_of_slope() {
        // Newest Monday is 1000 lbs, each earlier week 100 lbs lighter
        let dataset = weekly_client(10, |i| 1000.0 - 100.0 * i as f64);
        let predictions = compute_client_predictions(&dataset, next_monday(), 0.0, now());
        assert_eq!(predictions.len(), 1);

        let newest_first: Vec<f64> = (0..10).map(|i| 1000.0 - 100.0 * i as f64).collect();
        let average = exponentially_weighted_average(&newest_first, WEIGHT_DECAY).unwrap();
        approx::assert_relative_eq!(
            predictions[0].predicted_weight,
            average + TREND_SHARE * 100.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_short_history_uses_plain_average() {
        let average = exponentially_weighted_average(&[200.0, 100.0], WEIGHT_DECAY).unwrap();
        approx::assert_relative_eq!(weighted_weight(&[100.0, 200.0]), average);
    }
}
