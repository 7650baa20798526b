//! Day-of-week workload patterns with outlier-aware statistics

use crate::calendar::{day_name, days_between, local_hour, shift_days, weekday_index, WEEKDAYS};
use crate::config::ForecastConfig;
use crate::confidence::{ConfidenceAdjustments, WEEKLY_PATTERN_KEY};
use crate::dataset::{DailyAggregate, HistoricalDataset};
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use demand_math::{mean, population_std_dev, recency_weight, unit_clamp, OutlierSplit};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Share of a statistic taken from regular (non-outlier) dates
const REGULAR_SHARE: f64 = 0.7;
/// Share of a statistic taken from outlier dates
const OUTLIER_SHARE: f64 = 0.3;
/// Dates within this many days of today count as recent
const RECENT_DAYS: i64 = 30;
/// Scale of the exponential recency weight used for peak hours
const PEAK_RECENCY_SCALE: f64 = 30.0;

/// Statistical profile of one weekday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPattern {
    pub day: Weekday,
    pub avg_weight: f64,
    pub avg_entries: f64,
    pub avg_revenue: f64,
    pub avg_client_count: f64,
    /// Local hour with the most intake, if any pickups exist
    pub peak_hour: Option<u32>,
    /// Confidence before any learned adjustment
    pub raw_confidence: f64,
    /// Confidence after the learned multiplier, capped at 1.0
    pub confidence: f64,
    /// Distinct dates observed for this weekday
    pub sample_count: usize,
    pub outlier_count: usize,
    /// Invoiced revenue per pound collected, when any weight was collected
    pub revenue_per_pound: Option<f64>,
    pub recommendations: Vec<String>,
}

impl WeeklyPattern {
    /// Profile of a weekday with no history
    pub fn empty(day: Weekday) -> Self {
        Self {
            day,
            avg_weight: 0.0,
            avg_entries: 0.0,
            avg_revenue: 0.0,
            avg_client_count: 0.0,
            peak_hour: None,
            raw_confidence: 0.0,
            confidence: 0.0,
            sample_count: 0,
            outlier_count: 0,
            revenue_per_pound: None,
            recommendations: vec![format!(
                "No history for {}; forecasts rely on client and trend models",
                day_name(day)
            )],
        }
    }
}

/// One profile per weekday, indexed Sunday = 0 through Saturday = 6
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPatterns {
    patterns: [WeeklyPattern; 7],
}

impl WeeklyPatterns {
    pub fn get(&self, day: Weekday) -> &WeeklyPattern {
        &self.patterns[weekday_index(day)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeeklyPattern> {
        self.patterns.iter()
    }

    pub fn as_slice(&self) -> &[WeeklyPattern] {
        &self.patterns
    }
}

/// Hourly intake scores for one weekday
#[derive(Debug, Clone, Copy)]
struct HourScores {
    entries: [f64; 24],
    weighted: [f64; 24],
}

impl HourScores {
    fn new() -> Self {
        Self {
            entries: [0.0; 24],
            weighted: [0.0; 24],
        }
    }

    fn peak(&self) -> Option<u32> {
        let mut best: Option<(u32, f64)> = None;
        for hour in 0..24 {
            if self.entries[hour] == 0.0 {
                continue;
            }
            let score = self.entries[hour] + 0.1 * self.weighted[hour];
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((hour as u32, score)),
            }
        }
        best.map(|(hour, _)| hour)
    }
}

/// Derives a [`WeeklyPattern`] for every weekday
#[derive(Debug, Clone)]
pub struct WeeklyPatternAnalyzer<'a> {
    config: &'a ForecastConfig,
    adjustments: &'a ConfidenceAdjustments,
}

impl<'a> WeeklyPatternAnalyzer<'a> {
    pub fn new(config: &'a ForecastConfig, adjustments: &'a ConfidenceAdjustments) -> Self {
        Self {
            config,
            adjustments,
        }
    }

    /// Profile every weekday over the pattern lookback window ending today
    pub fn analyze(&self, dataset: &HistoricalDataset, now: DateTime<Utc>) -> WeeklyPatterns {
        let today = dataset.today(now);
        let start = shift_days(today, -self.config.pattern_lookback_days);

        let aggregates = dataset.daily_aggregates_between(start, today);
        let mut buckets: [Vec<&DailyAggregate>; 7] = Default::default();
        for aggregate in aggregates.values() {
            buckets[weekday_index(aggregate.date.weekday())].push(aggregate);
        }

        let mut hours = [HourScores::new(); 7];
        for pickup in dataset.pickups() {
            let date = dataset.pickup_date(pickup);
            if date < start || date > today {
                continue;
            }
            let scores = &mut hours[weekday_index(date.weekday())];
            let hour = local_hour(pickup.timestamp, dataset.offset()) as usize;
            let days_ago = days_between(date, today) as f64;
            scores.entries[hour] += 1.0;
            scores.weighted[hour] += pickup.weight * recency_weight(days_ago, PEAK_RECENCY_SCALE);
        }

        let mut patterns: [WeeklyPattern; 7] =
            std::array::from_fn(|index| WeeklyPattern::empty(WEEKDAYS[index]));
        patterns
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, slot)| {
                *slot = self.profile(WEEKDAYS[index], &buckets[index], &hours[index], today);
            });

        debug!(
            "Computed weekly patterns from {} dates between {} and {}",
            aggregates.len(),
            start,
            today
        );
        WeeklyPatterns { patterns }
    }

    fn profile(
        &self,
        day: Weekday,
        buckets: &[&DailyAggregate],
        hours: &HourScores,
        today: NaiveDate,
    ) -> WeeklyPattern {
        let sample_count = buckets.len();
        if sample_count == 0 {
            return WeeklyPattern::empty(day);
        }

        let weights: Vec<f64> = buckets.iter().map(|b| b.weight).collect();
        let split = OutlierSplit::detect(&weights, self.config.min_outlier_samples);
        let outlier_count = split.outlier_count();

        let blended = |field: fn(&DailyAggregate) -> f64| {
            let values: Vec<f64> = buckets.iter().map(|b| field(b)).collect();
            let (regular, outliers) = split.partition(&values);
            REGULAR_SHARE * mean(&regular).unwrap_or(0.0)
                + OUTLIER_SHARE * mean(&outliers).unwrap_or(0.0)
        };

        let avg_weight = blended(|b| b.weight);
        let avg_entries = blended(|b| b.entry_count as f64);
        let avg_revenue = blended(|b| b.revenue);
        let avg_client_count = blended(|b| b.client_count() as f64);

        let n = sample_count as f64;
        let volume_factor = (n / 8.0).min(1.0);

        let recent_dates = buckets
            .iter()
            .filter(|b| days_between(b.date, today) <= RECENT_DAYS)
            .count() as f64;
        let recency_factor = (recent_dates / (0.3 * n).max(4.0)).min(1.0);

        let (regular_weights, _) = split.partition(&weights);
        let spread = population_std_dev(&regular_weights).unwrap_or(0.0);
        let variability_factor = (1.0 - spread / avg_weight.max(1.0)).max(0.1);

        let outlier_factor = (1.0 - 0.5 * outlier_count as f64 / n).max(0.7);

        let raw_confidence = unit_clamp(
            0.3 * volume_factor + 0.3 * recency_factor + 0.3 * variability_factor
                + 0.1 * outlier_factor,
        );
        let confidence = self.adjustments.apply(WEEKLY_PATTERN_KEY, raw_confidence);

        let total_weight: f64 = weights.iter().sum();
        let total_revenue: f64 = buckets.iter().map(|b| b.revenue).sum();
        let revenue_per_pound = if total_weight > 0.0 {
            Some(total_revenue / total_weight)
        } else {
            None
        };

        let mut pattern = WeeklyPattern {
            day,
            avg_weight,
            avg_entries,
            avg_revenue,
            avg_client_count,
            peak_hour: hours.peak(),
            raw_confidence,
            confidence,
            sample_count,
            outlier_count,
            revenue_per_pound,
            recommendations: Vec::new(),
        };
        pattern.recommendations = recommendations(&pattern);
        pattern
    }
}

/// Advisory hints for a weekday profile
fn recommendations(pattern: &WeeklyPattern) -> Vec<String> {
    let name = day_name(pattern.day);
    let mut hints = Vec::new();

    if pattern.avg_weight > 1200.0 && pattern.confidence > 0.6 {
        hints.push(format!(
            "High volume on {}: schedule additional staff for sorting and washing",
            name
        ));
    } else if pattern.avg_weight < 300.0 && pattern.confidence > 0.6 {
        hints.push(format!(
            "Light volume on {}: consider consolidating routes or shifts",
            name
        ));
    }

    if pattern.avg_client_count > 15.0 {
        hints.push(format!("Many clients on {}: stagger pickup routes", name));
    }

    if pattern.confidence < 0.4 {
        hints.push(format!(
            "Low confidence for {}: treat this pattern as indicative only",
            name
        ));
    }

    if pattern.outlier_count > 0 {
        hints.push(format!(
            "{} unusual {} date(s) included at reduced weight",
            pattern.outlier_count, name
        ));
    }

    if let Some(hour) = pattern.peak_hour {
        if pattern.confidence > 0.5 {
            hints.push(format!("Peak intake around {:02}:00", hour));
        }
    }

    hints
}

/// Weekly patterns with the default configuration and no learned adjustment
pub fn compute_weekly_patterns(dataset: &HistoricalDataset, now: DateTime<Utc>) -> WeeklyPatterns {
    let config = ForecastConfig::default();
    let adjustments = ConfidenceAdjustments::neutral();
    WeeklyPatternAnalyzer::new(&config, &adjustments).analyze(dataset, now)
}
