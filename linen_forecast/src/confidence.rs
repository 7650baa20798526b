//! Adaptive confidence recalibration from observed forecast error
//!
//! Every backtested prediction is logged as an [`AccuracyRecord`]. The
//! [`AdaptiveConfidenceLearner`] groups the log by [`ModelKey`] and derives a
//! multiplier per key. Multipliers are applied on top of a component's raw
//! confidence at the point of use; the raw value itself is never overwritten.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Denominator floor for error rates
pub const ERROR_RATE_EPSILON: f64 = 1e-6;

/// Lower bound for a learned multiplier
pub const MIN_MULTIPLIER: f64 = 0.1;

/// Upper bound for a learned multiplier
pub const MAX_MULTIPLIER: f64 = 2.0;

/// Component whose prediction was scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelName {
    WeeklyPattern,
    ClientBehavior,
    Ensemble,
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelName::WeeklyPattern => write!(f, "weekly_pattern"),
            ModelName::ClientBehavior => write!(f, "client_behavior"),
            ModelName::Ensemble => write!(f, "ensemble"),
        }
    }
}

/// Quantity that was predicted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionType {
    Weight,
    Entries,
    ClientActivity,
}

impl fmt::Display for PredictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionType::Weight => write!(f, "weight"),
            PredictionType::Entries => write!(f, "entries"),
            PredictionType::ClientActivity => write!(f, "client_activity"),
        }
    }
}

/// Model name plus prediction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    pub model: ModelName,
    pub prediction: PredictionType,
}

impl ModelKey {
    pub const fn new(model: ModelName, prediction: PredictionType) -> Self {
        Self { model, prediction }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.model, self.prediction)
    }
}

/// Key whose multiplier scales weekly pattern confidence
pub const WEEKLY_PATTERN_KEY: ModelKey =
    ModelKey::new(ModelName::WeeklyPattern, PredictionType::Weight);

/// Key whose multiplier scales client prediction confidence
pub const CLIENT_BEHAVIOR_KEY: ModelKey =
    ModelKey::new(ModelName::ClientBehavior, PredictionType::ClientActivity);

/// Key whose multiplier scales combined day forecast confidence
pub const ENSEMBLE_KEY: ModelKey = ModelKey::new(ModelName::Ensemble, PredictionType::Weight);

/// One backtested prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub date: NaiveDate,
    pub model: ModelName,
    pub prediction_type: PredictionType,
    pub predicted_value: f64,
    pub actual_value: f64,
    /// |predicted - actual| / max(predicted, epsilon)
    pub error_rate: f64,
}

impl AccuracyRecord {
    pub fn new(
        date: NaiveDate,
        model: ModelName,
        prediction_type: PredictionType,
        predicted_value: f64,
        actual_value: f64,
    ) -> Self {
        let error_rate =
            (predicted_value - actual_value).abs() / predicted_value.max(ERROR_RATE_EPSILON);
        Self {
            date,
            model,
            prediction_type,
            predicted_value,
            actual_value,
            error_rate,
        }
    }

    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.model, self.prediction_type)
    }

    /// 1 - error rate
    pub fn accuracy(&self) -> f64 {
        1.0 - self.error_rate
    }
}

/// Append-only history of accuracy records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccuracyLog {
    records: Vec<AccuracyRecord>,
}

impl AccuracyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: AccuracyRecord) {
        self.records.push(record);
    }

    pub fn extend<I: IntoIterator<Item = AccuracyRecord>>(&mut self, records: I) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[AccuracyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<AccuracyRecord>> for AccuracyLog {
    fn from(records: Vec<AccuracyRecord>) -> Self {
        Self { records }
    }
}

/// Learned multiplier for one model key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAdjustment {
    pub key: ModelKey,
    pub multiplier: f64,
    pub record_count: usize,
    /// Mean accuracy over the recent records, when enough evidence exists
    pub recent_accuracy: Option<f64>,
}

/// Multipliers keyed by model; absent keys mean no adjustment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ConfidenceAdjustment>", into = "Vec<ConfidenceAdjustment>")]
pub struct ConfidenceAdjustments {
    entries: BTreeMap<ModelKey, ConfidenceAdjustment>,
}

impl ConfidenceAdjustments {
    /// No adjustments: every multiplier is 1.0
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn multiplier(&self, key: ModelKey) -> f64 {
        self.entries
            .get(&key)
            .map(|entry| entry.multiplier)
            .unwrap_or(1.0)
    }

    /// Scale a raw confidence by the key's multiplier, capped at 1.0
    pub fn apply(&self, key: ModelKey, raw_confidence: f64) -> f64 {
        demand_math::unit_clamp(raw_confidence * self.multiplier(key))
    }

    pub fn get(&self, key: ModelKey) -> Option<&ConfidenceAdjustment> {
        self.entries.get(&key)
    }

    /// Multipliers as a plain map
    pub fn multipliers(&self) -> BTreeMap<ModelKey, f64> {
        self.entries
            .iter()
            .map(|(key, entry)| (*key, entry.multiplier))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfidenceAdjustment> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ConfidenceAdjustment>> for ConfidenceAdjustments {
    fn from(list: Vec<ConfidenceAdjustment>) -> Self {
        Self {
            entries: list.into_iter().map(|entry| (entry.key, entry)).collect(),
        }
    }
}

impl From<ConfidenceAdjustments> for Vec<ConfidenceAdjustment> {
    fn from(adjustments: ConfidenceAdjustments) -> Self {
        adjustments.entries.into_values().collect()
    }
}

/// Derives per-model confidence multipliers from accuracy history
#[derive(Debug, Clone)]
pub struct AdaptiveConfidenceLearner {
    min_records: usize,
}

impl Default for AdaptiveConfidenceLearner {
    fn default() -> Self {
        Self { min_records: 3 }
    }
}

impl AdaptiveConfidenceLearner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute a multiplier for every model key present in `records`
    pub fn learn(&self, records: &[AccuracyRecord]) -> ConfidenceAdjustments {
        let mut groups: BTreeMap<ModelKey, Vec<&AccuracyRecord>> = BTreeMap::new();
        for record in records.iter().filter(|r| r.error_rate.is_finite()) {
            groups.entry(record.key()).or_default().push(record);
        }

        let entries = groups
            .into_iter()
            .map(|(key, mut group)| {
                // Stable sort keeps log order for records on the same date
                group.sort_by_key(|record| record.date);
                let accuracies: Vec<f64> = group.iter().map(|r| r.accuracy()).collect();
                let adjustment = self.adjustment_for(key, &accuracies);
                debug!(
                    "Confidence multiplier for {} = {:.3} from {} records",
                    key, adjustment.multiplier, adjustment.record_count
                );
                (key, adjustment)
            })
            .collect();

        ConfidenceAdjustments { entries }
    }

    /// Multiplier for one key, given accuracies ordered oldest first
    fn adjustment_for(&self, key: ModelKey, accuracies: &[f64]) -> ConfidenceAdjustment {
        let count = accuracies.len();
        if count < self.min_records {
            return ConfidenceAdjustment {
                key,
                multiplier: 1.0,
                record_count: count,
                recent_accuracy: None,
            };
        }

        let recent_len = ((count as f64 * 0.3).ceil() as usize).max(3).min(count);
        let recent_accuracy = average(&accuracies[count - recent_len..]);

        let mut multiplier = if recent_accuracy > 0.85 {
            (1.0 + 2.0 * (recent_accuracy - 0.85)).min(1.5)
        } else if recent_accuracy > 0.7 {
            1.0 + 0.5 * (recent_accuracy - 0.7)
        } else if recent_accuracy > 0.5 {
            1.0
        } else {
            (recent_accuracy * 1.5).max(0.3)
        };

        let (first_half, second_half) = accuracies.split_at(count / 2);
        let trend_factor = if average(second_half) > average(first_half) {
            1.1
        } else {
            0.95
        };
        multiplier *= trend_factor;

        let volume_factor = (1.0 + 0.2 * count as f64 / 100.0).min(1.2);
        multiplier *= volume_factor;

        ConfidenceAdjustment {
            key,
            multiplier: multiplier.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER),
            record_count: count,
            recent_accuracy: Some(recent_accuracy),
        }
    }
}

fn average(values: &[f64]) -> f64 {
    demand_math::mean(values).unwrap_or(0.0)
}

/// Multipliers for every model key in `records`
pub fn compute_confidence_adjustments(records: &[AccuracyRecord]) -> ConfidenceAdjustments {
    AdaptiveConfidenceLearner::new().learn(records)
}
