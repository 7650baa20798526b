//! Tunable parameters for a forecasting run

use crate::error::{ForecastError, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Longest horizon the ensemble forecaster will produce
pub const MAX_FORECAST_DAYS: usize = 14;

/// Longest history window accepted for lookbacks and backtests
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Thresholds behind the staffing hints attached to each day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffingThresholds {
    /// Above this weight (lbs) with enough confidence, recommend 2+ extra staff
    pub high_volume_lbs: f64,
    /// Above this weight, recommend one extra staff member
    pub elevated_volume_lbs: f64,
    /// Below this weight, a minimum crew is enough
    pub light_volume_lbs: f64,
    /// Confidence required before the high-volume hint is issued
    pub min_confidence: f64,
}

impl Default for StaffingThresholds {
    fn default() -> Self {
        Self {
            high_volume_lbs: 1400.0,
            elevated_volume_lbs: 1000.0,
            light_volume_lbs: 400.0,
            min_confidence: 0.6,
        }
    }
}

/// Configuration for the forecasting pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// History used for weekly patterns and client behaviour
    pub pattern_lookback_days: i64,
    /// History used by the trend model
    pub trend_lookback_days: i64,
    /// Past days covered by weight comparisons and backtests
    pub backtest_days: i64,
    /// Default number of days to forecast
    pub forecast_days: usize,
    /// Client predictions below this confidence are not surfaced
    pub client_confidence_threshold: f64,
    /// Clients with fewer records are skipped
    pub min_client_records: usize,
    /// Clients whose likelihood falls below this are dropped
    pub min_client_likelihood: f64,
    /// Minimum distinct dates before IQR outlier detection applies
    pub min_outlier_samples: usize,
    /// Revenue per pound used when a weekday has no weight history
    pub default_rate_per_pound: f64,
    /// Offset of the local business day from UTC, in minutes
    pub utc_offset_minutes: i32,
    pub staffing: StaffingThresholds,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            pattern_lookback_days: 90,
            trend_lookback_days: 60,
            backtest_days: 14,
            forecast_days: 7,
            client_confidence_threshold: 0.6,
            min_client_records: 5,
            min_client_likelihood: 0.15,
            min_outlier_samples: 5,
            default_rate_per_pound: 1.25,
            utc_offset_minutes: 0,
            staffing: StaffingThresholds::default(),
        }
    }
}

impl ForecastConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check the parameters are within usable ranges
    pub fn validate(&self) -> Result<()> {
        if self.pattern_lookback_days <= 0 || self.trend_lookback_days <= 0 {
            return Err(ForecastError::Config(
                "Lookback windows must be positive".to_string(),
            ));
        }
        if self.backtest_days < 0 {
            return Err(ForecastError::Config(
                "Backtest window cannot be negative".to_string(),
            ));
        }
        for (name, value) in [
            ("pattern_lookback_days", self.pattern_lookback_days),
            ("trend_lookback_days", self.trend_lookback_days),
            ("backtest_days", self.backtest_days),
        ] {
            if value > MAX_WINDOW_DAYS {
                return Err(ForecastError::Config(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_WINDOW_DAYS, value
                )));
            }
        }
        if self.forecast_days == 0 || self.forecast_days > MAX_FORECAST_DAYS {
            return Err(ForecastError::Config(format!(
                "Forecast days must be between 1 and {}, got {}",
                MAX_FORECAST_DAYS, self.forecast_days
            )));
        }
        for (name, value) in [
            ("client_confidence_threshold", self.client_confidence_threshold),
            ("min_client_likelihood", self.min_client_likelihood),
            ("staffing.min_confidence", self.staffing.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ForecastError::Config(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        if !self.default_rate_per_pound.is_finite() || self.default_rate_per_pound < 0.0 {
            return Err(ForecastError::Config(
                "Default rate per pound must be a non-negative number".to_string(),
            ));
        }
        if self.offset_from_minutes().is_none() {
            return Err(ForecastError::Config(format!(
                "UTC offset of {} minutes is out of range",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    /// Offset used to map timestamps onto local calendar dates
    pub fn utc_offset(&self) -> FixedOffset {
        self.offset_from_minutes().unwrap_or_else(|| Utc.fix())
    }

    fn offset_from_minutes(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }
}
