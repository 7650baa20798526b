//! # Demand Math
//!
//! Numeric building blocks for workload pattern analysis and demand forecasting.
//! This crate knows nothing about pickups, clients or calendars: it works on
//! plain `f64` samples so the forecasting crate can keep its domain logic
//! separate from the arithmetic.

use thiserror::Error;

pub mod descriptive;
pub mod forecasting;
pub mod outliers;
pub mod weighting;

pub use descriptive::{coefficient_of_variation, mean, median, population_std_dev, quartiles};
pub use forecasting::{mean_first_difference, LinearRegression};
pub use outliers::{IqrFences, OutlierSplit};
pub use weighting::{exponentially_weighted_average, recency_weight};

/// Errors that can occur in demand-related calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for demand math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Divide, substituting `fallback` when the denominator is zero or not finite.
pub fn safe_ratio(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator.abs() < f64::EPSILON || !denominator.is_finite() {
        return fallback;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        fallback
    }
}

/// Clamp a score into the unit interval, mapping NaN to zero.
pub fn unit_clamp(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_ratio_guards_zero_denominator() {
        assert_eq!(safe_ratio(10.0, 0.0, 1.0), 1.0);
        assert_eq!(safe_ratio(10.0, 4.0, 1.0), 2.5);
        assert_eq!(safe_ratio(1.0, f64::NAN, 0.0), 0.0);
    }

    #[test]
    fn unit_clamp_handles_nan() {
        assert_eq!(unit_clamp(f64::NAN), 0.0);
        assert_eq!(unit_clamp(1.7), 1.0);
        assert_eq!(unit_clamp(-0.2), 0.0);
        assert_eq!(unit_clamp(0.4), 0.4);
    }
}
