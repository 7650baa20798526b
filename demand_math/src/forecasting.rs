//! Trend estimation for short demand series
//!
//! Contains:
//! - Windowed least-squares linear regression over equally spaced samples
//! - Mean first difference, the simplest per-step trend estimate

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Linear regression over the last `period` equally spaced samples
#[derive(Debug, Clone)]
pub struct LinearRegression {
    period: usize,
    values: VecDeque<f64>,
    slope: Option<f64>,
    intercept: Option<f64>,
}

impl LinearRegression {
    /// Create a new Linear Regression keeping at most `period` samples
    pub fn new(period: usize) -> Result<Self> {
        if period < 2 {
            return Err(MathError::InvalidInput(
                "Period must be at least 2 for linear regression".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            slope: None,
            intercept: None,
        })
    }

    /// Fit a regression to the tail of `values` (oldest first)
    pub fn fit(period: usize, values: &[f64]) -> Result<Self> {
        let mut regression = Self::new(period)?;
        for &value in values {
            regression.update(value)?;
        }
        Ok(regression)
    }

    /// Push a new sample, evicting the oldest once the window is full
    pub fn update(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "Sample must be finite, got {}",
                value
            )));
        }

        self.values.push_back(value);
        if self.values.len() > self.period {
            self.values.pop_front();
        }

        if self.values.len() >= 2 {
            self.calculate_regression()?;
        }

        Ok(())
    }

    fn calculate_regression(&mut self) -> Result<()> {
        let n = self.values.len() as f64;

        let x_mean = (0..self.values.len()).map(|i| i as f64).sum::<f64>() / n;
        let y_mean = self.values.iter().sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;

        for (i, &y) in self.values.iter().enumerate() {
            let x = i as f64;
            numerator += (x - x_mean) * (y - y_mean);
            denominator += (x - x_mean) * (x - x_mean);
        }

        if denominator.abs() < 1e-10 {
            return Err(MathError::CalculationError(
                "Cannot calculate slope: x values are too similar".to_string(),
            ));
        }

        let slope = numerator / denominator;
        self.slope = Some(slope);
        self.intercept = Some(y_mean - slope * x_mean);

        Ok(())
    }

    /// Predict the value `periods_ahead` steps after the last sample
    pub fn forecast(&self, periods_ahead: usize) -> Result<f64> {
        match (self.slope, self.intercept) {
            (Some(slope), Some(intercept)) => {
                let x = (self.values.len() + periods_ahead - 1) as f64;
                Ok(slope * x + intercept)
            }
            _ => Err(MathError::InsufficientData(
                "Not enough data for forecasting. Need at least 2 points.".to_string(),
            )),
        }
    }

    /// Current slope (change per step)
    pub fn slope(&self) -> Result<f64> {
        self.slope.ok_or_else(|| {
            MathError::InsufficientData("Not enough data to calculate slope".to_string())
        })
    }

    /// Number of samples currently in the window
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Average step-to-step change of a series (oldest first)
pub fn mean_first_difference(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(
            "Need at least 2 points for a first-difference trend".to_string(),
        ));
    }

    let total: f64 = values.windows(2).map(|pair| pair[1] - pair[0]).sum();
    Ok(total / (values.len() - 1) as f64)
}
