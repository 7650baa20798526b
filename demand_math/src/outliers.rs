//! Interquartile-range outlier detection

use crate::descriptive::quartiles;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Multiplier applied to the IQR when placing the fences
pub const IQR_FENCE_MULTIPLIER: f64 = 1.5;

/// Lower and upper fences derived from a sample's quartiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrFences {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrFences {
    /// Compute fences for the sample, requiring at least `min_samples` values
    pub fn from_samples(values: &[f64], min_samples: usize) -> Result<Self> {
        if values.len() < min_samples.max(1) {
            return Err(MathError::InsufficientData(format!(
                "Outlier detection needs at least {} samples, have {}",
                min_samples,
                values.len()
            )));
        }

        let (q1, q3) = quartiles(values)?;
        let iqr = q3 - q1;

        Ok(Self {
            q1,
            q3,
            lower: q1 - IQR_FENCE_MULTIPLIER * iqr,
            upper: q3 + IQR_FENCE_MULTIPLIER * iqr,
        })
    }

    /// Whether a value falls strictly outside the fences
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Per-sample outlier flags, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierSplit {
    pub flags: Vec<bool>,
}

impl OutlierSplit {
    /// Flag outliers in `values`. Samples smaller than `min_samples` have no outliers.
    pub fn detect(values: &[f64], min_samples: usize) -> Self {
        let flags = match IqrFences::from_samples(values, min_samples) {
            Ok(fences) => values.iter().map(|&v| fences.is_outlier(v)).collect(),
            Err(_) => vec![false; values.len()],
        };
        Self { flags }
    }

    pub fn outlier_count(&self) -> usize {
        self.flags.iter().filter(|&&flag| flag).count()
    }

    /// Split `values` (aligned with the flags) into (regular, outlier) samples
    pub fn partition(&self, values: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut regular = Vec::with_capacity(values.len());
        let mut outliers = Vec::new();
        for (&value, &flag) in values.iter().zip(self.flags.iter()) {
            if flag {
                outliers.push(value);
            } else {
                regular.push(value);
            }
        }
        (regular, outliers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_single_spike() {
        let weights = [10.0, 10.0, 10.0, 10.0, 200.0];
        let split = OutlierSplit::detect(&weights, 5);
        assert_eq!(split.flags, vec![false, false, false, false, true]);
        assert_eq!(split.outlier_count(), 1);
    }

    #[test]
    fn test_small_samples_have_no_outliers() {
        let weights = [10.0, 10.0, 10.0, 200.0];
        let split = OutlierSplit::detect(&weights, 5);
        assert_eq!(split.outlier_count(), 0);
    }

    #[test]
    fn test_partition_keeps_order() {
        let weights = [100.0, 100.0, 500.0, 100.0, 100.0, 100.0];
        let split = OutlierSplit::detect(&weights, 5);
        let (regular, outliers) = split.partition(&weights);
        assert_eq!(regular, vec![100.0; 5]);
        assert_eq!(outliers, vec![500.0]);
    }

    #[test]
    fn test_fences_reject_tiny_samples() {
        assert!(IqrFences::from_samples(&[1.0, 2.0], 5).is_err());
    }
}
