//! Recency weighting helpers

use crate::{MathError, Result};

/// Exponential recency weight `exp(-age / scale)`.
///
/// Negative ages (samples dated in the future) are treated as age zero.
pub fn recency_weight(age: f64, scale: f64) -> f64 {
    if scale <= 0.0 {
        return 1.0;
    }
    (-(age.max(0.0)) / scale).exp()
}

/// Weighted average where the most recent sample has weight 1 and each step
/// further back is multiplied by `decay`.
///
/// `newest_first` must be ordered from most recent to oldest.
pub fn exponentially_weighted_average(newest_first: &[f64], decay: f64) -> Result<f64> {
    if newest_first.is_empty() {
        return Err(MathError::InsufficientData(
            "No samples for weighted average".to_string(),
        ));
    }
    if decay <= 0.0 || decay > 1.0 {
        return Err(MathError::InvalidInput(
            "Decay must be in (0, 1]".to_string(),
        ));
    }

    let mut weight = 1.0;
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for &value in newest_first {
        weighted_sum += value * weight;
        weight_total += weight;
        weight *= decay;
    }

    Ok(weighted_sum / weight_total)
}
