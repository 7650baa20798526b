//! Descriptive statistics over plain samples
//!
//! Thin wrappers over `statrs` that return `MathError::InsufficientData`
//! instead of NaN when the sample is empty.

use crate::{MathError, Result};
use statrs::statistics::{Data, Median, OrderStatistics, Statistics};

fn require_samples(values: &[f64], what: &str) -> Result<()> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(format!(
            "Cannot calculate {} of an empty sample",
            what
        )));
    }
    Ok(())
}

/// Arithmetic mean of the sample
pub fn mean(values: &[f64]) -> Result<f64> {
    require_samples(values, "mean")?;
    Ok(values.iter().mean())
}

/// Population standard deviation (divides by `n`, not `n - 1`)
pub fn population_std_dev(values: &[f64]) -> Result<f64> {
    require_samples(values, "standard deviation")?;
    if values.len() == 1 {
        return Ok(0.0);
    }
    Ok(values.iter().population_std_dev())
}

/// Median of the sample; even-sized samples average the two middle values
pub fn median(values: &[f64]) -> Result<f64> {
    require_samples(values, "median")?;
    let data = Data::new(values.to_vec());
    Ok(Median::median(&data))
}

/// First and third quartiles of the sample
pub fn quartiles(values: &[f64]) -> Result<(f64, f64)> {
    require_samples(values, "quartiles")?;
    let mut data = Data::new(values.to_vec());
    Ok((data.lower_quartile(), data.upper_quartile()))
}

/// Standard deviation relative to the mean.
///
/// The mean is floored at `floor` before dividing, so a sample centred on zero
/// yields a finite value.
pub fn coefficient_of_variation(values: &[f64], floor: f64) -> Result<f64> {
    let avg = mean(values)?;
    let std_dev = population_std_dev(values)?;
    Ok(std_dev / avg.abs().max(floor))
}
