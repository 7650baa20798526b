//! Error types for the linen_forecast crate

use thiserror::Error;

/// Custom error types for the linen_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A raw record is missing a required field or carries an unusable value
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// The record source failed to deliver data
    #[error("Record source error: {0}")]
    Source(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the statistics helpers
    #[error("Math error: {0}")]
    Math(#[from] demand_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
