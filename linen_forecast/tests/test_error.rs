use demand_math::MathError;
use linen_forecast::records::RawPickupRecord;
use linen_forecast::{ForecastConfig, ForecastError, PickupRecord};
use std::io;

#[test]
fn test_error_conversion() {
    // Test IO error conversion
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);
    assert!(matches!(forecast_error, ForecastError::Io(_)));

    // Test JSON error conversion
    let json_error = serde_json::from_str::<ForecastConfig>("{not json").unwrap_err();
    let forecast_error = ForecastError::from(json_error);
    assert!(matches!(forecast_error, ForecastError::Json(_)));

    // Test math error conversion
    let math_error = MathError::InsufficientData("empty sample".to_string());
    let forecast_error = ForecastError::from(math_error);
    assert!(matches!(forecast_error, ForecastError::Math(_)));
}

#[test]
fn test_error_display() {
    let error = ForecastError::InvalidParameter("clients must be positive".to_string());
    assert_eq!(error.to_string(), "Invalid parameter: clients must be positive");

    let error = ForecastError::Config("forecast days out of range".to_string());
    assert_eq!(error.to_string(), "Configuration error: forecast days out of range");

    let error = ForecastError::from(MathError::InvalidInput("negative window".to_string()));
    assert_eq!(error.to_string(), "Math error: Invalid input: negative window");
}

#[test]
fn test_malformed_record_error() {
    let raw = RawPickupRecord {
        client_id: Some("hotel".to_string()),
        timestamp: None,
        weight: Some(120.0),
        driver_id: None,
    };
    match PickupRecord::try_from(raw) {
        Err(ForecastError::MalformedRecord(message)) => assert!(message.contains("hotel")),
        other => panic!("Expected MalformedRecord, got {:?}", other),
    }
}

#[test]
fn test_missing_config_file() {
    let result = ForecastConfig::from_json_file("/nonexistent/linen/config.json");
    assert!(matches!(result, Err(ForecastError::Io(_))));
}
