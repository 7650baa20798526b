use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use linen_forecast::calendar::shift_days;
use linen_forecast::confidence::{MAX_MULTIPLIER, MIN_MULTIPLIER};
use linen_forecast::{
    compute_client_predictions, compute_confidence_adjustments, compute_weight_comparisons,
    generate_synthetic_dataset, AccuracyLog, AccuracyRecord, ForecastEngine, ModelKey, ModelName,
    PredictionType,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 4, 16, 30, 0).unwrap()
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(42)]
#[case(2024)]
fn test_report_values_stay_in_range(#[case] seed: u64) {
    let dataset = generate_synthetic_dataset(15, 120, now(), seed).unwrap();
    let report = ForecastEngine::new().run(&dataset, &AccuracyLog::new(), now());

    for pattern in report.weekly_patterns.iter() {
        assert!((0.0..=1.0).contains(&pattern.confidence));
        assert!((0.0..=1.0).contains(&pattern.raw_confidence));
        assert!(pattern.avg_weight >= 0.0);
        assert!(pattern.outlier_count <= pattern.sample_count);
    }

    for forecast in &report.day_forecasts {
        assert!((0.0..=1.0).contains(&forecast.confidence_level));
        assert!(forecast.total_predicted_weight.is_finite());
        assert!(forecast.total_predicted_weight >= 0.0);
        assert!(forecast.total_predicted_entries >= 0.0);
        assert!(forecast.total_predicted_revenue >= 0.0);
        assert!(forecast.peak_hours.iter().all(|h| *h < 24));
    }

    for adjustment in report.confidence_adjustments.iter() {
        assert!((MIN_MULTIPLIER..=MAX_MULTIPLIER).contains(&adjustment.multiplier));
    }
}

#[rstest]
#[case(3)]
#[case(99)]
fn test_client_predictions_stay_in_range(#[case] seed: u64) {
    let dataset = generate_synthetic_dataset(20, 90, now(), seed).unwrap();
    let today = dataset.today(now());

    for days_ahead in 0..7 {
        let target = shift_days(today, days_ahead);
        for prediction in compute_client_predictions(&dataset, target, 0.0, now()) {
            assert!((0.0..=1.0).contains(&prediction.likelihood));
            assert!((0.0..=1.0).contains(&prediction.confidence));
            assert!(prediction.predicted_weight >= 0.0);
            assert!(prediction.record_count >= 5);
            assert!((0.5..=1.5).contains(&prediction.weight_drift));
            assert_eq!(prediction.target_date, target);
        }
    }
}

#[test]
fn test_runs_are_deterministic() {
    let dataset = generate_synthetic_dataset(12, 100, now(), 17).unwrap();
    let engine = ForecastEngine::new();
    let first = engine.run(&dataset, &AccuracyLog::new(), now());
    let second = engine.run(&dataset, &AccuracyLog::new(), now());
    assert_eq!(first, second);
}

#[test]
fn test_comparisons_reproduce_observed_weight() {
    let dataset = generate_synthetic_dataset(10, 120, now(), 23).unwrap();
    // Forecast from three weeks back so every forecast date is already observed
    let earlier = now() - Duration::days(21);
    let forecasts = ForecastEngine::new().day_forecasts(&dataset, 14, earlier);
    let comparisons = compute_weight_comparisons(&dataset, &forecasts, earlier);
    let aggregates = dataset.daily_aggregates();

    let forecast_dates: Vec<NaiveDate> = comparisons
        .iter()
        .filter(|c| c.is_forecast)
        .map(|c| c.date)
        .collect();
    assert_eq!(forecast_dates.len(), 14);

    for comparison in &comparisons {
        assert_eq!(
            comparison.actual_pickup_weight,
            aggregates.get(&comparison.date).map(|a| a.weight)
        );
    }
}

#[test]
fn test_learned_multipliers_are_bounded() {
    let mut rng = StdRng::seed_from_u64(8);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let models = [ModelName::WeeklyPattern, ModelName::ClientBehavior, ModelName::Ensemble];
    let predictions = [PredictionType::Weight, PredictionType::Entries];

    let mut records = Vec::new();
    for (i, model) in models.iter().enumerate() {
        for (j, prediction) in predictions.iter().enumerate() {
            let count = 1 + (i * 2 + j) * 15;
            for day in 0..count {
                let predicted: f64 = rng.gen_range(10.0..1000.0);
                let actual: f64 = rng.gen_range(0.0..3000.0);
                records.push(AccuracyRecord::new(
                    shift_days(start, day as i64),
                    *model,
                    *prediction,
                    predicted,
                    actual,
                ));
            }
        }
    }

    let adjustments = compute_confidence_adjustments(&records);
    assert_eq!(adjustments.len(), 6);
    for adjustment in adjustments.iter() {
        assert!((MIN_MULTIPLIER..=MAX_MULTIPLIER).contains(&adjustment.multiplier));
    }

    // A single record is not enough evidence to move the multiplier
    let sparse = ModelKey::new(ModelName::WeeklyPattern, PredictionType::Weight);
    assert_eq!(adjustments.multiplier(sparse), 1.0);
}
