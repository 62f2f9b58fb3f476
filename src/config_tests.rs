use crate::config::{Config, EnvSource};
use std::collections::HashMap;

fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
    let values: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let lookup = move |key: &str| values.get(key).cloned();
    Config::from_source(&EnvSource::new(&lookup))
}

#[test]
fn test_config_defaults() {
    let config = load(&[]).unwrap();

    assert_eq!(config.forecast.indicators.rsi_period, 14);
    assert_eq!(config.forecast.min_history_points, 30);
    assert!((config.ensemble.settings.weight_floor - 0.05).abs() < f64::EPSILON);
    assert_eq!(config.batch.max_batch_size, 20);
    assert_eq!(config.batch.max_cards, 50);
    assert_eq!(config.persistence.database_url, "sqlite://data/cardcast.db");
}

#[test]
fn test_config_overrides() {
    let config = load(&[
        ("RSI_PERIOD", "21"),
        ("TREND_THRESHOLD", "0.05"),
        ("ENSEMBLE_USE_HISTORICAL_WEIGHTS", "false"),
        ("BATCH_MAX_CONCURRENCY", "3"),
        ("DATABASE_URL", "sqlite::memory:"),
    ])
    .unwrap();

    assert_eq!(config.forecast.indicators.rsi_period, 21);
    assert!((config.forecast.models.trend_threshold - 0.05).abs() < f64::EPSILON);
    assert!(!config.ensemble.use_historical_weights);
    assert_eq!(config.batch.max_concurrency, 3);
    assert_eq!(config.persistence.database_url, "sqlite::memory:");
}

#[test]
fn test_config_parse_error_names_the_key() {
    let error = load(&[("RSI_PERIOD", "fourteen")]).unwrap_err();
    let message = format!("{:#}", error);
    assert!(message.contains("RSI_PERIOD"));
}

#[test]
fn test_config_rejects_inverted_macd_periods() {
    assert!(load(&[("MACD_FAST_PERIOD", "30"), ("MACD_SLOW_PERIOD", "12")]).is_err());
}
