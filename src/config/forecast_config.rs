//! Forecast configuration parsing from environment variables.
//!
//! This module handles loading indicator windows and model parameters.

use super::EnvSource;
use crate::application::accuracy_tracker::DEFAULT_TOLERANCE_DAYS;
use crate::application::indicators::IndicatorSettings;
use crate::application::models::ModelSettings;
use crate::domain::market::MIN_FORECAST_POINTS;
use anyhow::{Result, ensure};

/// Forecast environment configuration
#[derive(Debug, Clone)]
pub struct ForecastEnvConfig {
    pub indicators: IndicatorSettings,
    pub models: ModelSettings,
    /// History length below which a forecast request is rejected
    pub min_history_points: usize,
    pub realized_price_tolerance_days: u32,
}

impl Default for ForecastEnvConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorSettings::default(),
            models: ModelSettings::default(),
            min_history_points: MIN_FORECAST_POINTS,
            realized_price_tolerance_days: DEFAULT_TOLERANCE_DAYS,
        }
    }
}

impl ForecastEnvConfig {
    pub fn from_source(source: &EnvSource<'_>) -> Result<Self> {
        let d = Self::default();
        let di = &d.indicators;
        let dm = &d.models;

        let indicators = IndicatorSettings {
            rsi_period: source.parse("RSI_PERIOD", di.rsi_period)?,
            macd_fast_period: source.parse("MACD_FAST_PERIOD", di.macd_fast_period)?,
            macd_slow_period: source.parse("MACD_SLOW_PERIOD", di.macd_slow_period)?,
            macd_signal_period: source.parse("MACD_SIGNAL_PERIOD", di.macd_signal_period)?,
            bollinger_period: source.parse("BOLLINGER_PERIOD", di.bollinger_period)?,
            bollinger_k: source.parse("BOLLINGER_K", di.bollinger_k)?,
            stochastic_period: source.parse("STOCHASTIC_PERIOD", di.stochastic_period)?,
            stochastic_smoothing: source.parse("STOCHASTIC_SMOOTHING", di.stochastic_smoothing)?,
            williams_period: source.parse("WILLIAMS_PERIOD", di.williams_period)?,
            cci_period: source.parse("CCI_PERIOD", di.cci_period)?,
            adx_period: source.parse("ADX_PERIOD", di.adx_period)?,
            vwap_period: source.parse("VWAP_PERIOD", di.vwap_period)?,
            volatility_window: source.parse("VOLATILITY_WINDOW", di.volatility_window)?,
        };

        ensure!(
            indicators.macd_fast_period < indicators.macd_slow_period,
            "MACD_FAST_PERIOD must be shorter than MACD_SLOW_PERIOD"
        );

        let models = ModelSettings {
            trend_threshold: source.parse("TREND_THRESHOLD", dm.trend_threshold)?,
            polynomial_degree: source.parse("POLYNOMIAL_DEGREE", dm.polynomial_degree)?,
            polynomial_window: source.parse("POLYNOMIAL_WINDOW", dm.polynomial_window)?,
            smoothing_window: source.parse("SMOOTHING_WINDOW", dm.smoothing_window)?,
            smoothing_beta: source.parse("SMOOTHING_BETA", dm.smoothing_beta)?,
            ar_max_order: source.parse("AR_MAX_ORDER", dm.ar_max_order)?,
            ar_window: source.parse("AR_WINDOW", dm.ar_window)?,
            sequence_half_life_days: source
                .parse("SEQUENCE_HALF_LIFE_DAYS", dm.sequence_half_life_days)?,
        };

        ensure!(
            models.trend_threshold >= 0.0,
            "TREND_THRESHOLD must be non-negative"
        );

        // The history floor never drops below the hard minimum
        let min_history_points = source
            .parse("MIN_HISTORY_POINTS", d.min_history_points)?
            .max(MIN_FORECAST_POINTS);

        Ok(Self {
            indicators,
            models,
            min_history_points,
            realized_price_tolerance_days: source.parse(
                "REALIZED_PRICE_TOLERANCE_DAYS",
                d.realized_price_tolerance_days,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_config_defaults() {
        let empty = |_: &str| -> Option<String> { None };
        let config = ForecastEnvConfig::from_source(&EnvSource::new(&empty)).unwrap();
        assert_eq!(config.indicators, IndicatorSettings::default());
        assert_eq!(config.models, ModelSettings::default());
        assert_eq!(config.min_history_points, 30);
        assert_eq!(config.realized_price_tolerance_days, 7);
    }

    #[test]
    fn test_history_floor_is_enforced() {
        let lookup = |key: &str| (key == "MIN_HISTORY_POINTS").then(|| "10".to_string());
        let config = ForecastEnvConfig::from_source(&EnvSource::new(&lookup)).unwrap();
        assert_eq!(config.min_history_points, MIN_FORECAST_POINTS);
    }
}
