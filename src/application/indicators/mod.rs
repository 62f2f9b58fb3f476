//! Technical indicator library.
//!
//! Every function is pure over `&[f64]` inputs and returns `Option`: `None`
//! means the series is shorter than the indicator's window or the math
//! produced a non-finite value. Callers treat missing entries as "not
//! available" rather than as errors.

pub mod momentum;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use momentum::Stochastic;
pub use trend::Macd;
pub use volatility::BollingerBands;

use serde::{Deserialize, Serialize};

pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Window lengths for the indicator battery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    pub rsi_period: usize,
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub stochastic_period: usize,
    pub stochastic_smoothing: usize,
    pub williams_period: usize,
    pub cci_period: usize,
    pub adx_period: usize,
    pub vwap_period: usize,
    pub volatility_window: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast_period: 12,
            macd_slow_period: 26,
            macd_signal_period: 9,
            bollinger_period: 20,
            bollinger_k: 2.0,
            stochastic_period: 14,
            stochastic_smoothing: 3,
            williams_period: 14,
            cci_period: 20,
            adx_period: 14,
            vwap_period: 20,
            volatility_window: 30,
        }
    }
}

/// Indicator values computed from one price series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub last_price: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<Macd>,
    pub bollinger: Option<BollingerBands>,
    pub stochastic: Option<Stochastic>,
    pub williams_r: Option<f64>,
    pub cci: Option<f64>,
    pub adx: Option<f64>,
    pub obv: Option<f64>,
    pub vwap: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    /// Standard deviation of daily returns over the volatility window
    pub volatility: f64,
    pub points: usize,
}

impl IndicatorSnapshot {
    /// Computes the full battery; indicators whose window exceeds the series are left empty
    pub fn compute(prices: &[f64], volumes: &[f64], settings: &IndicatorSettings) -> Self {
        Self {
            last_price: prices.last().copied().and_then(finite),
            rsi: momentum::rsi(prices, settings.rsi_period),
            macd: trend::macd(
                prices,
                settings.macd_fast_period,
                settings.macd_slow_period,
                settings.macd_signal_period,
            ),
            bollinger: volatility::bollinger(
                prices,
                settings.bollinger_period,
                settings.bollinger_k,
            ),
            stochastic: momentum::stochastic(
                prices,
                settings.stochastic_period,
                settings.stochastic_smoothing,
            ),
            williams_r: momentum::williams_r(prices, settings.williams_period),
            cci: momentum::cci(prices, settings.cci_period),
            adx: trend::adx(prices, settings.adx_period),
            obv: volume::obv(prices, volumes),
            vwap: volume::vwap(prices, volumes, settings.vwap_period),
            sma_20: trend::sma(prices, 20),
            sma_50: trend::sma(prices, 50),
            ema_12: trend::ema(prices, 12),
            volatility: volatility::realized_volatility(prices, settings.volatility_window),
            points: prices.len(),
        }
    }

    /// Number of indicators that produced a value
    pub fn available_count(&self) -> usize {
        [
            self.rsi.is_some(),
            self.macd.is_some(),
            self.bollinger.is_some(),
            self.stochastic.is_some(),
            self.williams_r.is_some(),
            self.cci.is_some(),
            self.adx.is_some(),
            self.obv.is_some(),
            self.vwap.is_some(),
        ]
        .iter()
        .filter(|&&present| present)
        .count()
    }
}
