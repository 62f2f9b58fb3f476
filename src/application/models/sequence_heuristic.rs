use super::{ForecastModel, ModelInput, finalize};
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{ModelForecast, ModelKind};
use serde_json::json;

/// Cap on the blended daily drift
const MAX_DAILY_DRIFT: f64 = 0.02;

/// Momentum / mean-reversion heuristic over engineered features.
///
/// Stands in for a sequence network behind the same `ForecastModel`
/// interface. Features: 5- and 20-day returns, MACD histogram, and, when the
/// series actually moves, RSI and Bollinger position as mean-reversion
/// tilts. The blended daily drift decays over `half_life_days`.
pub struct SequenceHeuristicModel {
    half_life_days: f64,
    trend_threshold: f64,
}

/// Signed contributions to the daily drift, kept apart for the agreement score
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct DriftComponents {
    short_momentum: f64,
    long_momentum: f64,
    macd: f64,
    rsi_reversion: f64,
    band_reversion: f64,
}

impl DriftComponents {
    fn as_array(&self) -> [f64; 5] {
        [
            self.short_momentum,
            self.long_momentum,
            self.macd,
            self.rsi_reversion,
            self.band_reversion,
        ]
    }

    fn total(&self) -> f64 {
        self.as_array().iter().sum::<f64>()
    }

    /// Share of non-zero components pointing the same way as the total
    fn agreement(&self) -> f64 {
        let total = self.total();
        let active: Vec<f64> = self
            .as_array()
            .into_iter()
            .filter(|c| c.abs() > 1e-12)
            .collect();
        if active.is_empty() || total.abs() <= 1e-12 {
            return 1.0;
        }
        let agreeing = active.iter().filter(|c| c.signum() == total.signum()).count();
        agreeing as f64 / active.len() as f64
    }
}

fn trailing_return(prices: &[f64], lookback: usize) -> f64 {
    if prices.len() <= lookback {
        return 0.0;
    }
    let last = prices[prices.len() - 1];
    let base = prices[prices.len() - 1 - lookback];
    if base > 0.0 { last / base - 1.0 } else { 0.0 }
}

impl SequenceHeuristicModel {
    pub fn new(half_life_days: f64, trend_threshold: f64) -> Self {
        Self {
            half_life_days: if half_life_days > 0.0 { half_life_days } else { 10.0 },
            trend_threshold,
        }
    }

    fn components(&self, input: &ModelInput<'_>) -> DriftComponents {
        let prices = input.prices;
        let indicators = input.indicators;
        let last = prices[prices.len() - 1];

        let mut components = DriftComponents {
            short_momentum: 0.6 * trailing_return(prices, 5) / 5.0,
            long_momentum: 0.4 * trailing_return(prices, 20) / 20.0,
            ..Default::default()
        };

        if let Some(macd) = indicators.macd
            && last > 0.0
        {
            components.macd = (macd.histogram / last).clamp(-0.005, 0.005) * 0.5;
        }

        // A series that never moves is neither overbought nor oversold
        if indicators.volatility > 0.0 {
            if let Some(rsi) = indicators.rsi {
                if rsi > 70.0 {
                    components.rsi_reversion = -(rsi - 70.0) / 30.0 * 0.002;
                } else if rsi < 30.0 {
                    components.rsi_reversion = (30.0 - rsi) / 30.0 * 0.002;
                }
            }
            if let Some(bands) = indicators.bollinger {
                let position = bands.percent_b(last);
                if position > 1.0 {
                    components.band_reversion = -0.001;
                } else if position < 0.0 {
                    components.band_reversion = 0.001;
                }
            }
        }

        components
    }
}

impl ForecastModel for SequenceHeuristicModel {
    fn kind(&self) -> ModelKind {
        ModelKind::SequenceHeuristic
    }

    fn min_points(&self) -> usize {
        21
    }

    fn forecast(
        &self,
        input: &ModelInput<'_>,
        horizon_days: u32,
    ) -> Result<ModelForecast, ForecastError> {
        let last = input.prices[input.prices.len() - 1];
        let components = self.components(input);
        let daily_drift = components.total().clamp(-MAX_DAILY_DRIFT, MAX_DAILY_DRIFT);

        let h = horizon_days as f64;
        let effective_days = self.half_life_days * (1.0 - (-h / self.half_life_days).exp());
        let predicted = last * (daily_drift * effective_days).exp();

        let volatility = input.indicators.volatility;
        let confidence =
            0.65 * components.agreement() / (1.0 + 10.0 * volatility) / (1.0 + h / 365.0);

        finalize(
            ModelKind::SequenceHeuristic,
            input,
            predicted,
            confidence,
            self.trend_threshold,
        )
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "halfLifeDays": self.half_life_days,
            "maxDailyDrift": MAX_DAILY_DRIFT,
            "features": ["return5", "return20", "macdHistogram", "rsi", "bollingerPosition"],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{snapshot, trending};
    use super::*;
    use crate::domain::forecast::Trend;

    fn run(prices: &[f64], horizon: u32) -> ModelForecast {
        let indicators = snapshot(prices);
        let volumes = vec![1.0; prices.len()];
        let input = ModelInput {
            prices,
            volumes: &volumes,
            indicators: &indicators,
        };
        SequenceHeuristicModel::new(10.0, 0.02)
            .forecast(&input, horizon)
            .unwrap()
    }

    #[test]
    fn test_flat_series_has_no_drift() {
        let forecast = run(&[100.0; 30], 30);
        assert_eq!(forecast.predicted_price, 100.0);
        assert_eq!(forecast.trend, Trend::Stable);
    }

    #[test]
    fn test_momentum_continues_uptrend() {
        let prices = trending(60, 50.0, 1.0);
        let forecast = run(&prices, 30);
        assert!(forecast.predicted_price > 109.0);
        assert_eq!(forecast.trend, Trend::Up);
    }

    #[test]
    fn test_momentum_continues_downtrend() {
        let prices = trending(60, 200.0, -1.0);
        let forecast = run(&prices, 30);
        assert!(forecast.predicted_price < 141.0);
        assert_eq!(forecast.trend, Trend::Down);
    }

    #[test]
    fn test_drift_is_damped_over_long_horizons() {
        let prices = trending(60, 50.0, 1.0);
        let month = run(&prices, 30).predicted_price;
        let year = run(&prices, 365).predicted_price;
        // Effective horizon saturates near the half-life
        assert!(year > month);
        assert!(year / month < 1.05);
    }

    #[test]
    fn test_agreement_score() {
        let aligned = DriftComponents {
            short_momentum: 0.01,
            long_momentum: 0.002,
            ..Default::default()
        };
        assert_eq!(aligned.agreement(), 1.0);

        let split = DriftComponents {
            short_momentum: 0.01,
            rsi_reversion: -0.002,
            ..Default::default()
        };
        assert_eq!(split.agreement(), 0.5);

        assert_eq!(DriftComponents::default().agreement(), 1.0);
    }
}
