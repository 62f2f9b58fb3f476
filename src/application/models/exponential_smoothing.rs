use super::{ForecastModel, ModelInput, finalize};
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{ModelForecast, ModelKind};
use serde_json::json;

const ALPHA_GRID: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];

/// Holt's double exponential smoothing (level + trend).
///
/// The level factor is picked from a fixed grid by one-step-ahead squared
/// error; the trend factor is fixed.
pub struct ExponentialSmoothingModel {
    window: usize,
    beta: f64,
    trend_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HoltState {
    level: f64,
    trend: f64,
    sse: f64,
}

fn holt(prices: &[f64], alpha: f64, beta: f64) -> HoltState {
    let mut level = prices[0];
    let mut trend = prices[1] - prices[0];
    let mut sse = 0.0;

    for &price in &prices[1..] {
        let expected = level + trend;
        sse += (price - expected).powi(2);

        let previous_level = level;
        level = alpha * price + (1.0 - alpha) * (level + trend);
        trend = beta * (level - previous_level) + (1.0 - beta) * trend;
    }

    HoltState { level, trend, sse }
}

impl ExponentialSmoothingModel {
    pub fn new(window: usize, beta: f64, trend_threshold: f64) -> Self {
        Self {
            window: window.max(10),
            beta: beta.clamp(0.01, 0.99),
            trend_threshold,
        }
    }

    fn best_fit(&self, prices: &[f64]) -> (f64, HoltState) {
        ALPHA_GRID
            .iter()
            .map(|&alpha| (alpha, holt(prices, alpha, self.beta)))
            .filter(|(_, state)| state.sse.is_finite())
            .min_by(|a, b| a.1.sse.total_cmp(&b.1.sse))
            .unwrap_or((ALPHA_GRID[0], holt(prices, ALPHA_GRID[0], self.beta)))
    }
}

impl ForecastModel for ExponentialSmoothingModel {
    fn kind(&self) -> ModelKind {
        ModelKind::ExponentialSmoothing
    }

    fn min_points(&self) -> usize {
        10
    }

    fn forecast(
        &self,
        input: &ModelInput<'_>,
        horizon_days: u32,
    ) -> Result<ModelForecast, ForecastError> {
        let start = input.prices.len().saturating_sub(self.window);
        let prices = &input.prices[start..];

        let (_alpha, state) = self.best_fit(prices);
        let h = horizon_days as f64;
        let predicted = state.level + h * state.trend;

        // Wider horizons and noisier series both erode confidence
        let volatility = input.indicators.volatility;
        let confidence = (1.0 - (volatility * h.sqrt()).min(0.9)) / (1.0 + h / 365.0);

        finalize(
            ModelKind::ExponentialSmoothing,
            input,
            predicted,
            confidence,
            self.trend_threshold,
        )
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "window": self.window, "beta": self.beta, "alphaGrid": ALPHA_GRID })
    }
}
