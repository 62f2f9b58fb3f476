use super::regression::{poly_eval, polyfit, r_squared};
use super::{ForecastModel, ModelInput, finalize};
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{ModelForecast, ModelKind};
use serde_json::json;

/// Quadratic or cubic trend over the most recent window.
///
/// Time is rescaled to [0, 1] across the window before fitting so the normal
/// equations stay well conditioned for long windows.
pub struct PolynomialTrendModel {
    degree: usize,
    window: usize,
    trend_threshold: f64,
}

impl PolynomialTrendModel {
    pub fn new(degree: usize, window: usize, trend_threshold: f64) -> Self {
        Self {
            degree: degree.clamp(2, 3),
            window: window.max(degree + 3),
            trend_threshold,
        }
    }
}

impl ForecastModel for PolynomialTrendModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Polynomial
    }

    fn min_points(&self) -> usize {
        self.degree + 3
    }

    fn forecast(
        &self,
        input: &ModelInput<'_>,
        horizon_days: u32,
    ) -> Result<ModelForecast, ForecastError> {
        let start = input.prices.len().saturating_sub(self.window);
        let y = &input.prices[start..];
        let span = (y.len() - 1) as f64;
        let t: Vec<f64> = (0..y.len()).map(|i| i as f64 / span).collect();

        let coefficients = polyfit(&t, y, self.degree).ok_or_else(|| {
            ForecastError::numerical("polynomial", "singular normal equations")
        })?;

        let fitted: Vec<f64> = t.iter().map(|&ti| poly_eval(&coefficients, ti)).collect();
        let confidence = r_squared(y, &fitted);

        let target_t = (span + horizon_days as f64) / span;
        let predicted = poly_eval(&coefficients, target_t);

        finalize(
            ModelKind::Polynomial,
            input,
            predicted,
            confidence,
            self.trend_threshold,
        )
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "degree": self.degree, "window": self.window })
    }
}
