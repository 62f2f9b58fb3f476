use super::regression::{linear_fit, r_squared};
use super::{ForecastModel, ModelInput, finalize};
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{ModelForecast, ModelKind};
use serde_json::json;

/// Straight-line trend fitted over the whole series.
///
/// Confidence is the fit's R²; a flat series is fitted exactly and scores 1.
pub struct LinearTrendModel {
    trend_threshold: f64,
}

impl LinearTrendModel {
    pub fn new(trend_threshold: f64) -> Self {
        Self { trend_threshold }
    }
}

impl ForecastModel for LinearTrendModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Linear
    }

    fn min_points(&self) -> usize {
        3
    }

    fn forecast(
        &self,
        input: &ModelInput<'_>,
        horizon_days: u32,
    ) -> Result<ModelForecast, ForecastError> {
        let y = input.prices;
        let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();

        let (intercept, slope) = linear_fit(&x, y)
            .ok_or_else(|| ForecastError::numerical("linear", "degenerate time axis"))?;

        let fitted: Vec<f64> = x.iter().map(|xi| intercept + slope * xi).collect();
        let confidence = r_squared(y, &fitted);

        let target_x = (y.len() - 1) as f64 + horizon_days as f64;
        let predicted = intercept + slope * target_x;

        finalize(
            ModelKind::Linear,
            input,
            predicted,
            confidence,
            self.trend_threshold,
        )
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "degree": 1 })
    }
}
