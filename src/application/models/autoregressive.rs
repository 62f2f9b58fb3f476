use super::regression::least_squares;
use super::{ForecastModel, ModelInput, finalize};
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{ModelForecast, ModelKind};
use serde_json::json;

/// Ridge penalty keeping the normal equations solvable on flat or near-flat input
const RIDGE: f64 = 1e-6;

/// Largest allowed sum of |AR coefficients|; larger fits are shrunk to keep
/// iterated forecasts from exploding over long horizons
const MAX_COEFFICIENT_MASS: f64 = 0.95;

/// AR(p) on first differences, integrated back to a price ("ARIMA(p,1,0)-like")
pub struct AutoregressiveModel {
    max_order: usize,
    window: usize,
    trend_threshold: f64,
}

impl AutoregressiveModel {
    pub fn new(max_order: usize, window: usize, trend_threshold: f64) -> Self {
        Self {
            max_order: max_order.clamp(1, 5),
            window: window.max(10),
            trend_threshold,
        }
    }

    fn order_for(&self, differences: usize) -> usize {
        (differences / 4).clamp(1, self.max_order)
    }
}

struct ArFit {
    intercept: f64,
    coefficients: Vec<f64>,
    residual_variance: f64,
}

fn fit(diffs: &[f64], order: usize) -> Option<ArFit> {
    let mut rows = Vec::with_capacity(diffs.len().saturating_sub(order));
    let mut targets = Vec::with_capacity(rows.capacity());
    for t in order..diffs.len() {
        let mut row = Vec::with_capacity(order + 1);
        row.push(1.0);
        row.extend((1..=order).map(|lag| diffs[t - lag]));
        rows.push(row);
        targets.push(diffs[t]);
    }

    if rows.len() < order + 2 {
        return None;
    }

    let beta = least_squares(&rows, &targets, RIDGE)?;
    let intercept = beta[0];
    let mut coefficients = beta[1..].to_vec();

    let mass: f64 = coefficients.iter().map(|c| c.abs()).sum();
    if mass > MAX_COEFFICIENT_MASS {
        let scale = MAX_COEFFICIENT_MASS / mass;
        coefficients.iter_mut().for_each(|c| *c *= scale);
    }

    let residual_sum: f64 = rows
        .iter()
        .zip(&targets)
        .map(|(row, target)| {
            let estimate = intercept
                + row[1..]
                    .iter()
                    .zip(&coefficients)
                    .map(|(x, c)| x * c)
                    .sum::<f64>();
            (target - estimate).powi(2)
        })
        .sum();
    let dof = (rows.len() - order - 1).max(1) as f64;

    Some(ArFit {
        intercept,
        coefficients,
        residual_variance: residual_sum / dof,
    })
}

impl ForecastModel for AutoregressiveModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Autoregressive
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
        let diffs: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

        let order = self.order_for(diffs.len());
        let model = fit(&diffs, order)
            .ok_or_else(|| ForecastError::numerical("arima", "autoregression could not be fitted"))?;

        let mut history = diffs.clone();
        let mut price = prices[prices.len() - 1];
        for _ in 0..horizon_days {
            let n = history.len();
            let next = model.intercept
                + model
                    .coefficients
                    .iter()
                    .enumerate()
                    .map(|(lag, c)| c * history[n - 1 - lag])
                    .sum::<f64>();
            price += next;
            history.push(next);
        }

        let mean_price = prices.iter().sum::<f64>() / prices.len() as f64;
        let spread = model.residual_variance.max(0.0).sqrt() * (horizon_days as f64).sqrt();
        let confidence = if mean_price > 0.0 {
            0.9 * (1.0 - (spread / mean_price).min(1.0))
        } else {
            0.0
        };

        finalize(
            ModelKind::Autoregressive,
            input,
            price,
            confidence,
            self.trend_threshold,
        )
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "maxOrder": self.max_order, "window": self.window, "differencing": 1 })
    }
}
