//! Forecast model set.
//!
//! Each model implements [`ForecastModel`] and is registered in a
//! [`ModelRegistry`]. The registry runs the models a request asks for and
//! keeps failures apart from successes: a model that cannot forecast is
//! reported and excluded, never fatal on its own.

pub mod autoregressive;
pub mod exponential_smoothing;
pub mod linear;
pub mod polynomial;
pub mod regression;
pub mod sequence_heuristic;

pub use autoregressive::AutoregressiveModel;
pub use exponential_smoothing::ExponentialSmoothingModel;
pub use linear::LinearTrendModel;
pub use polynomial::PolynomialTrendModel;
pub use sequence_heuristic::SequenceHeuristicModel;

use crate::application::indicators::IndicatorSnapshot;
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{ModelForecast, ModelKind, Trend};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Upper bound on forecast horizons accepted by the models
pub const MAX_HORIZON_DAYS: u32 = 365;

/// Everything a model may consume for one forecast
#[derive(Debug, Clone, Copy)]
pub struct ModelInput<'a> {
    pub prices: &'a [f64],
    pub volumes: &'a [f64],
    pub indicators: &'a IndicatorSnapshot,
}

impl ModelInput<'_> {
    pub fn last_price(&self) -> Option<f64> {
        self.prices.last().copied()
    }
}

/// Tunables shared by the built-in models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Relative change beyond which a forecast is labelled up/down
    pub trend_threshold: f64,
    pub polynomial_degree: usize,
    pub polynomial_window: usize,
    pub smoothing_window: usize,
    pub smoothing_beta: f64,
    pub ar_max_order: usize,
    pub ar_window: usize,
    pub sequence_half_life_days: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            trend_threshold: 0.02,
            polynomial_degree: 2,
            polynomial_window: 90,
            smoothing_window: 120,
            smoothing_beta: 0.1,
            ar_max_order: 3,
            ar_window: 90,
            sequence_half_life_days: 10.0,
        }
    }
}

/// Common interface of every forecasting strategy
pub trait ForecastModel: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Fewest price points the model accepts
    fn min_points(&self) -> usize;

    fn forecast(
        &self,
        input: &ModelInput<'_>,
        horizon_days: u32,
    ) -> Result<ModelForecast, ForecastError>;

    /// Parameters recorded with each stored prediction
    fn parameters(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Validates a raw model output and attaches trend and volatility.
///
/// Non-finite or non-positive prices and non-finite confidences are rejected
/// as `NumericalInstability` so they never reach the ensemble.
pub(crate) fn finalize(
    kind: ModelKind,
    input: &ModelInput<'_>,
    predicted_price: f64,
    confidence: f64,
    trend_threshold: f64,
) -> Result<ModelForecast, ForecastError> {
    let last_price = input.last_price().ok_or(ForecastError::InsufficientData {
        required: 1,
        available: 0,
    })?;

    if !predicted_price.is_finite() {
        return Err(ForecastError::numerical(
            kind.as_str(),
            format!("non-finite prediction {predicted_price}"),
        ));
    }
    if predicted_price <= 0.0 {
        return Err(ForecastError::numerical(
            kind.as_str(),
            format!("non-positive price extrapolation {predicted_price:.4}"),
        ));
    }
    if !confidence.is_finite() {
        return Err(ForecastError::numerical(kind.as_str(), "non-finite confidence"));
    }

    let relative_change = if last_price > 0.0 {
        (predicted_price - last_price) / last_price
    } else {
        0.0
    };

    Ok(ModelForecast {
        model: kind,
        predicted_price,
        confidence: confidence.clamp(0.0, 1.0),
        trend: Trend::from_change(relative_change, trend_threshold),
        volatility: input.indicators.volatility.max(0.0),
    })
}

pub(crate) fn check_input(
    model: &dyn ForecastModel,
    input: &ModelInput<'_>,
    horizon_days: u32,
) -> Result<(), ForecastError> {
    if input.prices.len() < model.min_points() {
        return Err(ForecastError::InsufficientData {
            required: model.min_points(),
            available: input.prices.len(),
        });
    }
    if horizon_days == 0 || horizon_days > MAX_HORIZON_DAYS {
        return Err(ForecastError::numerical(
            model.kind().as_str(),
            format!("horizon {horizon_days} outside 1..={MAX_HORIZON_DAYS}"),
        ));
    }
    if input.prices.iter().any(|p| !p.is_finite()) {
        return Err(ForecastError::numerical(
            model.kind().as_str(),
            "non-finite price in input",
        ));
    }
    Ok(())
}

/// A model that was excluded from a forecast, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model: ModelKind,
    pub reason: String,
}

/// Outcome of running a set of models over one input
#[derive(Debug, Clone, Default)]
pub struct ModelRun {
    pub forecasts: Vec<ModelForecast>,
    pub failures: Vec<ModelFailure>,
}

/// Open set of forecasting strategies
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: Vec<Arc<dyn ForecastModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Registry holding the five built-in models
    pub fn with_defaults(settings: &ModelSettings) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LinearTrendModel::new(settings.trend_threshold)));
        registry.register(Arc::new(PolynomialTrendModel::new(
            settings.polynomial_degree,
            settings.polynomial_window,
            settings.trend_threshold,
        )));
        registry.register(Arc::new(ExponentialSmoothingModel::new(
            settings.smoothing_window,
            settings.smoothing_beta,
            settings.trend_threshold,
        )));
        registry.register(Arc::new(AutoregressiveModel::new(
            settings.ar_max_order,
            settings.ar_window,
            settings.trend_threshold,
        )));
        registry.register(Arc::new(SequenceHeuristicModel::new(
            settings.sequence_half_life_days,
            settings.trend_threshold,
        )));
        registry
    }

    /// Adds a model; a later registration of the same kind replaces the earlier one
    pub fn register(&mut self, model: Arc<dyn ForecastModel>) {
        self.models.retain(|m| m.kind() != model.kind());
        self.models.push(model);
    }

    pub fn get(&self, kind: ModelKind) -> Option<Arc<dyn ForecastModel>> {
        self.models.iter().find(|m| m.kind() == kind).cloned()
    }

    pub fn kinds(&self) -> Vec<ModelKind> {
        self.models.iter().map(|m| m.kind()).collect()
    }

    /// Parameters of the requested models, keyed by canonical model name
    pub fn parameters(&self, kinds: &[ModelKind]) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = kinds
            .iter()
            .filter_map(|kind| self.get(*kind))
            .map(|model| (model.kind().as_str().to_string(), model.parameters()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Runs every requested model; unregistered kinds are reported as failures
    pub fn run(&self, input: &ModelInput<'_>, horizon_days: u32, kinds: &[ModelKind]) -> ModelRun {
        let mut run = ModelRun::default();

        for &kind in kinds {
            let Some(model) = self.get(kind) else {
                run.failures.push(ModelFailure {
                    model: kind,
                    reason: "model not registered".to_string(),
                });
                continue;
            };

            let result = check_input(model.as_ref(), input, horizon_days)
                .and_then(|_| model.forecast(input, horizon_days));

            match result {
                Ok(forecast) => run.forecasts.push(forecast),
                Err(e) => {
                    debug!("Model {} excluded: {}", kind, e);
                    run.failures.push(ModelFailure {
                        model: kind,
                        reason: e.to_string(),
                    });
                }
            }
        }

        run
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_default_registry_has_all_kinds() {
        let registry = ModelRegistry::with_defaults(&ModelSettings::default());
        let mut kinds = registry.kinds();
        kinds.sort();
        assert_eq!(kinds, ModelKind::all());
    }

    #[test]
    fn test_run_on_flat_series() {
        let prices = vec![100.0; 30];
        let indicators = snapshot(&prices);
        let volumes = vec![10.0; 30];
        let input = ModelInput {
            prices: &prices,
            volumes: &volumes,
            indicators: &indicators,
        };
        let registry = ModelRegistry::with_defaults(&ModelSettings::default());

        let run = registry.run(&input, 30, &ModelKind::all());
        assert!(run.failures.is_empty(), "failures: {:?}", run.failures);
        assert_eq!(run.forecasts.len(), 5);
        for forecast in &run.forecasts {
            assert!(
                (forecast.predicted_price - 100.0).abs() < 1e-6,
                "{} predicted {}",
                forecast.model,
                forecast.predicted_price
            );
            assert_eq!(forecast.trend, Trend::Stable);
        }
    }

    #[test]
    fn test_short_series_excludes_models() {
        let prices = trending(12, 10.0, 0.5);
        let indicators = snapshot(&prices);
        let volumes = vec![1.0; prices.len()];
        let input = ModelInput {
            prices: &prices,
            volumes: &volumes,
            indicators: &indicators,
        };
        let registry = ModelRegistry::with_defaults(&ModelSettings::default());

        let run = registry.run(&input, 7, &ModelKind::all());
        assert!(
            run.failures
                .iter()
                .any(|f| f.model == ModelKind::SequenceHeuristic)
        );
        assert!(run.forecasts.iter().any(|f| f.model == ModelKind::Linear));
    }

    #[test]
    fn test_unregistered_kind_is_reported() {
        let prices = trending(40, 10.0, 0.1);
        let indicators = snapshot(&prices);
        let volumes = vec![1.0; prices.len()];
        let input = ModelInput {
            prices: &prices,
            volumes: &volumes,
            indicators: &indicators,
        };

        let run = ModelRegistry::new().run(&input, 7, &[ModelKind::Linear]);
        assert!(run.forecasts.is_empty());
        assert_eq!(run.failures.len(), 1);
    }

    #[test]
    fn test_invalid_horizon_rejected() {
        let prices = trending(40, 10.0, 0.1);
        let indicators = snapshot(&prices);
        let volumes = vec![1.0; prices.len()];
        let input = ModelInput {
            prices: &prices,
            volumes: &volumes,
            indicators: &indicators,
        };
        let registry = ModelRegistry::with_defaults(&ModelSettings::default());

        let run = registry.run(&input, 0, &[ModelKind::Linear]);
        assert_eq!(run.failures.len(), 1);
        let run = registry.run(&input, MAX_HORIZON_DAYS + 1, &[ModelKind::Linear]);
        assert_eq!(run.failures.len(), 1);
    }

    struct ConstantModel;

    impl ForecastModel for ConstantModel {
        fn kind(&self) -> ModelKind {
            ModelKind::Linear
        }

        fn min_points(&self) -> usize {
            1
        }

        fn forecast(
            &self,
            input: &ModelInput<'_>,
            _horizon_days: u32,
        ) -> Result<ModelForecast, ForecastError> {
            finalize(ModelKind::Linear, input, 42.0, 0.5, 0.02)
        }
    }

    #[test]
    fn test_register_replaces_same_kind() {
        let mut registry = ModelRegistry::with_defaults(&ModelSettings::default());
        registry.register(Arc::new(ConstantModel));
        assert_eq!(registry.kinds().len(), 5);

        let prices = trending(40, 10.0, 0.1);
        let indicators = snapshot(&prices);
        let volumes = vec![1.0; prices.len()];
        let input = ModelInput {
            prices: &prices,
            volumes: &volumes,
            indicators: &indicators,
        };
        let run = registry.run(&input, 7, &[ModelKind::Linear]);
        assert_eq!(run.forecasts[0].predicted_price, 42.0);
    }

    #[test]
    fn test_finalize_rejects_bad_outputs() {
        let prices = vec![10.0; 5];
        let indicators = snapshot(&prices);
        let input = ModelInput {
            prices: &prices,
            volumes: &prices,
            indicators: &indicators,
        };

        assert!(matches!(
            finalize(ModelKind::Linear, &input, f64::NAN, 0.5, 0.02),
            Err(ForecastError::NumericalInstability { .. })
        ));
        assert!(matches!(
            finalize(ModelKind::Linear, &input, -3.0, 0.5, 0.02),
            Err(ForecastError::NumericalInstability { .. })
        ));
        let clamped = finalize(ModelKind::Linear, &input, 12.0, 1.7, 0.02).unwrap();
        assert_eq!(clamped.confidence, 1.0);
        assert_eq!(clamped.trend, Trend::Up);
    }
}
