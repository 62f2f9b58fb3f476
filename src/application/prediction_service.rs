//! Forecasting pipeline orchestration.
//!
//! `PredictionService` runs series -> indicators -> models -> ensemble ->
//! record store for one card, fans out over many cards with bounded
//! concurrency, and fronts the accuracy tracker and performance views.

use crate::application::accuracy_tracker::AccuracyTracker;
use crate::application::ensemble::{EnsembleCombiner, HistoricalWeights};
use crate::application::indicators::IndicatorSnapshot;
use crate::application::models::{ModelFailure, ModelInput, ModelRegistry};
use crate::application::performance;
use crate::config::{BatchEnvConfig, Config, EnsembleEnvConfig, ForecastEnvConfig};
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{EnsembleForecast, ModelKind, ModelType};
use crate::domain::market::{PriceSeries, Timeframe};
use crate::domain::ports::MarketDataSource;
use crate::domain::prediction::{
    AccuracyAssessment, ModelPerformanceStats, NewPredictionRecord, PredictionRecord,
    PredictionStatus,
};
use crate::domain::repositories::PredictionRepository;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decimal places kept on stored predicted prices
const PRICE_SCALE: u32 = 2;

/// Per-request forecast options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictOptions {
    pub model_type: ModelType,
    /// Store the forecast as a `PredictionRecord`
    pub persist: bool,
    /// Overrides the configured default when set
    pub use_historical_weights: Option<bool>,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            model_type: ModelType::Ensemble,
            persist: true,
            use_historical_weights: None,
        }
    }
}

/// Result of a single-card forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionOutcome {
    /// Id of the stored record; `None` when persistence was not requested
    pub prediction_id: Option<String>,
    pub card_id: String,
    pub model_type: ModelType,
    pub timeframe: Timeframe,
    pub forecast: EnsembleForecast,
    pub excluded_models: Vec<ModelFailure>,
    pub history_points: usize,
    pub prediction_date: DateTime<Utc>,
    pub target_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemError {
    pub card_id: String,
    pub error: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPredictionReport {
    pub successful: usize,
    pub failed: usize,
    /// Successful outcomes, in request order
    pub results: Vec<PredictionOutcome>,
    pub errors: Vec<BatchItemError>,
}

pub struct PredictionService {
    forecast_config: ForecastEnvConfig,
    ensemble_config: EnsembleEnvConfig,
    batch_config: BatchEnvConfig,
    market_data: Arc<dyn MarketDataSource>,
    repository: Arc<dyn PredictionRepository>,
    registry: ModelRegistry,
    combiner: EnsembleCombiner,
    tracker: AccuracyTracker,
}

impl PredictionService {
    pub fn new(
        config: &Config,
        market_data: Arc<dyn MarketDataSource>,
        repository: Arc<dyn PredictionRepository>,
    ) -> Self {
        let tracker = AccuracyTracker::new(
            market_data.clone(),
            repository.clone(),
            config.forecast.realized_price_tolerance_days,
        );

        Self {
            forecast_config: config.forecast.clone(),
            ensemble_config: config.ensemble.clone(),
            batch_config: config.batch.clone(),
            registry: ModelRegistry::with_defaults(&config.forecast.models),
            combiner: EnsembleCombiner::new(config.ensemble.settings.clone()),
            market_data,
            repository,
            tracker,
        }
    }

    /// Replaces the built-in model set
    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    async fn load_series(
        &self,
        card_id: &str,
        timeframe: Timeframe,
    ) -> Result<PriceSeries, ForecastError> {
        self.market_data
            .fetch_series(card_id, timeframe.lookback_points())
            .await
            .map_err(|e| {
                // Malformed history is bad input; retrying returns the same rows
                let invalid = e.chain().find_map(|cause| {
                    match cause.downcast_ref::<ForecastError>() {
                        Some(ForecastError::InvalidSeries(reason)) => Some(reason.clone()),
                        _ => None,
                    }
                });
                match invalid {
                    Some(reason) => ForecastError::InvalidSeries(reason),
                    None => ForecastError::DataUnavailable {
                        card_id: card_id.to_string(),
                        reason: format!("{e:#}"),
                    },
                }
            })
    }

    pub async fn predict(
        &self,
        card_id: &str,
        timeframe: Timeframe,
        options: PredictOptions,
    ) -> Result<PredictionOutcome, ForecastError> {
        self.predict_at(card_id, timeframe, options, Utc::now()).await
    }

    /// Forecasts one card as of `now`.
    ///
    /// Nothing is written unless the forecast succeeds end to end.
    pub async fn predict_at(
        &self,
        card_id: &str,
        timeframe: Timeframe,
        options: PredictOptions,
        now: DateTime<Utc>,
    ) -> Result<PredictionOutcome, ForecastError> {
        let series = self.load_series(card_id, timeframe).await?;
        series.ensure_min_len(self.forecast_config.min_history_points)?;

        let prices = series.closes();
        let volumes = series.volumes();
        let indicators = IndicatorSnapshot::compute(&prices, &volumes, &self.forecast_config.indicators);
        let input = ModelInput {
            prices: &prices,
            volumes: &volumes,
            indicators: &indicators,
        };

        let horizon = timeframe.horizon_days();
        let kinds = options.model_type.kinds();
        let run = self.registry.run(&input, horizon, &kinds);

        if run.forecasts.is_empty() {
            warn!(
                "No model produced a forecast for {} ({}): {:?}",
                card_id, timeframe, run.failures
            );
            return Err(self.no_forecast_error(&options, &kinds, series.len(), &run.failures));
        }

        let history = if options.model_type == ModelType::Ensemble
            && options
                .use_historical_weights
                .unwrap_or(self.ensemble_config.use_historical_weights)
        {
            match self.historical_weights().await {
                Ok(weights) if !weights.is_empty() => Some(weights),
                Ok(_) => None,
                Err(e) => {
                    warn!("Historical weights unavailable, using confidence only: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let forecast = self.combiner.combine(&run.forecasts, history.as_ref())?;
        let target_date = now + Duration::days(i64::from(horizon));

        let prediction_id = if options.persist {
            let record = self.build_record(
                card_id,
                timeframe,
                &options,
                &forecast,
                &run.failures,
                history.as_ref(),
                series.len(),
                now,
                target_date,
            )?;
            let id = self
                .repository
                .create(record)
                .await
                .map_err(ForecastError::Persistence)?;
            Some(id)
        } else {
            None
        };

        info!(
            "Forecast {} {} ({}): {:.2} conf={:.2} trend={} risk={} models={}/{}",
            card_id,
            timeframe,
            options.model_type,
            forecast.predicted_price,
            forecast.confidence,
            forecast.trend,
            forecast.risk_level,
            forecast.contributing_models.len(),
            kinds.len()
        );

        Ok(PredictionOutcome {
            prediction_id,
            card_id: card_id.to_string(),
            model_type: options.model_type,
            timeframe,
            forecast,
            excluded_models: run.failures,
            history_points: series.len(),
            prediction_date: now,
            target_date,
        })
    }

    /// Error reported when every requested model was excluded
    fn no_forecast_error(
        &self,
        options: &PredictOptions,
        kinds: &[ModelKind],
        available: usize,
        failures: &[ModelFailure],
    ) -> ForecastError {
        let registered: Vec<_> = kinds.iter().filter_map(|kind| self.registry.get(*kind)).collect();
        if registered.is_empty() {
            return ForecastError::InvalidModelType(format!(
                "{} has no registered model",
                options.model_type
            ));
        }

        let required = registered.iter().map(|model| model.min_points()).min().unwrap_or(0);
        if required > available {
            return ForecastError::InsufficientData {
                required,
                available,
            };
        }

        let reasons: Vec<String> = failures
            .iter()
            .map(|failure| format!("{}: {}", failure.model, failure.reason))
            .collect();
        ForecastError::numerical(options.model_type.as_str(), reasons.join("; "))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_record(
        &self,
        card_id: &str,
        timeframe: Timeframe,
        options: &PredictOptions,
        forecast: &EnsembleForecast,
        failures: &[ModelFailure],
        history: Option<&HistoricalWeights>,
        history_points: usize,
        now: DateTime<Utc>,
        target_date: DateTime<Utc>,
    ) -> Result<NewPredictionRecord, ForecastError> {
        let predicted_price = Decimal::from_f64(forecast.predicted_price)
            .map(|p| p.round_dp(PRICE_SCALE))
            .ok_or_else(|| {
                ForecastError::numerical(
                    options.model_type.as_str(),
                    format!("price {} not representable", forecast.predicted_price),
                )
            })?;

        let contributions: Vec<serde_json::Value> = forecast
            .contributing_models
            .iter()
            .zip(&forecast.weights)
            .map(|(m, weight)| {
                json!({
                    "model": m.model.as_str(),
                    "predictedPrice": m.predicted_price,
                    "confidence": m.confidence,
                    "trend": m.trend,
                    "weight": weight,
                })
            })
            .collect();

        let historical: serde_json::Map<String, serde_json::Value> = history
            .map(|h| {
                h.factors()
                    .iter()
                    .map(|(kind, factor)| (kind.as_str().to_string(), json!(factor)))
                    .collect()
            })
            .unwrap_or_default();

        let model_parameters = json!({
            "options": {
                "modelType": options.model_type,
                "useHistoricalWeights": history.is_some(),
            },
            "horizonDays": timeframe.horizon_days(),
            "historyPoints": history_points,
            "contributions": contributions,
            "excludedModels": failures,
            "agreementScore": forecast.agreement_score,
            "historicalWeights": historical,
            "models": self.registry.parameters(&options.model_type.kinds()),
        });

        Ok(NewPredictionRecord {
            card_id: card_id.to_string(),
            model_type: options.model_type,
            timeframe,
            predicted_price,
            confidence: forecast.confidence,
            trend: forecast.trend,
            volatility: forecast.volatility,
            risk_level: forecast.risk_level,
            prediction_date: now,
            target_date,
            model_parameters,
        })
    }

    pub async fn batch_predict(
        &self,
        card_ids: &[String],
        timeframe: Timeframe,
        batch_size: usize,
        options: PredictOptions,
    ) -> Result<BatchPredictionReport, ForecastError> {
        self.batch_predict_at(card_ids, timeframe, batch_size, options, Utc::now())
            .await
    }

    /// Forecasts many cards with at most `min(batch_size, max_concurrency)` in flight.
    ///
    /// Each card fails on its own; the report keeps request order.
    pub async fn batch_predict_at(
        &self,
        card_ids: &[String],
        timeframe: Timeframe,
        batch_size: usize,
        options: PredictOptions,
        now: DateTime<Utc>,
    ) -> Result<BatchPredictionReport, ForecastError> {
        let limits = &self.batch_config;
        if card_ids.is_empty() || card_ids.len() > limits.max_cards {
            return Err(ForecastError::InvalidBatch(format!(
                "expected 1..={} card ids, got {}",
                limits.max_cards,
                card_ids.len()
            )));
        }
        if batch_size == 0 || batch_size > limits.max_batch_size {
            return Err(ForecastError::InvalidBatch(format!(
                "batch size must be in 1..={}, got {}",
                limits.max_batch_size, batch_size
            )));
        }

        let in_flight = batch_size.min(limits.max_concurrency);
        debug!(
            "Batch forecast of {} cards ({}), {} in flight",
            card_ids.len(),
            timeframe,
            in_flight
        );

        let outcomes: Vec<(String, Result<PredictionOutcome, ForecastError>)> =
            stream::iter(card_ids.iter().map(|card_id| async move {
                let result = self.predict_at(card_id, timeframe, options, now).await;
                (card_id.clone(), result)
            }))
            .buffered(in_flight)
            .collect()
            .await;

        let mut report = BatchPredictionReport::default();
        for (card_id, result) in outcomes {
            match result {
                Ok(outcome) => report.results.push(outcome),
                Err(e) => {
                    warn!("Batch forecast failed for {}: {}", card_id, e);
                    report.errors.push(BatchItemError {
                        card_id,
                        retryable: e.is_retryable(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report.successful = report.results.len();
        report.failed = report.errors.len();

        info!(
            "Batch forecast done: {} succeeded, {} failed",
            report.successful, report.failed
        );
        Ok(report)
    }

    /// Indicator battery over the timeframe's lookback window
    pub async fn technical_analysis(
        &self,
        card_id: &str,
        timeframe: Timeframe,
    ) -> Result<IndicatorSnapshot, ForecastError> {
        let series = self.load_series(card_id, timeframe).await?;
        series.ensure_min_len(1)?;
        Ok(IndicatorSnapshot::compute(
            &series.closes(),
            &series.volumes(),
            &self.forecast_config.indicators,
        ))
    }

    pub async fn assess_accuracy(
        &self,
        prediction_id: &str,
    ) -> Result<Option<AccuracyAssessment>, ForecastError> {
        self.tracker.assess_at(prediction_id, Utc::now()).await
    }

    pub async fn assess_accuracy_at(
        &self,
        prediction_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AccuracyAssessment>, ForecastError> {
        self.tracker.assess_at(prediction_id, now).await
    }

    pub async fn prediction_status(
        &self,
        prediction_id: &str,
    ) -> Result<PredictionStatus, ForecastError> {
        self.tracker.status_at(prediction_id, Utc::now()).await
    }

    pub async fn prediction_status_at(
        &self,
        prediction_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PredictionStatus, ForecastError> {
        self.tracker.status_at(prediction_id, now).await
    }

    pub async fn model_performance_stats(&self) -> Result<Vec<ModelPerformanceStats>, ForecastError> {
        let assessed = self
            .repository
            .find_assessed()
            .await
            .map_err(ForecastError::Persistence)?;
        Ok(performance::aggregate(&assessed))
    }

    /// Ensemble weighting factors derived from single-model track records
    pub async fn historical_weights(&self) -> Result<HistoricalWeights, ForecastError> {
        let stats = self.model_performance_stats().await?;
        Ok(performance::historical_weights(
            &stats,
            self.ensemble_config.min_samples,
        ))
    }

    pub async fn predictions_for_card(
        &self,
        card_id: &str,
    ) -> Result<Vec<PredictionRecord>, ForecastError> {
        self.repository
            .find_by_card(card_id)
            .await
            .map_err(ForecastError::Persistence)
    }

    pub async fn delete_prediction(&self, prediction_id: &str) -> Result<(), ForecastError> {
        let deleted = self
            .repository
            .soft_delete(prediction_id)
            .await
            .map_err(ForecastError::Persistence)?;
        if !deleted {
            return Err(ForecastError::PredictionNotFound(prediction_id.to_string()));
        }
        info!("Soft-deleted prediction {}", prediction_id);
        Ok(())
    }
}
