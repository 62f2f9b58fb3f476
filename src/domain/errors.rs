use thiserror::Error;

/// Errors raised by the forecasting engine.
///
/// Variants split into two families: bad input (the caller must change the
/// request) and transient failures (the same request may succeed later).
/// `is_retryable` exposes that split to callers.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid timeframe: {0}. Must be one of 1d, 7d, 30d, 90d, 180d, 365d")]
    InvalidTimeframe(String),

    #[error("Invalid model type: {0}")]
    InvalidModelType(String),

    #[error("Numerical instability in {model}: {reason}")]
    NumericalInstability { model: String, reason: String },

    #[error("Invalid price series: {0}")]
    InvalidSeries(String),

    #[error("Invalid batch request: {0}")]
    InvalidBatch(String),

    #[error("Prediction not found: {0}")]
    PredictionNotFound(String),

    #[error("Market data unavailable for {card_id}: {reason}")]
    DataUnavailable { card_id: String, reason: String },

    #[error("Persistence failure: {0:#}")]
    Persistence(#[source] anyhow::Error),
}

impl ForecastError {
    /// True when the failure is transient and the caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ForecastError::DataUnavailable { .. } | ForecastError::Persistence(_)
        )
    }

    pub fn numerical(model: impl Into<String>, reason: impl Into<String>) -> Self {
        ForecastError::NumericalInstability {
            model: model.into(),
            reason: reason.into(),
        }
    }
}
