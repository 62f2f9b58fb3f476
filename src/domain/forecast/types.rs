use crate::domain::errors::ForecastError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of forecasting strategies shipped with the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Linear,
    Polynomial,
    ExponentialSmoothing,
    /// Autoregression on the differenced series ("ARIMA-like")
    Autoregressive,
    /// Momentum/pattern heuristic standing in for a sequence network ("LSTM-like")
    SequenceHeuristic,
}

impl ModelKind {
    pub fn all() -> Vec<ModelKind> {
        vec![
            ModelKind::Linear,
            ModelKind::Polynomial,
            ModelKind::ExponentialSmoothing,
            ModelKind::Autoregressive,
            ModelKind::SequenceHeuristic,
        ]
    }

    /// Canonical name stored in `PredictionRecord::model_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Polynomial => "polynomial",
            ModelKind::ExponentialSmoothing => "exponential_smoothing",
            ModelKind::Autoregressive => "arima",
            ModelKind::SequenceHeuristic => "lstm",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(ModelKind::Linear),
            "polynomial" => Ok(ModelKind::Polynomial),
            "exponential_smoothing" | "exponential" | "holt" => {
                Ok(ModelKind::ExponentialSmoothing)
            }
            "arima" | "autoregressive" => Ok(ModelKind::Autoregressive),
            "lstm" | "deep_lstm" | "transformer" | "sequence_heuristic" => {
                Ok(ModelKind::SequenceHeuristic)
            }
            _ => Err(ForecastError::InvalidModelType(s.to_string())),
        }
    }
}

/// What a caller asks for: the full ensemble or a single model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelType {
    #[default]
    Ensemble,
    Single(ModelKind),
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Ensemble => "ensemble",
            ModelType::Single(kind) => kind.as_str(),
        }
    }

    /// Model kinds that take part in a forecast of this type
    pub fn kinds(&self) -> Vec<ModelKind> {
        match self {
            ModelType::Ensemble => ModelKind::all(),
            ModelType::Single(kind) => vec![*kind],
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ensemble") {
            return Ok(ModelType::Ensemble);
        }
        ModelKind::from_str(s).map(ModelType::Single)
    }
}

impl TryFrom<String> for ModelType {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ModelType::from_str(&value)
    }
}

impl From<ModelType> for String {
    fn from(value: ModelType) -> Self {
        value.as_str().to_string()
    }
}

/// Direction label attached to every forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    /// Classifies a relative change against a symmetric threshold
    pub fn from_change(relative_change: f64, threshold: f64) -> Self {
        if relative_change > threshold {
            Trend::Up
        } else if relative_change < -threshold {
            Trend::Down
        } else {
            Trend::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Trend::Up),
            "down" => Ok(Trend::Down),
            "stable" => Ok(Trend::Stable),
            _ => anyhow::bail!("Invalid trend: {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => anyhow::bail!("Invalid risk level: {}", s),
        }
    }
}

/// Output of one model for one (card, timeframe) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelForecast {
    pub model: ModelKind,
    pub predicted_price: f64,
    /// Self-reported confidence in [0, 1]
    pub confidence: f64,
    pub trend: Trend,
    /// Realized volatility of daily returns, >= 0
    pub volatility: f64,
}

/// Combined forecast produced by the ensemble combiner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleForecast {
    pub predicted_price: f64,
    pub confidence: f64,
    pub trend: Trend,
    pub volatility: f64,
    pub risk_level: RiskLevel,
    pub contributing_models: Vec<ModelForecast>,
    /// Normalized weight of each contributing model, same order as `contributing_models`
    pub weights: Vec<f64>,
    pub agreement_score: f64,
}
