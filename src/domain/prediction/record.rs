use crate::domain::forecast::{ModelType, RiskLevel, Trend};
use crate::domain::market::Timeframe;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Persisted forecast.
///
/// Every field except `accuracy` is fixed at creation. `accuracy` is filled
/// exactly once, together with the realized price it was scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub id: String,
    pub card_id: String,
    pub model_type: ModelType,
    pub timeframe: Timeframe,
    pub predicted_price: Decimal,
    pub confidence: f64,
    pub trend: Trend,
    pub volatility: f64,
    pub risk_level: RiskLevel,
    pub prediction_date: DateTime<Utc>,
    pub target_date: DateTime<Utc>,
    pub accuracy: Option<Decimal>,
    /// Realized close the accuracy was computed from
    pub actual_price: Option<Decimal>,
    pub realized_date: Option<NaiveDate>,
    pub model_parameters: serde_json::Value,
    pub is_deleted: bool,
}

impl PredictionRecord {
    pub fn is_assessed(&self) -> bool {
        self.accuracy.is_some()
    }
}

/// Field set handed to `PredictionRepository::create`; the store assigns the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPredictionRecord {
    pub card_id: String,
    pub model_type: ModelType,
    pub timeframe: Timeframe,
    pub predicted_price: Decimal,
    pub confidence: f64,
    pub trend: Trend,
    pub volatility: f64,
    pub risk_level: RiskLevel,
    pub prediction_date: DateTime<Utc>,
    pub target_date: DateTime<Utc>,
    pub model_parameters: serde_json::Value,
}

impl NewPredictionRecord {
    pub fn into_record(self, id: String) -> PredictionRecord {
        PredictionRecord {
            id,
            card_id: self.card_id,
            model_type: self.model_type,
            timeframe: self.timeframe,
            predicted_price: self.predicted_price,
            confidence: self.confidence,
            trend: self.trend,
            volatility: self.volatility,
            risk_level: self.risk_level,
            prediction_date: self.prediction_date,
            target_date: self.target_date,
            accuracy: None,
            actual_price: None,
            realized_date: None,
            model_parameters: self.model_parameters,
            is_deleted: false,
        }
    }
}
