use crate::domain::errors::ForecastError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Minimum history length required before any forecast may run
pub const MIN_FORECAST_POINTS: usize = 30;

/// One daily observation of a card's market price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Decimal,
    pub volume: Decimal,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: Decimal, volume: Decimal) -> Self {
        Self {
            date,
            close,
            volume,
        }
    }
}

/// Ordered price history of a single card.
///
/// Invariants enforced on construction:
/// - dates strictly ascending (no duplicates)
/// - close > 0
/// - volume >= 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    card_id: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(card_id: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, ForecastError> {
        let card_id = card_id.into();

        for point in &points {
            if point.close <= Decimal::ZERO {
                return Err(ForecastError::InvalidSeries(format!(
                    "{}: non-positive close {} on {}",
                    card_id, point.close, point.date
                )));
            }
            if point.volume < Decimal::ZERO {
                return Err(ForecastError::InvalidSeries(format!(
                    "{}: negative volume {} on {}",
                    card_id, point.volume, point.date
                )));
            }
        }

        if let Some(pair) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(ForecastError::InvalidSeries(format!(
                "{}: dates out of order or duplicated ({} then {})",
                card_id, pair[0].date, pair[1].date
            )));
        }

        Ok(Self { card_id, points })
    }

    pub fn card_id(&self) -> &str {
        &self.card_id
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Closing prices as f64, the numeric boundary for indicator and model math
    pub fn closes(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.close.to_f64().unwrap_or(0.0))
            .collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.volume.to_f64().unwrap_or(0.0))
            .collect()
    }

    /// Fails with `InsufficientData` when the series is shorter than `required`
    pub fn ensure_min_len(&self, required: usize) -> Result<(), ForecastError> {
        if self.points.len() < required {
            return Err(ForecastError::InsufficientData {
                required,
                available: self.points.len(),
            });
        }
        Ok(())
    }
}
