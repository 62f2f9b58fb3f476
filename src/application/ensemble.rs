//! Confidence- and agreement-weighted combination of model forecasts.

use crate::domain::errors::ForecastError;
use crate::domain::forecast::{EnsembleForecast, ModelForecast, ModelKind, RiskLevel, Trend};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSettings {
    /// Minimum normalized weight any contributing model keeps
    pub weight_floor: f64,
    pub volatility_high: f64,
    pub volatility_medium: f64,
    pub agreement_high_risk: f64,
    pub agreement_medium_risk: f64,
}

impl Default for EnsembleSettings {
    fn default() -> Self {
        Self {
            weight_floor: 0.05,
            volatility_high: 0.05,
            volatility_medium: 0.02,
            agreement_high_risk: 0.5,
            agreement_medium_risk: 0.75,
        }
    }
}

/// Per-model multipliers derived from past assessed accuracy.
///
/// Factors live in [0.1, 1]; kinds without a factor weigh in at 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalWeights {
    factors: BTreeMap<ModelKind, f64>,
}

impl HistoricalWeights {
    pub const MIN_FACTOR: f64 = 0.1;
    pub const MAX_FACTOR: f64 = 1.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: ModelKind, factor: f64) {
        let factor = if factor.is_finite() {
            factor.clamp(Self::MIN_FACTOR, Self::MAX_FACTOR)
        } else {
            Self::MAX_FACTOR
        };
        self.factors.insert(kind, factor);
    }

    pub fn factor(&self, kind: ModelKind) -> f64 {
        self.factors.get(&kind).copied().unwrap_or(Self::MAX_FACTOR)
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn factors(&self) -> &BTreeMap<ModelKind, f64> {
        &self.factors
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnsembleCombiner {
    settings: EnsembleSettings,
}

impl EnsembleCombiner {
    pub fn new(settings: EnsembleSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EnsembleSettings {
        &self.settings
    }

    /// Combines the successful model forecasts of one request.
    ///
    /// Deterministic in its inputs. Fails with `InsufficientData` when no
    /// forecast is supplied.
    pub fn combine(
        &self,
        forecasts: &[ModelForecast],
        history: Option<&HistoricalWeights>,
    ) -> Result<EnsembleForecast, ForecastError> {
        if forecasts.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: 1,
                available: 0,
            });
        }

        let weights = self.weights(forecasts, history);

        let predicted_price: f64 = forecasts
            .iter()
            .zip(&weights)
            .map(|(f, w)| f.predicted_price * w)
            .sum();
        let prices: Vec<f64> = forecasts.iter().map(|f| f.predicted_price).collect();
        let (lowest, highest) = prices
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
                (lo.min(p), hi.max(p))
            });
        // Guard the convex combination against rounding drift
        let predicted_price = predicted_price.clamp(lowest, highest);

        let agreement_score = agreement(&prices);
        let mean_confidence = forecasts.iter().map(|f| f.confidence).mean();
        let confidence = (mean_confidence * agreement_score).clamp(0.0, 1.0);

        let volatility: f64 = forecasts
            .iter()
            .zip(&weights)
            .map(|(f, w)| f.volatility * w)
            .sum::<f64>()
            .max(0.0);

        Ok(EnsembleForecast {
            predicted_price,
            confidence,
            trend: majority_trend(forecasts),
            volatility,
            risk_level: self.risk_level(volatility, agreement_score),
            contributing_models: forecasts.to_vec(),
            weights,
            agreement_score,
        })
    }

    fn weights(&self, forecasts: &[ModelForecast], history: Option<&HistoricalWeights>) -> Vec<f64> {
        let raw: Vec<f64> = forecasts
            .iter()
            .map(|f| {
                let factor = history.map_or(1.0, |h| h.factor(f.model));
                (f.confidence * factor).max(0.0)
            })
            .collect();
        let total: f64 = raw.iter().sum();
        let n = forecasts.len() as f64;

        if total <= 0.0 || !total.is_finite() {
            return vec![1.0 / n; forecasts.len()];
        }

        let floor = self.settings.weight_floor.clamp(0.0, 1.0 / n);
        let floored: Vec<f64> = raw.iter().map(|r| (r / total).max(floor)).collect();
        let floored_total: f64 = floored.iter().sum();
        floored.iter().map(|w| w / floored_total).collect()
    }

    pub fn risk_level(&self, volatility: f64, agreement_score: f64) -> RiskLevel {
        let s = &self.settings;
        if volatility > s.volatility_high || agreement_score < s.agreement_high_risk {
            RiskLevel::High
        } else if volatility > s.volatility_medium || agreement_score < s.agreement_medium_risk {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// `1 - σ/μ` over the model prices, clamped to [0, 1]
fn agreement(prices: &[f64]) -> f64 {
    if prices.len() < 2 {
        return 1.0;
    }
    let mean = prices.iter().mean();
    if mean <= 0.0 || !mean.is_finite() {
        return 0.0;
    }
    let sigma = prices.iter().population_std_dev();
    let score = 1.0 - sigma / mean;
    if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 }
}

/// Most frequent trend label; a tie for first place resolves to stable
fn majority_trend(forecasts: &[ModelForecast]) -> Trend {
    let count = |trend: Trend| forecasts.iter().filter(|f| f.trend == trend).count();
    let mut tally = [
        (Trend::Up, count(Trend::Up)),
        (Trend::Down, count(Trend::Down)),
        (Trend::Stable, count(Trend::Stable)),
    ];
    tally.sort_by(|a, b| b.1.cmp(&a.1));

    if tally[0].1 == tally[1].1 {
        Trend::Stable
    } else {
        tally[0].0
    }
}
