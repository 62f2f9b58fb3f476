use crate::application::ensemble::HistoricalWeights;
use crate::domain::forecast::ModelType;
use crate::domain::prediction::{HIGH_ACCURACY_THRESHOLD, ModelPerformanceStats, PredictionRecord};
use rust_decimal::prelude::*;
use std::collections::BTreeMap;

/// Assessed records needed before a model's accuracy feeds the ensemble
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// Groups assessed, non-deleted records by model type and summarizes them.
///
/// Records without an accuracy or flagged as deleted are ignored. Output is
/// ordered by model type name.
pub fn aggregate(records: &[PredictionRecord]) -> Vec<ModelPerformanceStats> {
    let mut groups: BTreeMap<&'static str, (ModelType, Vec<(f64, f64)>)> = BTreeMap::new();

    for record in records.iter().filter(|r| !r.is_deleted) {
        let Some(accuracy) = record.accuracy.and_then(|a| a.to_f64()) else {
            continue;
        };
        groups
            .entry(record.model_type.as_str())
            .or_insert_with(|| (record.model_type, Vec::new()))
            .1
            .push((accuracy, record.confidence));
    }

    groups
        .into_values()
        .map(|(model_type, samples)| summarize(model_type, &samples))
        .collect()
}

fn summarize(model_type: ModelType, samples: &[(f64, f64)]) -> ModelPerformanceStats {
    let count = samples.len();
    let n = count as f64;
    let accuracies = samples.iter().map(|(a, _)| *a);

    ModelPerformanceStats {
        model_type,
        count,
        mean_accuracy: accuracies.clone().sum::<f64>() / n,
        mean_confidence: samples.iter().map(|(_, c)| c).sum::<f64>() / n,
        high_accuracy_rate: accuracies
            .clone()
            .filter(|a| *a >= HIGH_ACCURACY_THRESHOLD)
            .count() as f64
            / n,
        best_accuracy: accuracies.clone().fold(f64::NEG_INFINITY, f64::max),
        worst_accuracy: accuracies.fold(f64::INFINITY, f64::min),
    }
}

/// Builds ensemble weighting factors from single-model statistics.
///
/// Ensemble records never contribute; kinds with fewer than `min_samples`
/// assessments keep the neutral factor.
pub fn historical_weights(stats: &[ModelPerformanceStats], min_samples: usize) -> HistoricalWeights {
    let mut weights = HistoricalWeights::new();
    for entry in stats {
        if let ModelType::Single(kind) = entry.model_type
            && entry.count >= min_samples
        {
            weights.set(kind, entry.mean_accuracy);
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forecast::{ModelKind, RiskLevel, Trend};
    use crate::domain::market::Timeframe;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record(model_type: ModelType, accuracy: Option<Decimal>, confidence: f64) -> PredictionRecord {
        PredictionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            card_id: "card-1".to_string(),
            model_type,
            timeframe: Timeframe::SevenDays,
            predicted_price: dec!(10),
            confidence,
            trend: Trend::Stable,
            volatility: 0.01,
            risk_level: RiskLevel::Low,
            prediction_date: Utc::now(),
            target_date: Utc::now(),
            accuracy,
            actual_price: accuracy.map(|_| dec!(10)),
            realized_date: None,
            model_parameters: serde_json::Value::Null,
            is_deleted: false,
        }
    }

    #[test]
    fn test_aggregate_groups_by_model_type() {
        let linear = ModelType::Single(ModelKind::Linear);
        let records = vec![
            record(linear, Some(dec!(0.9)), 0.8),
            record(linear, Some(dec!(0.7)), 0.6),
            record(ModelType::Ensemble, Some(dec!(0.85)), 0.5),
            record(linear, None, 0.9),
        ];

        let stats = aggregate(&records);
        assert_eq!(stats.len(), 2);

        let ensemble = &stats[0];
        assert_eq!(ensemble.model_type, ModelType::Ensemble);
        assert_eq!(ensemble.count, 1);
        assert_eq!(ensemble.high_accuracy_rate, 1.0);

        let linear_stats = &stats[1];
        assert_eq!(linear_stats.count, 2);
        assert!((linear_stats.mean_accuracy - 0.8).abs() < 1e-12);
        assert!((linear_stats.mean_confidence - 0.7).abs() < 1e-12);
        assert_eq!(linear_stats.high_accuracy_rate, 0.5);
        assert_eq!(linear_stats.best_accuracy, 0.9);
        assert_eq!(linear_stats.worst_accuracy, 0.7);
    }

    #[test]
    fn test_deleted_records_are_ignored() {
        let mut deleted = record(ModelType::Ensemble, Some(dec!(0.1)), 0.5);
        deleted.is_deleted = true;
        assert!(aggregate(&[deleted]).is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let records = vec![record(ModelType::Ensemble, Some(dec!(0.8)), 0.5)];
        assert_eq!(aggregate(&records)[0].high_accuracy_rate, 1.0);
    }

    #[test]
    fn test_weights_need_enough_samples() {
        let polynomial = ModelType::Single(ModelKind::Polynomial);
        let linear = ModelType::Single(ModelKind::Linear);
        let mut records: Vec<_> = (0..5).map(|_| record(polynomial, Some(dec!(0.6)), 0.5)).collect();
        records.extend((0..4).map(|_| record(linear, Some(dec!(0.95)), 0.5)));
        records.extend((0..6).map(|_| record(ModelType::Ensemble, Some(dec!(0.05)), 0.5)));

        let weights = historical_weights(&aggregate(&records), DEFAULT_MIN_SAMPLES);
        assert!((weights.factor(ModelKind::Polynomial) - 0.6).abs() < 1e-12);
        assert_eq!(weights.factor(ModelKind::Linear), 1.0);
        assert_eq!(weights.factors().len(), 1);
    }

    #[test]
    fn test_weights_floor_poor_models() {
        let arima = ModelType::Single(ModelKind::Autoregressive);
        let records: Vec<_> = (0..5).map(|_| record(arima, Some(dec!(0.02)), 0.5)).collect();
        let weights = historical_weights(&aggregate(&records), DEFAULT_MIN_SAMPLES);
        assert_eq!(weights.factor(ModelKind::Autoregressive), 0.1);
    }
}
