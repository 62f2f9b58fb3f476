use crate::domain::forecast::ModelType;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal places kept when an accuracy value is stored
pub const ACCURACY_SCALE: u32 = 6;

/// Lifecycle of a stored prediction with respect to accuracy assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    /// Target date still in the future
    Pending,
    /// Target date passed but no realized price yet
    AwaitingData,
    /// Target date passed and a realized price exists
    Assessable,
    /// Accuracy stored; terminal
    Assessed,
}

impl PredictionStatus {
    pub fn resolve(
        target_date: DateTime<Utc>,
        now: DateTime<Utc>,
        already_assessed: bool,
        realized_available: bool,
    ) -> Self {
        if already_assessed {
            PredictionStatus::Assessed
        } else if now < target_date {
            PredictionStatus::Pending
        } else if realized_available {
            PredictionStatus::Assessable
        } else {
            PredictionStatus::AwaitingData
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyGrade {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl AccuracyGrade {
    /// Lower bounds are inclusive: 0.9 is excellent, 0.8 good, 0.7 fair
    pub fn from_accuracy(accuracy: Decimal) -> Self {
        if accuracy >= dec!(0.9) {
            AccuracyGrade::Excellent
        } else if accuracy >= dec!(0.8) {
            AccuracyGrade::Good
        } else if accuracy >= dec!(0.7) {
            AccuracyGrade::Fair
        } else {
            AccuracyGrade::Poor
        }
    }
}

impl fmt::Display for AccuracyGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccuracyGrade::Excellent => "excellent",
            AccuracyGrade::Good => "good",
            AccuracyGrade::Fair => "fair",
            AccuracyGrade::Poor => "poor",
        };
        f.write_str(label)
    }
}

/// Error metrics of one prediction against one realized price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyMetrics {
    pub absolute_error: Decimal,
    /// Error relative to the realized price, in percent
    pub percentage_error: Decimal,
    /// `max(0, 100 - percentage_error) / 100`, clamped to [0, 1]
    pub accuracy: Decimal,
}

impl AccuracyMetrics {
    /// Returns `None` when `actual` is not a positive price
    pub fn compute(predicted: Decimal, actual: Decimal) -> Option<Self> {
        if actual <= Decimal::ZERO {
            return None;
        }

        let absolute_error = (predicted - actual).abs();
        let percentage_error = absolute_error / actual * dec!(100);
        let accuracy = ((dec!(100) - percentage_error).max(Decimal::ZERO) / dec!(100))
            .min(Decimal::ONE)
            .round_dp(ACCURACY_SCALE);

        Some(Self {
            absolute_error,
            percentage_error,
            accuracy,
        })
    }

    pub fn grade(&self) -> AccuracyGrade {
        AccuracyGrade::from_accuracy(self.accuracy)
    }
}

/// Values written atomically when a prediction is assessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizedOutcome {
    pub accuracy: Decimal,
    pub actual_price: Decimal,
    pub realized_date: NaiveDate,
}

/// Result of `assess_accuracy`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyAssessment {
    pub prediction_id: String,
    pub card_id: String,
    pub model_type: ModelType,
    pub predicted_price: Decimal,
    pub actual_price: Decimal,
    pub absolute_error: Decimal,
    pub percentage_error: Decimal,
    pub accuracy: Decimal,
    pub grade: AccuracyGrade,
    pub target_date: DateTime<Utc>,
    pub realized_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_reference_scenario_is_excellent() {
        let metrics = AccuracyMetrics::compute(dec!(1750), dec!(1600)).unwrap();
        assert_eq!(metrics.absolute_error, dec!(150));
        assert_eq!(metrics.percentage_error, dec!(9.375));
        assert_eq!(metrics.accuracy, dec!(0.90625));
        assert_eq!(metrics.grade(), AccuracyGrade::Excellent);
    }

    #[test]
    fn test_grade_boundaries_are_inclusive() {
        assert_eq!(AccuracyGrade::from_accuracy(dec!(0.9)), AccuracyGrade::Excellent);
        assert_eq!(AccuracyGrade::from_accuracy(dec!(0.899999)), AccuracyGrade::Good);
        assert_eq!(AccuracyGrade::from_accuracy(dec!(0.8)), AccuracyGrade::Good);
        assert_eq!(AccuracyGrade::from_accuracy(dec!(0.7)), AccuracyGrade::Fair);
        assert_eq!(AccuracyGrade::from_accuracy(dec!(0.69)), AccuracyGrade::Poor);
    }

    #[test]
    fn test_accuracy_floors_at_zero() {
        let metrics = AccuracyMetrics::compute(dec!(500), dec!(100)).unwrap();
        assert_eq!(metrics.percentage_error, dec!(400));
        assert_eq!(metrics.accuracy, Decimal::ZERO);
        assert_eq!(metrics.grade(), AccuracyGrade::Poor);
    }

    #[test]
    fn test_exact_prediction() {
        let metrics = AccuracyMetrics::compute(dec!(42.10), dec!(42.10)).unwrap();
        assert_eq!(metrics.absolute_error, Decimal::ZERO);
        assert_eq!(metrics.accuracy, Decimal::ONE);
    }

    #[test]
    fn test_underestimate_is_symmetric_in_absolute_error() {
        let metrics = AccuracyMetrics::compute(dec!(80), dec!(100)).unwrap();
        assert_eq!(metrics.absolute_error, dec!(20));
        assert_eq!(metrics.accuracy, dec!(0.8));
        assert_eq!(metrics.grade(), AccuracyGrade::Good);
    }

    #[test]
    fn test_non_positive_actual_rejected() {
        assert!(AccuracyMetrics::compute(dec!(10), Decimal::ZERO).is_none());
    }

    #[test]
    fn test_status_transitions() {
        let now = Utc::now();
        let future = now + Duration::days(3);
        let past = now - Duration::days(3);

        assert_eq!(
            PredictionStatus::resolve(future, now, false, true),
            PredictionStatus::Pending
        );
        assert_eq!(
            PredictionStatus::resolve(past, now, false, false),
            PredictionStatus::AwaitingData
        );
        assert_eq!(
            PredictionStatus::resolve(past, now, false, true),
            PredictionStatus::Assessable
        );
        assert_eq!(
            PredictionStatus::resolve(future, now, true, false),
            PredictionStatus::Assessed
        );
    }
}
