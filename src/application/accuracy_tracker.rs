use crate::domain::errors::ForecastError;
use crate::domain::market::PricePoint;
use crate::domain::ports::MarketDataSource;
use crate::domain::prediction::{
    AccuracyAssessment, AccuracyGrade, AccuracyMetrics, PredictionRecord, PredictionStatus,
    RealizedOutcome,
};
use crate::domain::repositories::PredictionRepository;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default window after the target date in which a realized price is accepted
pub const DEFAULT_TOLERANCE_DAYS: u32 = 7;

/// Scores stored predictions against realized prices.
///
/// A record moves `pending -> assessable -> assessed`; a record whose target
/// date has passed without market data is `awaiting_data`. Accuracy is
/// written through the repository's conditional update, so a record is
/// scored at most once even with concurrent callers. The realized price is
/// stored with the accuracy, so an assessed record never consults market data
/// again.
pub struct AccuracyTracker {
    market_data: Arc<dyn MarketDataSource>,
    repository: Arc<dyn PredictionRepository>,
    tolerance_days: u32,
}

impl AccuracyTracker {
    pub fn new(
        market_data: Arc<dyn MarketDataSource>,
        repository: Arc<dyn PredictionRepository>,
        tolerance_days: u32,
    ) -> Self {
        Self {
            market_data,
            repository,
            tolerance_days,
        }
    }

    async fn load(&self, prediction_id: &str) -> Result<PredictionRecord, ForecastError> {
        self.repository
            .find_by_id(prediction_id)
            .await
            .map_err(ForecastError::Persistence)?
            .ok_or_else(|| ForecastError::PredictionNotFound(prediction_id.to_string()))
    }

    /// First price on or after the target date, if it falls inside the tolerance window
    async fn realized_price(
        &self,
        record: &PredictionRecord,
    ) -> Result<Option<PricePoint>, ForecastError> {
        let target = record.target_date.date_naive();
        let latest = target + Duration::days(i64::from(self.tolerance_days));

        let point = self
            .market_data
            .fetch_price_on_or_after(&record.card_id, target)
            .await
            .map_err(|e| ForecastError::DataUnavailable {
                card_id: record.card_id.clone(),
                reason: format!("{e:#}"),
            })?;

        Ok(point.filter(|p| p.date <= latest))
    }

    pub async fn status_at(
        &self,
        prediction_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PredictionStatus, ForecastError> {
        let record = self.load(prediction_id).await?;
        if record.is_assessed() || now < record.target_date {
            return Ok(PredictionStatus::resolve(
                record.target_date,
                now,
                record.is_assessed(),
                false,
            ));
        }

        let realized = self.realized_price(&record).await?;
        Ok(PredictionStatus::resolve(
            record.target_date,
            now,
            false,
            realized.is_some(),
        ))
    }

    /// Assesses one prediction as of `now`.
    ///
    /// Returns `Ok(None)` while the prediction is pending or awaiting data.
    /// Repeated calls on an assessed record return the stored assessment and
    /// write nothing.
    pub async fn assess_at(
        &self,
        prediction_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AccuracyAssessment>, ForecastError> {
        let record = self.load(prediction_id).await?;

        if record.is_assessed() {
            debug!("Prediction {} already assessed", record.id);
            return stored_assessment(&record).map(Some);
        }

        if now < record.target_date {
            debug!(
                "Prediction {} pending until {}",
                record.id, record.target_date
            );
            return Ok(None);
        }

        let Some(point) = self.realized_price(&record).await? else {
            debug!(
                "Prediction {} awaiting realized price for {}",
                record.id, record.card_id
            );
            return Ok(None);
        };

        let assessment = build_assessment(&record, point.close, point.date, None)?;
        let outcome = RealizedOutcome {
            accuracy: assessment.accuracy,
            actual_price: point.close,
            realized_date: point.date,
        };
        let written = self
            .repository
            .update_accuracy(&record.id, outcome)
            .await
            .map_err(ForecastError::Persistence)?;

        if written {
            info!(
                "Assessed prediction {} ({}): predicted {} actual {} accuracy {} ({})",
                record.id,
                record.model_type,
                record.predicted_price,
                point.close,
                assessment.accuracy,
                assessment.grade
            );
            return Ok(Some(assessment));
        }

        // Lost the race to another assessor, or the record was deleted meanwhile
        let current = self.load(prediction_id).await?;
        if current.is_assessed() {
            warn!(
                "Prediction {} was assessed concurrently; keeping the stored result",
                record.id
            );
            Ok(Some(stored_assessment(&current)?))
        } else {
            Err(ForecastError::PredictionNotFound(prediction_id.to_string()))
        }
    }
}

/// Rebuilds an assessment from the record alone
fn stored_assessment(record: &PredictionRecord) -> Result<AccuracyAssessment, ForecastError> {
    let (Some(accuracy), Some(actual_price), Some(realized_date)) =
        (record.accuracy, record.actual_price, record.realized_date)
    else {
        return Err(ForecastError::Persistence(anyhow::anyhow!(
            "Prediction {} has an accuracy but no stored realized price",
            record.id
        )));
    };
    build_assessment(record, actual_price, realized_date, Some(accuracy))
}

fn build_assessment(
    record: &PredictionRecord,
    actual_price: Decimal,
    realized_date: NaiveDate,
    stored_accuracy: Option<Decimal>,
) -> Result<AccuracyAssessment, ForecastError> {
    let metrics = AccuracyMetrics::compute(record.predicted_price, actual_price).ok_or_else(|| {
        ForecastError::DataUnavailable {
            card_id: record.card_id.clone(),
            reason: format!("non-positive realized price {} on {}", actual_price, realized_date),
        }
    })?;
    let accuracy = stored_accuracy.unwrap_or(metrics.accuracy);

    Ok(AccuracyAssessment {
        prediction_id: record.id.clone(),
        card_id: record.card_id.clone(),
        model_type: record.model_type,
        predicted_price: record.predicted_price,
        actual_price,
        absolute_error: metrics.absolute_error,
        percentage_error: metrics.percentage_error,
        accuracy,
        grade: AccuracyGrade::from_accuracy(accuracy),
        target_date: record.target_date,
        realized_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forecast::{ModelType, RiskLevel, Trend};
    use crate::domain::market::{PriceSeries, Timeframe};
    use crate::domain::prediction::NewPredictionRecord;
    use crate::infrastructure::mock::InMemoryMarketDataSource;
    use crate::infrastructure::repositories::InMemoryPredictionRepository;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn at(d: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day(d).and_hms_opt(12, 0, 0).unwrap())
    }

    struct Fixture {
        tracker: AccuracyTracker,
        market: Arc<InMemoryMarketDataSource>,
        repository: Arc<InMemoryPredictionRepository>,
    }

    fn fixture() -> Fixture {
        let market = Arc::new(InMemoryMarketDataSource::new());
        let repository = Arc::new(InMemoryPredictionRepository::new());
        let tracker = AccuracyTracker::new(market.clone(), repository.clone(), DEFAULT_TOLERANCE_DAYS);
        Fixture {
            tracker,
            market,
            repository,
        }
    }

    async fn store(repository: &InMemoryPredictionRepository, predicted: Decimal, target: u32) -> String {
        repository
            .create(NewPredictionRecord {
                card_id: "charizard".to_string(),
                model_type: ModelType::Ensemble,
                timeframe: Timeframe::SevenDays,
                predicted_price: predicted,
                confidence: 0.7,
                trend: Trend::Up,
                volatility: 0.01,
                risk_level: RiskLevel::Low,
                prediction_date: at(1),
                target_date: at(target),
                model_parameters: serde_json::Value::Null,
            })
            .await
            .unwrap()
    }

    async fn realize(market: &InMemoryMarketDataSource, date: NaiveDate, close: Decimal) {
        let series = PriceSeries::new(
            "charizard",
            vec![PricePoint::new(date, close, dec!(3))],
        )
        .unwrap();
        market.set_series(series).await;
    }

    #[tokio::test]
    async fn test_pending_before_target() {
        let f = fixture();
        let id = store(&f.repository, dec!(1750), 8).await;
        realize(&f.market, day(8), dec!(1600)).await;

        assert!(f.tracker.assess_at(&id, at(5)).await.unwrap().is_none());
        assert_eq!(
            f.tracker.status_at(&id, at(5)).await.unwrap(),
            PredictionStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_awaiting_data_after_target() {
        let f = fixture();
        let id = store(&f.repository, dec!(1750), 8).await;

        assert!(f.tracker.assess_at(&id, at(10)).await.unwrap().is_none());
        assert_eq!(
            f.tracker.status_at(&id, at(10)).await.unwrap(),
            PredictionStatus::AwaitingData
        );
    }

    #[tokio::test]
    async fn test_assess_reference_case_once() {
        let f = fixture();
        let id = store(&f.repository, dec!(1750), 8).await;
        realize(&f.market, day(9), dec!(1600)).await;

        assert_eq!(
            f.tracker.status_at(&id, at(10)).await.unwrap(),
            PredictionStatus::Assessable
        );

        let first = f.tracker.assess_at(&id, at(10)).await.unwrap().unwrap();
        assert_eq!(first.absolute_error, dec!(150));
        assert_eq!(first.percentage_error, dec!(9.375));
        assert_eq!(first.accuracy, dec!(0.90625));
        assert_eq!(first.grade, AccuracyGrade::Excellent);
        assert_eq!(first.realized_date, day(9));

        let second = f.tracker.assess_at(&id, at(20)).await.unwrap().unwrap();
        assert_eq!(second.accuracy, first.accuracy);
        assert_eq!(f.repository.accuracy_writes(), 1);
        assert_eq!(
            f.tracker.status_at(&id, at(20)).await.unwrap(),
            PredictionStatus::Assessed
        );
    }

    #[tokio::test]
    async fn test_reassessment_ignores_later_market_changes() {
        let f = fixture();
        let id = store(&f.repository, dec!(1750), 8).await;
        realize(&f.market, day(9), dec!(1600)).await;
        let first = f.tracker.assess_at(&id, at(10)).await.unwrap().unwrap();

        // A backfilled point now sits between the target date and the original realized one
        let backfilled = PriceSeries::new(
            "charizard",
            vec![
                PricePoint::new(day(8), dec!(1000), dec!(3)),
                PricePoint::new(day(9), dec!(1600), dec!(3)),
            ],
        )
        .unwrap();
        f.market.set_series(backfilled).await;
        let second = f.tracker.assess_at(&id, at(11)).await.unwrap().unwrap();
        assert_eq!(second, first);

        // Realized history removed, then the whole source goes down
        realize(&f.market, day(1), dec!(1)).await;
        assert_eq!(f.tracker.assess_at(&id, at(12)).await.unwrap().unwrap(), first);
        f.market.set_unavailable("charizard").await;
        let third = f.tracker.assess_at(&id, at(12)).await.unwrap().unwrap();
        assert_eq!(third.actual_price, dec!(1600));
        assert_eq!(third.absolute_error, dec!(150));
        assert_eq!(third.realized_date, day(9));
        assert_eq!(f.repository.accuracy_writes(), 1);
    }

    #[tokio::test]
    async fn test_price_outside_tolerance_is_ignored() {
        let f = fixture();
        let id = store(&f.repository, dec!(100), 8).await;
        realize(&f.market, day(20), dec!(100)).await;

        assert!(f.tracker.assess_at(&id, at(25)).await.unwrap().is_none());
        assert_eq!(f.repository.accuracy_writes(), 0);
    }

    #[tokio::test]
    async fn test_unknown_prediction() {
        let f = fixture();
        let result = f.tracker.assess_at("missing", at(10)).await;
        assert!(matches!(result, Err(ForecastError::PredictionNotFound(_))));
    }

    #[tokio::test]
    async fn test_market_outage_is_retryable() {
        let f = fixture();
        let id = store(&f.repository, dec!(100), 8).await;
        f.market.set_unavailable("charizard").await;

        let error = f.tracker.assess_at(&id, at(10)).await.unwrap_err();
        assert!(error.is_retryable());
    }
}
