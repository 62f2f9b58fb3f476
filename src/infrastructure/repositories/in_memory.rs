//! In-Memory Repository Implementations
//!
//! This module provides a thread-safe, in-memory implementation of
//! `PredictionRepository` defined in `domain::repositories`.
//!
//! # Features
//!
//! - **Thread-safe**: Uses `Arc<RwLock>` for concurrent access
//! - **Conditional updates**: `update_accuracy` checks and writes under one lock
//! - **Testing**: Counts accuracy writes so idempotence can be asserted
//!
//! # Limitations
//!
//! - Data is lost on application restart
//! - No persistence across multiple instances
//!
//! For persistence, use `SqlitePredictionRepository`.

use crate::domain::prediction::{NewPredictionRecord, PredictionRecord, RealizedOutcome};
use crate::domain::repositories::PredictionRepository;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory implementation of PredictionRepository
pub struct InMemoryPredictionRepository {
    records: Arc<RwLock<Vec<PredictionRecord>>>,
    accuracy_writes: AtomicUsize,
}

impl InMemoryPredictionRepository {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            accuracy_writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful `update_accuracy` calls
    pub fn accuracy_writes(&self) -> usize {
        self.accuracy_writes.load(Ordering::SeqCst)
    }

    /// Total records, deleted ones included
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryPredictionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PredictionRepository for InMemoryPredictionRepository {
    async fn create(&self, record: NewPredictionRecord) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.records.write().await.push(record.into_record(id.clone()));
        Ok(id)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PredictionRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.id == id && !r.is_deleted)
            .cloned())
    }

    async fn update_accuracy(&self, id: &str, outcome: RealizedOutcome) -> Result<bool> {
        let mut records = self.records.write().await;
        let Some(record) = records
            .iter_mut()
            .find(|r| r.id == id && !r.is_deleted && r.accuracy.is_none())
        else {
            return Ok(false);
        };

        record.accuracy = Some(outcome.accuracy);
        record.actual_price = Some(outcome.actual_price);
        record.realized_date = Some(outcome.realized_date);
        self.accuracy_writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn find_assessed(&self) -> Result<Vec<PredictionRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.is_assessed() && !r.is_deleted)
            .cloned()
            .collect())
    }

    async fn find_by_card(&self, card_id: &str) -> Result<Vec<PredictionRecord>> {
        let records = self.records.read().await;
        let mut found: Vec<PredictionRecord> = records
            .iter()
            .filter(|r| r.card_id == card_id && !r.is_deleted)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.prediction_date.cmp(&a.prediction_date));
        Ok(found)
    }

    async fn soft_delete(&self, id: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == id && !r.is_deleted) {
            Some(record) => {
                record.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forecast::{ModelType, RiskLevel, Trend};
    use crate::domain::market::Timeframe;
    use chrono::{Duration, NaiveDate, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn outcome(accuracy: Decimal) -> RealizedOutcome {
        RealizedOutcome {
            accuracy,
            actual_price: dec!(12),
            realized_date: NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
        }
    }

    fn new_record(card_id: &str) -> NewPredictionRecord {
        NewPredictionRecord {
            card_id: card_id.to_string(),
            model_type: ModelType::Ensemble,
            timeframe: Timeframe::OneDay,
            predicted_price: dec!(12.5),
            confidence: 0.5,
            trend: Trend::Stable,
            volatility: 0.0,
            risk_level: RiskLevel::Low,
            prediction_date: Utc::now(),
            target_date: Utc::now() + Duration::days(1),
            model_parameters: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_conditional_accuracy_update() {
        let repo = InMemoryPredictionRepository::new();
        let id = repo.create(new_record("gengar")).await.unwrap();

        assert!(repo.update_accuracy(&id, outcome(dec!(0.95))).await.unwrap());
        let mut second = outcome(dec!(0.10));
        second.actual_price = dec!(99);
        assert!(!repo.update_accuracy(&id, second).await.unwrap());
        assert_eq!(repo.accuracy_writes(), 1);

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.accuracy, Some(dec!(0.95)));
        assert_eq!(stored.actual_price, Some(dec!(12)));
        assert_eq!(stored.realized_date, NaiveDate::from_ymd_opt(2024, 2, 2));
        assert_eq!(repo.find_assessed().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_soft_delete() {
        let repo = InMemoryPredictionRepository::new();
        let id = repo.create(new_record("haunter")).await.unwrap();

        assert!(repo.soft_delete(&id).await.unwrap());
        assert!(!repo.soft_delete(&id).await.unwrap());
        assert!(repo.find_by_id(&id).await.unwrap().is_none());
        assert!(repo.find_by_card("haunter").await.unwrap().is_empty());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_find_by_card_newest_first() {
        let repo = InMemoryPredictionRepository::new();
        let mut older = new_record("gastly");
        older.prediction_date = Utc::now() - Duration::days(3);
        let old_id = repo.create(older).await.unwrap();
        let new_id = repo.create(new_record("gastly")).await.unwrap();
        repo.create(new_record("other")).await.unwrap();

        let found = repo.find_by_card("gastly").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, new_id);
        assert_eq!(found[1].id, old_id);
    }
}
