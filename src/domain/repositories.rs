//! Repository Pattern Abstractions
//!
//! `PredictionRepository` is the persistence contract of the forecasting
//! engine. The engine never issues schema operations through it; it only
//! creates records, reads them back and fills `accuracy` once.
//!
//! Two implementations ship with the crate:
//! - `InMemoryPredictionRepository` for tests and development
//! - `SqlitePredictionRepository` backed by `sqlx`

use crate::domain::prediction::{NewPredictionRecord, PredictionRecord, RealizedOutcome};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// Persist a new record and return its id
    async fn create(&self, record: NewPredictionRecord) -> Result<String>;

    /// Find a non-deleted record by id
    async fn find_by_id(&self, id: &str) -> Result<Option<PredictionRecord>>;

    /// Store the accuracy and its realized price if no accuracy is set yet.
    ///
    /// Returns `false` when the record is missing, deleted or already assessed,
    /// in which case nothing is written.
    async fn update_accuracy(&self, id: &str, outcome: RealizedOutcome) -> Result<bool>;

    /// All non-deleted records with a stored accuracy
    async fn find_assessed(&self) -> Result<Vec<PredictionRecord>>;

    /// Non-deleted records of one card, newest first
    async fn find_by_card(&self, card_id: &str) -> Result<Vec<PredictionRecord>>;

    /// Flag a record as deleted; returns `false` if it did not exist
    async fn soft_delete(&self, id: &str) -> Result<bool>;
}
