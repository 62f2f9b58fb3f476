use crate::domain::forecast::{ModelType, RiskLevel, Trend};
use crate::domain::market::Timeframe;
use crate::domain::prediction::{NewPredictionRecord, PredictionRecord, RealizedOutcome};
use crate::domain::repositories::PredictionRepository;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqlitePredictionRepository {
    pool: SqlitePool,
}

impl SqlitePredictionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &SqliteRow) -> Result<PredictionRecord> {
        let model_type: String = row.try_get("model_type")?;
        let timeframe: String = row.try_get("timeframe")?;
        let predicted_price: String = row.try_get("predicted_price")?;
        let trend: String = row.try_get("trend")?;
        let risk_level: String = row.try_get("risk_level")?;
        let accuracy: Option<String> = row.try_get("accuracy")?;
        let actual_price: Option<String> = row.try_get("actual_price")?;
        let realized_date: Option<String> = row.try_get("realized_date")?;
        let parameters: String = row.try_get("model_parameters")?;

        Ok(PredictionRecord {
            id: row.try_get("id")?,
            card_id: row.try_get("card_id")?,
            model_type: ModelType::from_str(&model_type)?,
            timeframe: Timeframe::from_str(&timeframe)?,
            predicted_price: Decimal::from_str(&predicted_price)
                .context("Invalid predicted_price")?,
            confidence: row.try_get("confidence")?,
            trend: Trend::from_str(&trend)?,
            volatility: row.try_get("volatility")?,
            risk_level: RiskLevel::from_str(&risk_level)?,
            prediction_date: timestamp(row.try_get("prediction_date")?)?,
            target_date: timestamp(row.try_get("target_date")?)?,
            accuracy: accuracy
                .map(|a| Decimal::from_str(&a))
                .transpose()
                .context("Invalid accuracy")?,
            actual_price: actual_price
                .map(|a| Decimal::from_str(&a))
                .transpose()
                .context("Invalid actual_price")?,
            realized_date: realized_date
                .map(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT))
                .transpose()
                .context("Invalid realized_date")?,
            model_parameters: serde_json::from_str(&parameters)
                .context("Invalid model_parameters JSON")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }

    fn map_rows(rows: Vec<SqliteRow>) -> Result<Vec<PredictionRecord>> {
        rows.iter().map(Self::map_row).collect()
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).context(format!("Invalid timestamp {}", secs))
}

#[async_trait]
impl PredictionRepository for SqlitePredictionRepository {
    async fn create(&self, record: NewPredictionRecord) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO predictions (
                id, card_id, model_type, timeframe, predicted_price, confidence, trend,
                volatility, risk_level, prediction_date, target_date, accuracy,
                model_parameters, is_deleted
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, 0)
            "#,
        )
        .bind(&id)
        .bind(&record.card_id)
        .bind(record.model_type.as_str())
        .bind(record.timeframe.as_str())
        .bind(record.predicted_price.to_string())
        .bind(record.confidence)
        .bind(record.trend.as_str())
        .bind(record.volatility)
        .bind(record.risk_level.as_str())
        .bind(record.prediction_date.timestamp())
        .bind(record.target_date.timestamp())
        .bind(serde_json::to_string(&record.model_parameters)?)
        .execute(&self.pool)
        .await
        .context("Failed to save prediction")?;

        info!("Persisted Prediction {} for {}", id, record.card_id);
        Ok(id)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PredictionRecord>> {
        let row = sqlx::query("SELECT * FROM predictions WHERE id = ? AND is_deleted = 0")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load prediction")?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn update_accuracy(&self, id: &str, outcome: RealizedOutcome) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE predictions SET accuracy = ?, actual_price = ?, realized_date = ?
            WHERE id = ? AND accuracy IS NULL AND is_deleted = 0
            "#,
        )
        .bind(outcome.accuracy.to_string())
        .bind(outcome.actual_price.to_string())
        .bind(outcome.realized_date.format(DATE_FORMAT).to_string())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update prediction accuracy")?;

        let updated = result.rows_affected() == 1;
        debug!("Accuracy update for {}: updated={}", id, updated);
        Ok(updated)
    }

    async fn find_assessed(&self) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM predictions
            WHERE accuracy IS NOT NULL AND is_deleted = 0
            ORDER BY prediction_date ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load assessed predictions")?;

        Self::map_rows(rows)
    }

    async fn find_by_card(&self, card_id: &str) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM predictions
            WHERE card_id = ? AND is_deleted = 0
            ORDER BY prediction_date DESC
            "#,
        )
        .bind(card_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load card predictions")?;

        Self::map_rows(rows)
    }

    async fn soft_delete(&self, id: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE predictions SET is_deleted = 1 WHERE id = ? AND is_deleted = 0")
                .bind(id)
                .execute(&self.pool)
                .await
                .context("Failed to delete prediction")?;

        Ok(result.rows_affected() == 1)
    }
}
