use crate::domain::market::{PricePoint, PriceSeries};
use crate::domain::ports::MarketDataSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::info;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Market data source over the `price_history` table
pub struct SqliteMarketDataSource {
    pool: SqlitePool,
}

impl SqliteMarketDataSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upserts price points for one card; re-saving a date reactivates it
    pub async fn save_points(&self, card_id: &str, points: &[PricePoint]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for point in points {
            sqlx::query(
                r#"
                INSERT INTO price_history (card_id, date, close, volume, is_active)
                VALUES (?, ?, ?, ?, 1)
                ON CONFLICT(card_id, date) DO UPDATE SET
                    close = excluded.close,
                    volume = excluded.volume,
                    is_active = 1
                "#,
            )
            .bind(card_id)
            .bind(point.date.format(DATE_FORMAT).to_string())
            .bind(point.close.to_string())
            .bind(point.volume.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to save price point")?;
        }

        tx.commit().await?;
        info!("Persisted {} price points for {}", points.len(), card_id);
        Ok(())
    }

    /// Hides one day of history from forecasts without deleting it
    pub async fn deactivate(&self, card_id: &str, date: NaiveDate) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE price_history SET is_active = 0 WHERE card_id = ? AND date = ?",
        )
        .bind(card_id)
        .bind(date.format(DATE_FORMAT).to_string())
        .execute(&self.pool)
        .await
        .context("Failed to deactivate price point")?;
        Ok(result.rows_affected() == 1)
    }

    /// Cards with at least one active price point
    pub async fn card_ids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT card_id FROM price_history WHERE is_active = 1 ORDER BY card_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok(row.try_get::<String, _>("card_id")?))
            .collect()
    }

    fn map_row(row: &SqliteRow) -> Result<PricePoint> {
        let date: String = row.try_get("date")?;
        let close: String = row.try_get("close")?;
        let volume: String = row.try_get("volume")?;

        Ok(PricePoint::new(
            NaiveDate::parse_from_str(&date, DATE_FORMAT).context("Invalid price date")?,
            Decimal::from_str(&close).context("Invalid close")?,
            Decimal::from_str(&volume).context("Invalid volume")?,
        ))
    }
}

#[async_trait]
impl MarketDataSource for SqliteMarketDataSource {
    async fn fetch_series(&self, card_id: &str, max_points: usize) -> Result<PriceSeries> {
        let rows = sqlx::query(
            r#"
            SELECT date, close, volume FROM price_history
            WHERE card_id = ? AND is_active = 1
            ORDER BY date DESC
            LIMIT ?
            "#,
        )
        .bind(card_id)
        .bind(max_points as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load price history")?;

        if rows.is_empty() {
            anyhow::bail!("No price history for card {}", card_id);
        }

        let mut points = rows
            .iter()
            .map(Self::map_row)
            .collect::<Result<Vec<_>>>()?;
        points.reverse();

        Ok(PriceSeries::new(card_id, points)?)
    }

    async fn fetch_price_on_or_after(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>> {
        let row = sqlx::query(
            r#"
            SELECT date, close, volume FROM price_history
            WHERE card_id = ? AND is_active = 1 AND date >= ?
            ORDER BY date ASC
            LIMIT 1
            "#,
        )
        .bind(card_id)
        .bind(date.format(DATE_FORMAT).to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load realized price")?;

        row.as_ref().map(Self::map_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::Database;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    async fn source_with(points: usize) -> SqliteMarketDataSource {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let source = SqliteMarketDataSource::new(db.pool);
        let history: Vec<PricePoint> = (0..points)
            .map(|i| {
                PricePoint::new(
                    day(1) + Duration::days(i as i64),
                    Decimal::from(10 + i as i64),
                    dec!(2),
                )
            })
            .collect();
        source.save_points("umbreon", &history).await.unwrap();
        source
    }

    #[tokio::test]
    async fn test_fetch_most_recent_points_ascending() {
        let source = source_with(10).await;
        let series = source.fetch_series("umbreon", 4).await.unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.points()[0].date, day(7));
        assert_eq!(series.last().unwrap().date, day(10));
        assert_eq!(series.last().unwrap().close, dec!(19));
    }

    #[tokio::test]
    async fn test_unknown_card_fails() {
        let source = source_with(3).await;
        assert!(source.fetch_series("espeon", 10).await.is_err());
    }

    #[tokio::test]
    async fn test_inactive_points_are_skipped() {
        let source = source_with(5).await;
        assert!(source.deactivate("umbreon", day(3)).await.unwrap());

        let series = source.fetch_series("umbreon", 10).await.unwrap();
        assert_eq!(series.len(), 4);

        let realized = source
            .fetch_price_on_or_after("umbreon", day(3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(realized.date, day(4));
    }

    #[tokio::test]
    async fn test_no_price_after_history_end() {
        let source = source_with(5).await;
        let realized = source.fetch_price_on_or_after("umbreon", day(20)).await.unwrap();
        assert!(realized.is_none());
        assert_eq!(source.card_ids().await.unwrap(), vec!["umbreon".to_string()]);
    }
}
