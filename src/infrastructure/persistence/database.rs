use anyhow::{Context, Result};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Shared SQLite pool with the forecasting schema applied
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Ensure the directory exists if it's a file path
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let in_memory = db_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
        }

        // Every connection to ":memory:" opens its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        // 1. Predictions Table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                id TEXT PRIMARY KEY,
                card_id TEXT NOT NULL,
                model_type TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                predicted_price TEXT NOT NULL,
                confidence REAL NOT NULL,
                trend TEXT NOT NULL,
                volatility REAL NOT NULL,
                risk_level TEXT NOT NULL,
                prediction_date INTEGER NOT NULL,
                target_date INTEGER NOT NULL,
                accuracy TEXT,
                actual_price TEXT,
                realized_date TEXT,
                model_parameters TEXT NOT NULL,
                is_deleted BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_predictions_card
            ON predictions (card_id, prediction_date);
            CREATE INDEX IF NOT EXISTS idx_predictions_assessed
            ON predictions (model_type, accuracy);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create predictions table")?;

        // 2. Price History Table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_history (
                card_id TEXT NOT NULL,
                date TEXT NOT NULL,
                close TEXT NOT NULL,
                volume TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                PRIMARY KEY (card_id, date)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create price_history table")?;

        info!("Database schema initialized.");
        Ok(())
    }
}
