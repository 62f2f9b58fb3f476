//! cardcast operator CLI
//!
//! Drives the forecasting engine against the SQLite store configured by
//! `DATABASE_URL`.

use anyhow::{Context, Result};
use cardcast::application::prediction_service::{PredictOptions, PredictionService};
use cardcast::config::Config;
use cardcast::domain::forecast::ModelType;
use cardcast::domain::market::Timeframe;
use cardcast::infrastructure::mock::SyntheticSeriesParams;
use cardcast::infrastructure::{
    Database, SqliteMarketDataSource, SqlitePredictionRepository, SyntheticSeriesGenerator,
};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Card price forecasting engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast one card
    Predict {
        /// Card identifier
        card: String,

        /// Horizon (1d, 7d, 30d, 90d, 180d, 365d)
        #[arg(short, long, default_value = "30d")]
        timeframe: String,

        /// ensemble, linear, polynomial, exponential_smoothing, arima, lstm
        #[arg(short, long, default_value = "ensemble")]
        model: String,

        /// Do not store the forecast
        #[arg(long)]
        dry_run: bool,

        /// Ignore past accuracy when weighting the ensemble
        #[arg(long)]
        no_history: bool,
    },
    /// Forecast several cards with bounded concurrency
    Batch {
        /// Comma-separated card ids (defaults to every card with history)
        #[arg(short, long)]
        cards: Option<String>,

        #[arg(short, long, default_value = "30d")]
        timeframe: String,

        #[arg(short, long, default_value = "ensemble")]
        model: String,

        /// Forecasts in flight at once (1-20)
        #[arg(short, long, default_value = "10")]
        batch_size: usize,
    },
    /// Print the technical indicator battery for one card
    Analyze {
        card: String,

        #[arg(short, long, default_value = "90d")]
        timeframe: String,
    },
    /// Score stored predictions against realized prices
    Assess {
        /// Prediction ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Per-model accuracy statistics and the ensemble weights they imply
    Stats,
    /// Fill the price history with seeded synthetic random walks
    Seed {
        /// Comma-separated card ids
        #[arg(short, long, default_value = "demo-001,demo-002,demo-003")]
        cards: String,

        /// Days of history per card
        #[arg(short, long, default_value = "400")]
        days: usize,

        #[arg(short, long, default_value = "42")]
        seed: u64,

        #[arg(long, default_value = "100.0")]
        start_price: f64,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn options(model: &str, persist: bool, use_history: bool) -> Result<PredictOptions> {
    Ok(PredictOptions {
        model_type: ModelType::from_str(model)?,
        persist,
        use_historical_weights: Some(use_history),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let db = Database::new(&config.persistence.database_url).await?;
    let market_data = Arc::new(SqliteMarketDataSource::new(db.pool.clone()));
    let repository = Arc::new(SqlitePredictionRepository::new(db.pool.clone()));
    let service = PredictionService::new(&config, market_data.clone(), repository);

    match cli.command {
        Commands::Predict {
            card,
            timeframe,
            model,
            dry_run,
            no_history,
        } => {
            let timeframe = Timeframe::from_str(&timeframe)?;
            let outcome = service
                .predict(&card, timeframe, options(&model, !dry_run, !no_history)?)
                .await?;
            print_json(&outcome)?;
        }
        Commands::Batch {
            cards,
            timeframe,
            model,
            batch_size,
        } => {
            let timeframe = Timeframe::from_str(&timeframe)?;
            let card_ids: Vec<String> = match cards {
                Some(list) => list
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => market_data.card_ids().await?,
            };

            let report = service
                .batch_predict(&card_ids, timeframe, batch_size, options(&model, true, true)?)
                .await?;
            print_json(&report)?;
        }
        Commands::Analyze { card, timeframe } => {
            let timeframe = Timeframe::from_str(&timeframe)?;
            let snapshot = service.technical_analysis(&card, timeframe).await?;
            print_json(&snapshot)?;
        }
        Commands::Assess { ids } => {
            for id in ids {
                match service.assess_accuracy(&id).await {
                    Ok(Some(assessment)) => print_json(&assessment)?,
                    Ok(None) => {
                        let status = service.prediction_status(&id).await?;
                        info!("Prediction {} not assessable yet ({:?})", id, status);
                    }
                    Err(e) => warn!("Assessment of {} failed: {}", id, e),
                }
            }
        }
        Commands::Stats => {
            let stats = service.model_performance_stats().await?;
            let weights = service.historical_weights().await?;
            print_json(&serde_json::json!({
                "models": stats,
                "historicalWeights": weights,
            }))?;
        }
        Commands::Seed {
            cards,
            days,
            seed,
            start_price,
        } => {
            let start = Utc::now().date_naive() - Duration::days(days as i64);
            let mut generator = SyntheticSeriesGenerator::new(seed);
            let params = SyntheticSeriesParams {
                start_price,
                ..Default::default()
            };

            for card in cards.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let series = generator.generate(card, start, days, params)?;
                market_data.save_points(card, series.points()).await?;
            }
            info!("Seeded {} days of history from seed {}", days, seed);
        }
    }

    Ok(())
}
