use crate::domain::market::{PricePoint, PriceSeries};
use crate::domain::ports::MarketDataSource;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Market data held in memory, for tests and demos.
///
/// Cards can be flagged unavailable to simulate an upstream outage.
#[derive(Clone, Default)]
pub struct InMemoryMarketDataSource {
    history: Arc<RwLock<HashMap<String, Vec<PricePoint>>>>,
    unavailable: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryMarketDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored history of the series' card
    pub async fn set_series(&self, series: PriceSeries) {
        self.history
            .write()
            .await
            .insert(series.card_id().to_string(), series.points().to_vec());
    }

    pub async fn set_unavailable(&self, card_id: &str) {
        self.unavailable.write().await.insert(card_id.to_string());
    }

    pub async fn set_available(&self, card_id: &str) {
        self.unavailable.write().await.remove(card_id);
    }

    async fn check_available(&self, card_id: &str) -> Result<()> {
        if self.unavailable.read().await.contains(card_id) {
            anyhow::bail!("Market data source unavailable for {}", card_id);
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for InMemoryMarketDataSource {
    async fn fetch_series(&self, card_id: &str, max_points: usize) -> Result<PriceSeries> {
        self.check_available(card_id).await?;

        let history = self.history.read().await;
        let Some(points) = history.get(card_id).filter(|p| !p.is_empty()) else {
            anyhow::bail!("No price history for card {}", card_id);
        };

        let start = points.len().saturating_sub(max_points);
        debug!(
            "InMemoryMarketDataSource: {} points for {}",
            points.len() - start,
            card_id
        );
        Ok(PriceSeries::new(card_id, points[start..].to_vec())?)
    }

    async fn fetch_price_on_or_after(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>> {
        self.check_available(card_id).await?;

        let history = self.history.read().await;
        Ok(history
            .get(card_id)
            .and_then(|points| points.iter().find(|p| p.date >= date))
            .cloned())
    }
}

/// Shape of a generated random walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticSeriesParams {
    pub start_price: f64,
    /// Mean daily relative move
    pub daily_drift: f64,
    /// Half-width of the uniform daily shock
    pub daily_volatility: f64,
    pub base_volume: f64,
}

impl Default for SyntheticSeriesParams {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            daily_drift: 0.0005,
            daily_volatility: 0.02,
            base_volume: 40.0,
        }
    }
}

/// Seeded random-walk price history generator.
///
/// The same seed always yields the same series.
pub struct SyntheticSeriesGenerator {
    rng: StdRng,
}

impl SyntheticSeriesGenerator {
    /// Floor keeping generated closes strictly positive
    const MIN_PRICE: f64 = 0.01;

    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate(
        &mut self,
        card_id: &str,
        start: NaiveDate,
        days: usize,
        params: SyntheticSeriesParams,
    ) -> Result<PriceSeries> {
        let spread = params.daily_volatility.abs();
        let mut price = params.start_price.max(Self::MIN_PRICE);
        let mut points = Vec::with_capacity(days);

        for i in 0..days {
            if i > 0 {
                let shock = self.rng.random_range(-spread..=spread);
                price = (price * (1.0 + params.daily_drift + shock)).max(Self::MIN_PRICE);
            }
            let volume = params.base_volume * self.rng.random_range(0.5..=1.5);

            let close = Decimal::from_f64(price)
                .map(|p| p.round_dp(2))
                .filter(|p| *p > Decimal::ZERO)
                .unwrap_or(Decimal::new(1, 2));
            let volume = Decimal::from_f64(volume.max(0.0))
                .map(|v| v.round_dp(0))
                .unwrap_or(Decimal::ZERO);

            points.push(PricePoint::new(
                start + Duration::days(i as i64),
                close,
                volume,
            ));
        }

        Ok(PriceSeries::new(card_id, points)?)
    }
}
