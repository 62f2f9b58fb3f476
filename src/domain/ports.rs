use crate::domain::market::{PricePoint, PriceSeries};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Read-only access to card price history owned by the market-data collaborator
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Most recent `max_points` active points for the card, ascending by date
    async fn fetch_series(&self, card_id: &str, max_points: usize) -> Result<PriceSeries>;

    /// First active point dated on or after `date`, if one exists
    async fn fetch_price_on_or_after(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>>;
}
