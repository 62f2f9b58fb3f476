pub mod price_series;
pub mod timeframe;

pub use price_series::{MIN_FORECAST_POINTS, PricePoint, PriceSeries};
pub use timeframe::Timeframe;
