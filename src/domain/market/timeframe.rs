use crate::domain::errors::ForecastError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Forecast horizon offered to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
    #[serde(rename = "180d")]
    HalfYear,
    #[serde(rename = "365d")]
    OneYear,
}

impl Timeframe {
    /// Number of calendar days between the prediction date and the target date
    pub fn horizon_days(&self) -> u32 {
        match self {
            Timeframe::OneDay => 1,
            Timeframe::SevenDays => 7,
            Timeframe::ThirtyDays => 30,
            Timeframe::NinetyDays => 90,
            Timeframe::HalfYear => 180,
            Timeframe::OneYear => 365,
        }
    }

    /// Maximum number of history points fetched for this horizon.
    ///
    /// Longer horizons look further back so slow trends dominate short noise.
    pub fn lookback_points(&self) -> usize {
        match self {
            Timeframe::OneDay => 90,
            Timeframe::SevenDays => 180,
            Timeframe::ThirtyDays => 365,
            Timeframe::NinetyDays => 730,
            Timeframe::HalfYear => 1095,
            Timeframe::OneYear => 1825,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneDay => "1d",
            Timeframe::SevenDays => "7d",
            Timeframe::ThirtyDays => "30d",
            Timeframe::NinetyDays => "90d",
            Timeframe::HalfYear => "180d",
            Timeframe::OneYear => "365d",
        }
    }

    /// Returns all supported timeframes in ascending order
    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::OneDay,
            Timeframe::SevenDays,
            Timeframe::ThirtyDays,
            Timeframe::NinetyDays,
            Timeframe::HalfYear,
            Timeframe::OneYear,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Timeframe::OneDay),
            "7d" => Ok(Timeframe::SevenDays),
            "30d" => Ok(Timeframe::ThirtyDays),
            "90d" => Ok(Timeframe::NinetyDays),
            "180d" => Ok(Timeframe::HalfYear),
            "365d" => Ok(Timeframe::OneYear),
            _ => Err(ForecastError::InvalidTimeframe(s.to_string())),
        }
    }
}
