//! Configuration module for cardcast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Forecast, Ensemble, Batch, and Persistence.
//!
//! Every sub-config parses through an [`EnvSource`], a thin wrapper over a key
//! lookup function. `Config::from_env` plugs in the process environment;
//! tests plug in a map.

mod batch_config;
mod ensemble_config;
mod forecast_config;
mod persistence_config;

pub use batch_config::BatchEnvConfig;
pub use ensemble_config::EnsembleEnvConfig;
pub use forecast_config::ForecastEnvConfig;
pub use persistence_config::PersistenceEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Key lookup used by the sub-config parsers
pub struct EnvSource<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> EnvSource<'a> {
    pub fn new(lookup: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self { lookup }
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        (self.lookup)(key).unwrap_or_else(|| default.to_string())
    }

    /// Parses `key`, falling back to `default` when the key is unset
    pub fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match (self.lookup)(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .context(format!("Failed to parse {}", key)),
            None => Ok(default),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub forecast: ForecastEnvConfig,
    pub ensemble: EnsembleEnvConfig,
    pub batch: BatchEnvConfig,
    pub persistence: PersistenceEnvConfig,
}

impl Config {
    /// Load configuration from environment variables (after `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let lookup = |key: &str| env::var(key).ok();
        Self::from_source(&EnvSource::new(&lookup))
    }

    pub fn from_source(source: &EnvSource<'_>) -> Result<Self> {
        let forecast = ForecastEnvConfig::from_source(source)
            .context("Failed to load forecast config")?;
        let ensemble = EnsembleEnvConfig::from_source(source)
            .context("Failed to load ensemble config")?;
        let batch = BatchEnvConfig::from_source(source).context("Failed to load batch config")?;
        let persistence = PersistenceEnvConfig::from_source(source);

        Ok(Self {
            forecast,
            ensemble,
            batch,
            persistence,
        })
    }
}
