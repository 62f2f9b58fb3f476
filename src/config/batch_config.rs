//! Batch prediction configuration parsing from environment variables.

use super::EnvSource;
use anyhow::{Result, ensure};

/// Hard ceiling on cards per batch request
pub const MAX_BATCH_CARDS: usize = 50;
/// Hard ceiling on the requested batch size
pub const MAX_BATCH_SIZE: usize = 20;

/// Batch environment configuration
#[derive(Debug, Clone)]
pub struct BatchEnvConfig {
    /// Upper bound on forecasts in flight at once
    pub max_concurrency: usize,
    pub max_batch_size: usize,
    pub max_cards: usize,
}

impl Default for BatchEnvConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            max_batch_size: MAX_BATCH_SIZE,
            max_cards: MAX_BATCH_CARDS,
        }
    }
}

impl BatchEnvConfig {
    pub fn from_source(source: &EnvSource<'_>) -> Result<Self> {
        let d = Self::default();
        let max_concurrency = source.parse("BATCH_MAX_CONCURRENCY", d.max_concurrency)?;
        ensure!(max_concurrency > 0, "BATCH_MAX_CONCURRENCY must be positive");

        Ok(Self {
            max_concurrency,
            max_batch_size: source
                .parse("BATCH_MAX_SIZE", d.max_batch_size)?
                .clamp(1, MAX_BATCH_SIZE),
            max_cards: source
                .parse("BATCH_MAX_CARDS", d.max_cards)?
                .clamp(1, MAX_BATCH_CARDS),
        })
    }
}
