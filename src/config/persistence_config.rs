//! Persistence configuration parsing from environment variables.

use super::EnvSource;

/// Persistence environment configuration
#[derive(Debug, Clone)]
pub struct PersistenceEnvConfig {
    pub database_url: String,
}

impl Default for PersistenceEnvConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/cardcast.db".to_string(),
        }
    }
}

impl PersistenceEnvConfig {
    pub fn from_source(source: &EnvSource<'_>) -> Self {
        Self {
            database_url: source.string("DATABASE_URL", &Self::default().database_url),
        }
    }
}
