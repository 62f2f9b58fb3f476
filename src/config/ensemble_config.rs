//! Ensemble configuration parsing from environment variables.

use super::EnvSource;
use crate::application::ensemble::EnsembleSettings;
use crate::application::performance::DEFAULT_MIN_SAMPLES;
use anyhow::{Result, ensure};

/// Ensemble environment configuration
#[derive(Debug, Clone)]
pub struct EnsembleEnvConfig {
    pub settings: EnsembleSettings,
    /// Whether ensemble forecasts consult past accuracy by default
    pub use_historical_weights: bool,
    /// Assessed single-model records needed before a model's accuracy counts
    pub min_samples: usize,
}

impl Default for EnsembleEnvConfig {
    fn default() -> Self {
        Self {
            settings: EnsembleSettings::default(),
            use_historical_weights: true,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

impl EnsembleEnvConfig {
    pub fn from_source(source: &EnvSource<'_>) -> Result<Self> {
        let d = Self::default();
        let ds = &d.settings;

        let settings = EnsembleSettings {
            weight_floor: source.parse("ENSEMBLE_WEIGHT_FLOOR", ds.weight_floor)?,
            volatility_high: source.parse("RISK_VOLATILITY_HIGH", ds.volatility_high)?,
            volatility_medium: source.parse("RISK_VOLATILITY_MEDIUM", ds.volatility_medium)?,
            agreement_high_risk: source.parse("RISK_AGREEMENT_HIGH", ds.agreement_high_risk)?,
            agreement_medium_risk: source
                .parse("RISK_AGREEMENT_MEDIUM", ds.agreement_medium_risk)?,
        };

        ensure!(
            (0.0..1.0).contains(&settings.weight_floor),
            "ENSEMBLE_WEIGHT_FLOOR must be in [0, 1)"
        );
        ensure!(
            settings.volatility_medium <= settings.volatility_high,
            "RISK_VOLATILITY_MEDIUM must not exceed RISK_VOLATILITY_HIGH"
        );
        ensure!(
            settings.agreement_high_risk <= settings.agreement_medium_risk,
            "RISK_AGREEMENT_HIGH must not exceed RISK_AGREEMENT_MEDIUM"
        );

        Ok(Self {
            settings,
            use_historical_weights: source
                .parse("ENSEMBLE_USE_HISTORICAL_WEIGHTS", d.use_historical_weights)?,
            min_samples: source.parse("ENSEMBLE_MIN_SAMPLES", d.min_samples)?.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensemble_config_defaults() {
        let empty = |_: &str| -> Option<String> { None };
        let config = EnsembleEnvConfig::from_source(&EnvSource::new(&empty)).unwrap();
        assert_eq!(config.settings, EnsembleSettings::default());
        assert!(config.use_historical_weights);
        assert_eq!(config.min_samples, 5);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let lookup = |key: &str| match key {
            "RISK_VOLATILITY_MEDIUM" => Some("0.1".to_string()),
            "RISK_VOLATILITY_HIGH" => Some("0.05".to_string()),
            _ => None,
        };
        assert!(EnsembleEnvConfig::from_source(&EnvSource::new(&lookup)).is_err());
    }
}
