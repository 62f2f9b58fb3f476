pub mod types;

pub use types::{EnsembleForecast, ModelForecast, ModelKind, ModelType, RiskLevel, Trend};
