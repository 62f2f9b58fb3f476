// Domain-specific error types
pub mod errors;

// Forecast value types (models, ensemble output)
pub mod forecast;

// Price history and horizons
pub mod market;

// Port interfaces
pub mod ports;

// Stored predictions and their assessment
pub mod prediction;

// Repository traits
pub mod repositories;
