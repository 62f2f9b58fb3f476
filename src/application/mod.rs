// Technical indicators
pub mod indicators;

// Forecast models and ensemble combination
pub mod ensemble;
pub mod models;

// Accuracy feedback
pub mod accuracy_tracker;
pub mod performance;

// Pipeline orchestrator
pub mod prediction_service;
