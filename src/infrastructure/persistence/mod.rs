pub mod database;
pub mod prediction_repository;
pub mod price_history_repository;

pub use database::Database;
pub use prediction_repository::SqlitePredictionRepository;
pub use price_history_repository::SqliteMarketDataSource;
