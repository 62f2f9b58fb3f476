pub mod mock;
pub mod persistence;
pub mod repositories;

pub use mock::{InMemoryMarketDataSource, SyntheticSeriesGenerator};
pub use persistence::{Database, SqliteMarketDataSource, SqlitePredictionRepository};
pub use repositories::InMemoryPredictionRepository;
