pub mod alpaca;
pub mod core;
pub mod factory;
pub mod mock;
pub mod persistence;
pub mod repositories;

pub use factory::ServiceFactory;
pub use mock::MockCandleSource;
pub use repositories::{InMemoryResultSink, InMemorySignalStatsRepository};
