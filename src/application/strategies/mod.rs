mod always_buy;
pub mod fallback;
pub mod registry;
pub mod resolver;
mod rsi_reversion;
mod sma_trend;
mod traits;

pub use always_buy::AlwaysBuyStrategy;
pub use registry::{StrategyFactory, StrategyRegistry};
pub use resolver::{ResolvedStrategy, StrategyResolver};
pub use rsi_reversion::RsiReversionStrategy;
pub use sma_trend::SmaTrendStrategy;
pub use traits::Strategy;
