// Candle loading with synthetic fallback
pub mod provider;
pub mod synthetic;

pub use provider::{LoadedCandles, MarketDataProvider};
pub use synthetic::SyntheticCandleGenerator;
