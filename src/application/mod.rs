pub mod market_data;
pub mod optimization;
pub mod strategies;
