// Backtesting and parameter optimization modules
pub mod engine;
pub mod reporting;
pub mod search;
pub mod service;
pub mod simulator;
