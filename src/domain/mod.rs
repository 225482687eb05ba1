// Backtest configuration and result model
pub mod backtest;

// Domain-specific error types
pub mod errors;

// Market data primitives
pub mod market;

// Parameter spaces, search configuration and fitness
pub mod optimization;

// Performance metrics
pub mod performance;

// Port interfaces
pub mod ports;

// Risk gating
pub mod risk;

// Core trading domain
pub mod trading;
