//! Configuration for the backtesting engine.
//!
//! Settings come from environment variables (optionally through a `.env`
//! file), grouped by concern: market data, backtest defaults and risk limits.

mod market_data_config;
mod parameter_space;
mod risk_env_config;

pub use market_data_config::{DEFAULT_MARKET_DATA_URL, DEFAULT_TIMEOUT_SECS, MarketDataEnvConfig};
pub use parameter_space::{load_parameter_space, parse_parameter_space};
pub use risk_env_config::BacktestEnvConfig;

use crate::domain::backtest::BacktestConfig;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::env;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/backtestr.db";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    pub market_data: MarketDataEnvConfig,
    pub backtest: BacktestEnvConfig,
    pub optimization_max_concurrency: usize,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optimization_max_concurrency = match lookup("OPTIMIZATION_MAX_CONCURRENCY") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .context("Failed to parse OPTIMIZATION_MAX_CONCURRENCY")?,
            None => 1,
        };
        if optimization_max_concurrency == 0 {
            anyhow::bail!("OPTIMIZATION_MAX_CONCURRENCY must be at least 1");
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            market_data: MarketDataEnvConfig::from_lookup(&lookup)?,
            backtest: BacktestEnvConfig::from_lookup(&lookup)?,
            optimization_max_concurrency,
        })
    }

    /// Backtest settings seeded from the environment defaults.
    pub fn backtest_config(
        &self,
        strategy_id: &str,
        symbols: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BacktestConfig {
        let mut config = BacktestConfig::new(strategy_id, symbols, start, end);
        config.initial_capital = self.backtest.initial_capital;
        config.commission_pct = self.backtest.commission_pct;
        config.slippage_pct = self.backtest.slippage_pct;
        config.position_size = self.backtest.position_size;
        config.risk = self.backtest.risk;
        config
    }
}
