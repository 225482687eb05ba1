//! Market data API configuration parsing from environment variables.

use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_MARKET_DATA_URL: &str = "https://data.alpaca.markets";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Credentials and endpoint of the live candle source
#[derive(Debug, Clone, Default)]
pub struct MarketDataEnvConfig {
    pub api_key: String,
    pub api_secret: String,
    pub data_url: String,
    pub timeout_secs: u64,
}

impl MarketDataEnvConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup("MARKET_DATA_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("Failed to parse MARKET_DATA_TIMEOUT_SECS")?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key: lookup("MARKET_DATA_API_KEY").unwrap_or_default(),
            api_secret: lookup("MARKET_DATA_API_SECRET").unwrap_or_default(),
            data_url: lookup("MARKET_DATA_URL")
                .unwrap_or_else(|| DEFAULT_MARKET_DATA_URL.to_string()),
            timeout_secs,
        })
    }

    /// Without both credentials there is no live source
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_secret.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
