//! Backtest defaults and risk limits parsed from environment variables.

use crate::domain::risk::risk_policy::RiskPolicy;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

/// Defaults applied to every backtest built from the environment
#[derive(Debug, Clone)]
pub struct BacktestEnvConfig {
    pub initial_capital: Decimal,
    pub commission_pct: Decimal,
    pub slippage_pct: Decimal,
    pub position_size: Decimal,
    pub risk: RiskPolicy,
}

impl Default for BacktestEnvConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(100000),
            commission_pct: dec!(0.001),
            slippage_pct: dec!(0.0005),
            position_size: dec!(10000),
            risk: RiskPolicy::default(),
        }
    }
}

impl BacktestEnvConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let risk = RiskPolicy {
            max_position_size: parse_decimal(
                lookup,
                "RISK_MAX_POSITION_SIZE",
                defaults.risk.max_position_size,
            )?,
            max_daily_loss: parse_decimal(lookup, "RISK_MAX_DAILY_LOSS", defaults.risk.max_daily_loss)?,
            stop_loss_pct: parse_decimal(lookup, "RISK_STOP_LOSS_PCT", defaults.risk.stop_loss_pct)?,
            take_profit_pct: parse_decimal(
                lookup,
                "RISK_TAKE_PROFIT_PCT",
                defaults.risk.take_profit_pct,
            )?,
        };

        let config = Self {
            initial_capital: parse_decimal(
                lookup,
                "DEFAULT_INITIAL_CAPITAL",
                defaults.initial_capital,
            )?,
            commission_pct: parse_decimal(lookup, "DEFAULT_COMMISSION_PCT", defaults.commission_pct)?,
            slippage_pct: parse_decimal(lookup, "DEFAULT_SLIPPAGE_PCT", defaults.slippage_pct)?,
            position_size: parse_decimal(lookup, "DEFAULT_POSITION_SIZE", defaults.position_size)?,
            risk,
        };

        if config.commission_pct < Decimal::ZERO || config.slippage_pct < Decimal::ZERO {
            anyhow::bail!("DEFAULT_COMMISSION_PCT and DEFAULT_SLIPPAGE_PCT must not be negative");
        }
        if config.position_size <= Decimal::ZERO {
            anyhow::bail!("DEFAULT_POSITION_SIZE must be positive");
        }

        Ok(config)
    }
}

fn parse_decimal<F>(lookup: &F, key: &str, default: Decimal) -> Result<Decimal>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => Decimal::from_str(raw.trim()).context(format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}
