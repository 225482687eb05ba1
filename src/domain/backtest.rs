//! Backtest configuration and result model.
//!
//! Everything here is created fresh per run. The only thing that outlives a
//! run is the flattened [`RunSummary`] handed to the result sink.

use crate::domain::errors::BacktestError;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::optimization::parameters::ParameterSet;
use crate::domain::risk::risk_policy::RiskPolicy;
use crate::domain::trading::fee_model::PercentFeeModel;
use crate::domain::trading::types::BacktestTrade;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub strategy_id: String,
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    /// Inclusive
    pub end_date: NaiveDate,
    pub initial_capital: Decimal,
    /// Fraction of notional per side (0.001 = 0.1%)
    pub commission_pct: Decimal,
    /// Fraction of notional per side
    pub slippage_pct: Decimal,
    /// Fixed currency amount committed per trade
    pub position_size: Decimal,
    pub risk: RiskPolicy,
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default)]
    pub parameters: ParameterSet,
    /// Symbol whose daily returns drive beta/alpha
    #[serde(default)]
    pub benchmark: Option<String>,
    /// Seeds the fallback strategies and synthetic data for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl BacktestConfig {
    pub fn new(
        strategy_id: &str,
        symbols: Vec<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            strategy_id: strategy_id.to_string(),
            symbols,
            start_date,
            end_date,
            initial_capital: dec!(100000),
            commission_pct: dec!(0.001),
            slippage_pct: dec!(0.0005),
            position_size: dec!(10000),
            risk: RiskPolicy::default(),
            timeframe: Timeframe::OneDay,
            parameters: ParameterSet::new(),
            benchmark: None,
            seed: None,
        }
    }

    pub fn with_strategy(&self, strategy_id: &str) -> Self {
        Self {
            strategy_id: strategy_id.to_string(),
            ..self.clone()
        }
    }

    pub fn with_parameters(&self, parameters: ParameterSet) -> Self {
        Self {
            parameters,
            ..self.clone()
        }
    }

    pub fn fee_model(&self) -> PercentFeeModel {
        PercentFeeModel::new(self.commission_pct, self.slippage_pct)
    }

    /// Calendar days covered by the run, both ends included. Used for
    /// annualization.
    pub fn period_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.end_date <= self.start_date {
            return Err(BacktestError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.initial_capital <= Decimal::ZERO {
            return Err(BacktestError::InvalidCapital(self.initial_capital));
        }
        if self.symbols.is_empty() {
            return Err(BacktestError::NoSymbols);
        }
        if self.strategy_id.trim().is_empty() {
            return Err(BacktestError::UnknownStrategy(self.strategy_id.clone()));
        }
        Ok(())
    }
}

/// Where a symbol's candles came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Live,
    Synthetic,
}

/// Which strategy resolution tier produced the signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    Registered,
    Statistical,
    Mock,
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionTier::Registered => write!(f, "registered"),
            ResolutionTier::Statistical => write!(f, "statistical"),
            ResolutionTier::Mock => write!(f, "mock"),
        }
    }
}

/// Tells genuine results apart from degraded ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub strategy_tier: ResolutionTier,
    pub data: BTreeMap<String, DataOrigin>,
}

impl Provenance {
    /// True when any symbol used synthetic data or the strategy is a stand-in
    pub fn is_degraded(&self) -> bool {
        self.strategy_tier != ResolutionTier::Registered
            || self.data.values().any(|o| *o == DataOrigin::Synthetic)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: Decimal,
    /// Fraction below the running peak, always >= 0
    pub drawdown: f64,
    pub trade_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    /// `YYYY-MM` of trade entry
    pub month: String,
    pub pnl: Decimal,
    /// Fraction of initial capital
    pub return_on_capital: f64,
    pub trades: usize,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub volatility: f64,
    pub beta: f64,
    pub alpha: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub config: BacktestConfig,
    pub final_capital: Decimal,
    /// Fractions, not percentages
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub profit_factor: f64,
    pub trades: Vec<BacktestTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub monthly_returns: Vec<MonthlyReturn>,
    pub risk_metrics: RiskMetrics,
    pub provenance: Provenance,
}

impl BacktestResult {
    pub fn strategy_id(&self) -> &str {
        &self.config.strategy_id
    }
}

/// Flattened record appended to the result sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub strategy_id: String,
    pub date: NaiveDate,
    pub trade_count: usize,
    pub success_count: usize,
    pub total_return_pct: f64,
    pub win_rate_pct: f64,
    pub fitness_score: f64,
    pub patterns_used: Vec<String>,
}

impl RunSummary {
    pub fn from_result(result: &BacktestResult, fitness_score: f64, date: NaiveDate) -> Self {
        let mut patterns_used = vec![format!("tier:{}", result.provenance.strategy_tier)];
        patterns_used.extend(
            result
                .config
                .parameters
                .iter()
                .map(|(name, value)| format!("{}={}", name, value)),
        );

        Self {
            strategy_id: result.config.strategy_id.clone(),
            date,
            trade_count: result.total_trades,
            success_count: result.winning_trades,
            total_return_pct: result.total_return * 100.0,
            win_rate_pct: result.win_rate * 100.0,
            fitness_score,
            patterns_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BacktestConfig {
        BacktestConfig::new(
            "sma_trend",
            vec!["AAPL".to_string()],
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }

    #[test]
    fn test_validate_accepts_default_config() {
        assert!(config().validate().is_ok());
        // 2024 is a leap year
        assert_eq!(config().period_days(), 366);
    }

    #[test]
    fn test_period_days_includes_end_date() {
        let mut cfg = config();
        cfg.end_date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(cfg.period_days(), 10);
    }

    #[test]
    fn test_validate_rejects_inverted_dates() {
        let mut cfg = config();
        cfg.end_date = cfg.start_date;
        assert!(matches!(
            cfg.validate(),
            Err(BacktestError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_capital_and_symbols() {
        let mut cfg = config();
        cfg.initial_capital = Decimal::ZERO;
        assert_eq!(
            cfg.validate(),
            Err(BacktestError::InvalidCapital(Decimal::ZERO))
        );

        let mut cfg = config();
        cfg.symbols.clear();
        assert_eq!(cfg.validate(), Err(BacktestError::NoSymbols));

        let cfg = config().with_strategy("  ");
        assert!(matches!(
            cfg.validate(),
            Err(BacktestError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_provenance_degraded() {
        let mut data = BTreeMap::new();
        data.insert("AAPL".to_string(), DataOrigin::Live);
        let mut provenance = Provenance {
            strategy_tier: ResolutionTier::Registered,
            data,
        };
        assert!(!provenance.is_degraded());

        provenance
            .data
            .insert("MSFT".to_string(), DataOrigin::Synthetic);
        assert!(provenance.is_degraded());

        provenance.data.clear();
        provenance.strategy_tier = ResolutionTier::Mock;
        assert!(provenance.is_degraded());
    }
}
