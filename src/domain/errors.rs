use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while building a strategy instance from parameters
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StrategyError {
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Indicator setup failed: {0}")]
    Indicator(String),
}

/// Fatal configuration errors for a single backtest run
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BacktestError {
    #[error("Invalid date range: end {end} must be after start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Initial capital must be positive, got {0}")]
    InvalidCapital(Decimal),

    #[error("Backtest requires at least one symbol")]
    NoSymbols,

    #[error("Unknown strategy '{0}': no implementation and no fallback possible")]
    UnknownStrategy(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Simulation task aborted: {0}")]
    SimulationAborted(String),
}

/// Failure to evaluate one optimization candidate. Never aborts a search.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluationError {
    #[error("Invalid parameter combination: {0}")]
    InvalidParameter(String),

    #[error("Simulation failed: {0}")]
    Backtest(#[from] BacktestError),
}

/// Errors surfaced by the optimization engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OptimizationError {
    #[error("An optimization is already running")]
    AlreadyRunning,

    #[error("Parameter space is empty")]
    EmptyParameterSpace,

    #[error("Invalid optimization config: {0}")]
    InvalidConfig(String),

    #[error("No valid results: all {attempted} candidate evaluations failed")]
    NoValidResults { attempted: usize },

    #[error("Backtest setup failed: {0}")]
    Backtest(#[from] BacktestError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_backtest_error_formatting() {
        let error = BacktestError::InvalidDateRange {
            start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };

        let msg = error.to_string();
        assert!(msg.contains("2024-01-01"));
        assert!(msg.contains("2024-02-01"));

        assert!(BacktestError::InvalidCapital(dec!(-5)).to_string().contains("-5"));
    }

    #[test]
    fn test_evaluation_error_wraps_strategy_error() {
        let error: EvaluationError = BacktestError::from(StrategyError::InvalidParameter {
            name: "period".to_string(),
            reason: "must be > 0".to_string(),
        })
        .into();

        let msg = error.to_string();
        assert!(msg.contains("period"));
        assert!(msg.contains("must be > 0"));
    }

    #[test]
    fn test_no_valid_results_formatting() {
        let msg = OptimizationError::NoValidResults { attempted: 12 }.to_string();
        assert!(msg.contains("12"));
    }
}
