use crate::domain::backtest::{EquityPoint, MonthlyReturn, RiskMetrics};
use crate::domain::performance::stats::{Stats, finite_or_zero, safe_div};
use crate::domain::trading::types::BacktestTrade;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;

/// Summary metrics derived from a finished run.
///
/// Rates and returns are fractions (0.05 = 5%). Every field is finite,
/// including for zero-trade and zero-volatility runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,

    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,

    pub gross_profit: Decimal,
    /// Absolute value
    pub gross_loss: Decimal,
    pub profit_factor: f64,
    pub average_win: Decimal,
    /// Absolute value
    pub average_loss: Decimal,

    pub monthly_returns: Vec<MonthlyReturn>,
    pub risk: RiskMetrics,
}

/// Everything the calculator needs from a finished simulation
#[derive(Debug, Clone, Copy)]
pub struct MetricsInput<'a> {
    pub trades: &'a [BacktestTrade],
    pub equity_curve: &'a [EquityPoint],
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    /// Peak-to-trough fraction tracked during simulation
    pub max_drawdown: f64,
    /// Calendar days in the configured range
    pub period_days: i64,
    /// Daily benchmark returns aligned with the equity curve
    pub benchmark_returns: Option<&'a [f64]>,
}

impl PerformanceMetrics {
    pub fn calculate(input: MetricsInput<'_>) -> Self {
        let total_return = finite_or_zero(
            ((input.final_capital - input.initial_capital)
                .checked_div(input.initial_capital)
                .unwrap_or(Decimal::ZERO))
            .to_f64()
            .unwrap_or(0.0),
        );
        let annualized_return = Self::annualized_return(total_return, input.period_days);

        // Take the worse of the tracked value and what the curve itself shows
        let curve_drawdown = input
            .equity_curve
            .iter()
            .map(|p| p.drawdown)
            .fold(0.0_f64, f64::max);
        let max_drawdown = finite_or_zero(input.max_drawdown.max(curve_drawdown)).max(0.0);

        let (winning_trades, losing_trades, gross_profit, gross_loss) = input.trades.iter().fold(
            (0usize, 0usize, Decimal::ZERO, Decimal::ZERO),
            |(wins, losses, profit, loss), trade| {
                if trade.is_win() {
                    (wins + 1, losses, profit + trade.pnl, loss)
                } else if trade.is_loss() {
                    (wins, losses + 1, profit, loss + trade.pnl.abs())
                } else {
                    (wins, losses, profit, loss)
                }
            },
        );

        let total_trades = input.trades.len();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };
        let average_win = if winning_trades > 0 {
            gross_profit / Decimal::from(winning_trades)
        } else {
            Decimal::ZERO
        };
        let average_loss = if losing_trades > 0 {
            gross_loss / Decimal::from(losing_trades)
        } else {
            Decimal::ZERO
        };
        let profit_factor = if gross_loss > Decimal::ZERO {
            finite_or_zero(
                (gross_profit / gross_loss)
                    .to_f64()
                    .unwrap_or(0.0),
            )
        } else {
            0.0
        };

        let equity: Vec<Decimal> = input.equity_curve.iter().map(|p| p.equity).collect();
        let returns = Stats::calculate_returns(&equity);

        let (alpha, beta) = input
            .benchmark_returns
            .map(|bench| Stats::alpha_beta(&returns, bench))
            .unwrap_or((0.0, 0.0));

        let risk = RiskMetrics {
            volatility: Stats::volatility(&returns),
            beta,
            alpha,
            sharpe_ratio: Stats::sharpe_ratio(&returns),
            sortino_ratio: Stats::sortino_ratio(&returns),
            calmar_ratio: safe_div(total_return, max_drawdown),
        };

        Self {
            total_return,
            annualized_return,
            max_drawdown,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            gross_profit,
            gross_loss,
            profit_factor,
            average_win,
            average_loss,
            monthly_returns: Self::monthly_returns(input.trades, input.initial_capital),
            risk,
        }
    }

    /// `(1 + total)^(365 / days) - 1`, 0 for an empty period
    pub fn annualized_return(total_return: f64, period_days: i64) -> f64 {
        if period_days <= 0 {
            return 0.0;
        }
        let growth = 1.0 + total_return;
        if growth <= 0.0 {
            return -1.0;
        }
        finite_or_zero(growth.powf(365.0 / period_days as f64) - 1.0)
    }

    /// Trades bucketed by entry month, oldest first
    pub fn monthly_returns(trades: &[BacktestTrade], initial_capital: Decimal) -> Vec<MonthlyReturn> {
        let mut buckets: BTreeMap<String, (Decimal, usize, usize)> = BTreeMap::new();

        for trade in trades {
            let month = trade.entry_date.format("%Y-%m").to_string();
            let bucket = buckets.entry(month).or_insert((Decimal::ZERO, 0, 0));
            bucket.0 += trade.pnl;
            bucket.1 += 1;
            if trade.is_win() {
                bucket.2 += 1;
            }
        }

        buckets
            .into_iter()
            .map(|(month, (pnl, trades, wins))| MonthlyReturn {
                month,
                pnl,
                return_on_capital: finite_or_zero(
                    pnl.checked_div(initial_capital)
                        .and_then(|r| r.to_f64())
                        .unwrap_or(0.0),
                ),
                trades,
                win_rate: wins as f64 / trades as f64,
            })
            .collect()
    }
}
