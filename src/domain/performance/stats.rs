use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::Statistics;

/// Shared statistics utilities for financial calculations.
///
/// Every helper returns 0 instead of NaN or infinity on degenerate input.
pub struct Stats;

impl Stats {
    /// Pairwise relative change of a value series. Non-positive bases are skipped.
    pub fn calculate_returns(values: &[Decimal]) -> Vec<f64> {
        values
            .windows(2)
            .filter_map(|w| {
                let prev = w[0].to_f64()?;
                let curr = w[1].to_f64()?;
                (prev > 0.0).then(|| (curr - prev) / prev)
            })
            .collect()
    }

    pub fn mean(returns: &[f64]) -> f64 {
        if returns.is_empty() {
            return 0.0;
        }
        finite_or_zero(returns.mean())
    }

    /// Population standard deviation (divides by n)
    pub fn volatility(returns: &[f64]) -> f64 {
        if returns.is_empty() {
            return 0.0;
        }
        finite_or_zero(returns.population_std_dev())
    }

    /// Root mean square of the negative returns only
    pub fn downside_deviation(returns: &[f64]) -> f64 {
        let downside: Vec<f64> = returns.iter().filter(|r| **r < 0.0).map(|r| r * r).collect();
        if downside.is_empty() {
            return 0.0;
        }
        finite_or_zero((downside.iter().sum::<f64>() / downside.len() as f64).sqrt())
    }

    /// Mean return over volatility, risk-free rate assumed 0
    pub fn sharpe_ratio(returns: &[f64]) -> f64 {
        safe_div(Self::mean(returns), Self::volatility(returns))
    }

    pub fn sortino_ratio(returns: &[f64]) -> f64 {
        safe_div(Self::mean(returns), Self::downside_deviation(returns))
    }

    /// Alpha and beta by linear regression of strategy on benchmark returns.
    ///
    /// Series are truncated to the shorter length; fewer than 2 points yields (0, 0).
    pub fn alpha_beta(strategy_returns: &[f64], benchmark_returns: &[f64]) -> (f64, f64) {
        let n = strategy_returns.len().min(benchmark_returns.len());
        if n < 2 {
            return (0.0, 0.0);
        }

        let s = &strategy_returns[..n];
        let b = &benchmark_returns[..n];
        let mean_s = Self::mean(s);
        let mean_b = Self::mean(b);

        let cov = s
            .iter()
            .zip(b.iter())
            .map(|(si, bi)| (si - mean_s) * (bi - mean_b))
            .sum::<f64>()
            / (n as f64 - 1.0);
        let var_b = b.iter().map(|bi| (bi - mean_b).powi(2)).sum::<f64>() / (n as f64 - 1.0);

        let beta = if var_b > 1e-12 { cov / var_b } else { 0.0 };
        let alpha = mean_s - beta * mean_b;

        (finite_or_zero(alpha), finite_or_zero(beta))
    }
}

/// Division that resolves to 0 whenever the result would not be finite.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
