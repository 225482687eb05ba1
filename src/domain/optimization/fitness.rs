use crate::domain::backtest::BacktestResult;
use crate::domain::optimization::types::FitnessMetric;

/// Steps considered by the convergence measure
pub const CONVERGENCE_WINDOW: usize = 10;

/// Scores a backtest result. Higher is better; never NaN.
pub fn score(result: &BacktestResult, metric: FitnessMetric) -> f64 {
    let value = match metric {
        FitnessMetric::Sharpe => result.risk_metrics.sharpe_ratio,
        FitnessMetric::Returns => result.total_return,
        FitnessMetric::Calmar => result.risk_metrics.calmar_ratio,
        FitnessMetric::Custom => {
            // Composite favoring Sharpe, return and win rate, penalizing drawdown
            0.4 * result.risk_metrics.sharpe_ratio
                + 0.3 * result.total_return
                + 0.2 * result.win_rate
                + 0.1 * (1.0 - result.max_drawdown)
        }
    };

    if value.is_finite() { value } else { 0.0 }
}

/// Average of the last ten fitness values over their best, as a percentage.
pub fn convergence(fitness: &[f64]) -> f64 {
    if fitness.len() < CONVERGENCE_WINDOW {
        return 0.0;
    }

    let window = &fitness[fitness.len() - CONVERGENCE_WINDOW..];
    let best = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = window.iter().sum::<f64>() / CONVERGENCE_WINDOW as f64;

    if best == 0.0 || !best.is_finite() {
        return 0.0;
    }

    let ratio = avg / best * 100.0;
    if ratio.is_finite() { ratio } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convergence_needs_ten_steps() {
        assert_eq!(convergence(&[1.0; 9]), 0.0);
        assert!((convergence(&[0.5; 10]) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_convergence_uses_last_window_only() {
        let mut fitness = vec![100.0; 5];
        fitness.extend([1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0]);
        // avg 1.5 / best 2.0
        assert!((convergence(&fitness) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_convergence_zero_best() {
        assert_eq!(convergence(&[0.0; 12]), 0.0);
    }
}
