//! Reporting utilities for backtest and optimization results.
//!
//! Provides formatted console output plus CSV and JSON export.

use crate::domain::backtest::BacktestResult;
use crate::domain::optimization::types::OptimizationResult;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const CSV_HEADER: [&str; 7] = [
    "strategy",
    "total_return_pct",
    "annualized_return_pct",
    "sharpe_ratio",
    "win_rate_pct",
    "total_trades",
    "max_drawdown_pct",
];

/// Reporter for backtest and optimization output.
pub struct Reporter {
    output_dir: String,
}

impl Reporter {
    /// Creates a new reporter with the given output directory.
    pub fn new(output_dir: &str) -> Self {
        Self {
            output_dir: output_dir.to_string(),
        }
    }

    /// One row per result; rates as percentages.
    pub fn backtests_to_csv(results: &[BacktestResult]) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;

        for result in results {
            writer.write_record([
                result.strategy_id().to_string(),
                format!("{:.2}", result.total_return * 100.0),
                format!("{:.2}", result.annualized_return * 100.0),
                format!("{:.4}", result.risk_metrics.sharpe_ratio),
                format!("{:.2}", result.win_rate * 100.0),
                result.total_trades.to_string(),
                format!("{:.2}", result.max_drawdown * 100.0),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e))?;
        String::from_utf8(bytes).context("CSV output is not valid UTF-8")
    }

    pub fn optimization_to_json(result: &OptimizationResult) -> Result<String> {
        serde_json::to_string_pretty(result).context("Failed to serialize optimization result")
    }

    pub fn export_csv(&self, results: &[BacktestResult], filename: &str) -> Result<PathBuf> {
        self.write_output(filename, &Self::backtests_to_csv(results)?)
    }

    pub fn export_json(&self, result: &OptimizationResult, filename: &str) -> Result<PathBuf> {
        self.write_output(filename, &Self::optimization_to_json(result)?)
    }

    fn write_output(&self, filename: &str, contents: &str) -> Result<PathBuf> {
        let output_path = if filename.contains('/') || filename.contains('\\') {
            PathBuf::from(filename)
        } else {
            Path::new(&self.output_dir).join(filename)
        };

        // Ensure directory exists
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {:?}", parent))?;
        }

        std::fs::write(&output_path, contents)
            .context(format!("Failed to write results to {:?}", output_path))?;

        println!("💾 Results saved to: {}", output_path.display());
        Ok(output_path)
    }

    /// Prints the header banner for a run.
    pub fn print_header(&self, title: &str, symbols: &[String], start: &str, end: &str) {
        println!("{}", "=".repeat(80));
        println!("🔍 {}", title);
        println!("{}", "=".repeat(80));
        println!("Symbols:      {}", symbols.join(", "));
        println!("Period:       {} to {}", start, end);
        println!("Output:       {}", self.output_dir);
        println!("{}", "=".repeat(80));
    }

    /// Prints a single backtest summary.
    pub fn print_backtest(&self, result: &BacktestResult) {
        println!("\n📈 BACKTEST: {}", result.strategy_id());
        println!("  Final Capital:    {:.2}", result.final_capital);
        println!("  Total Return:     {:.2}%", result.total_return * 100.0);
        println!("  Annualized:       {:.2}%", result.annualized_return * 100.0);
        println!("  Max Drawdown:     {:.2}%", result.max_drawdown * 100.0);
        println!("  Trades:           {}", result.total_trades);
        println!("  Win Rate:         {:.1}%", result.win_rate * 100.0);
        println!("  Profit Factor:    {:.2}", result.profit_factor);
        println!("  Sharpe Ratio:     {:.2}", result.risk_metrics.sharpe_ratio);
        println!("  Sortino Ratio:    {:.2}", result.risk_metrics.sortino_ratio);
        println!("  Calmar Ratio:     {:.2}", result.risk_metrics.calmar_ratio);
        println!("  Volatility:       {:.4}", result.risk_metrics.volatility);
        if result.config.benchmark.is_some() {
            println!("  Alpha:            {:.4}%", result.risk_metrics.alpha * 100.0);
            println!("  Beta:             {:.2}", result.risk_metrics.beta);
        }
        println!("  Strategy Tier:    {}", result.provenance.strategy_tier);
        if result.provenance.is_degraded() {
            println!("  ⚠️  Degraded result: fallback strategy or synthetic data in use");
        }
        println!("{}\n", "=".repeat(80));
    }

    /// Prints a ranked comparison table.
    pub fn print_comparison_table(&self, results: &[BacktestResult]) {
        println!("\n{}", "=".repeat(80));
        println!("✅ STRATEGY COMPARISON");
        println!("{}", "=".repeat(80));

        println!(
            "{:<4} | {:<18} | {:>8} | {:>8} | {:>8} | {:>7} | {:>7} | {:<11}",
            "#", "Strategy", "Return%", "Sharpe", "WinRate", "Trades", "MaxDD%", "Tier"
        );
        println!("{}", "-".repeat(80));

        for (i, result) in results.iter().enumerate() {
            println!(
                "{:<4} | {:<18} | {:>8.2} | {:>8.2} | {:>8.1} | {:>7} | {:>7.2} | {:<11}",
                i + 1,
                result.strategy_id(),
                result.total_return * 100.0,
                result.risk_metrics.sharpe_ratio,
                result.win_rate * 100.0,
                result.total_trades,
                result.max_drawdown * 100.0,
                result.provenance.strategy_tier.to_string()
            );
        }

        println!("{}\n", "=".repeat(80));
    }

    /// Prints the top steps of an optimization and its best configuration.
    pub fn print_optimization(&self, result: &OptimizationResult, top_n: usize) {
        let mut ranked: Vec<_> = result.history.iter().collect();
        ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        println!("\n{}", "=".repeat(80));
        println!(
            "✅ OPTIMIZATION COMPLETE ({}, {}) - Top {} of {} steps",
            result.method,
            result.fitness_metric,
            top_n.min(ranked.len()),
            ranked.len()
        );
        println!("{}", "=".repeat(80));

        println!(
            "{:<4} | {:<30} | {:>8} | {:>8} | {:>7} | {:>9}",
            "#", "Parameters", "Return%", "Sharpe", "Trades", "Fitness"
        );
        println!("{}", "-".repeat(80));

        for (i, step) in ranked.iter().take(top_n).enumerate() {
            println!(
                "{:<4} | {:<30} | {:>8.2} | {:>8.2} | {:>7} | {:>9.4}",
                i + 1,
                step.parameters.to_string(),
                step.result.total_return * 100.0,
                step.result.risk_metrics.sharpe_ratio,
                step.result.total_trades,
                step.fitness
            );
        }

        println!("{}", "-".repeat(80));
        println!("🏆 BEST CONFIGURATION: {}", result.best_parameters);
        println!("  Best Fitness:     {:.4}", result.best_fitness);
        println!("  Average Fitness:  {:.4}", result.average_fitness);
        println!("  Convergence:      {:.1}%", result.convergence);
        println!("  Duration:         {} ms", result.duration_ms);
        println!("{}\n", "=".repeat(80));
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(".")
    }
}
