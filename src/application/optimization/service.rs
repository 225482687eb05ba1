use crate::application::optimization::engine::OptimizationEngine;
use crate::application::optimization::simulator::Simulator;
use crate::domain::backtest::{BacktestConfig, BacktestResult};
use crate::domain::errors::{BacktestError, OptimizationError};
use crate::domain::optimization::parameters::{ParameterSet, ParameterSpace, space_size};
use crate::domain::optimization::types::{OptimizationConfig, OptimizationResult, SearchMethod};
use std::sync::Arc;
use tracing::{info, warn};

/// Entry point for backtests, strategy comparisons and parameter searches.
#[derive(Clone)]
pub struct BacktestService {
    simulator: Simulator,
    engine: Arc<OptimizationEngine>,
}

impl BacktestService {
    pub fn new(simulator: Simulator) -> Self {
        let engine = Arc::new(OptimizationEngine::new(simulator.clone()));
        Self { simulator, engine }
    }

    pub fn engine(&self) -> &OptimizationEngine {
        &self.engine
    }

    pub async fn run_backtest(
        &self,
        config: &BacktestConfig,
    ) -> Result<BacktestResult, BacktestError> {
        info!(
            "Backtest: {} on {:?} from {} to {}",
            config.strategy_id, config.symbols, config.start_date, config.end_date
        );
        let result = self.simulator.run(config).await?;
        if result.provenance.is_degraded() {
            warn!(
                "Backtest: {} result is degraded (strategy tier {}, data {:?})",
                config.strategy_id, result.provenance.strategy_tier, result.provenance.data
            );
        }
        Ok(result)
    }

    /// Runs each strategy on the shared settings of `base` (its strategy id
    /// is ignored). Sorted by descending total return; strategies that fail
    /// to build are skipped.
    pub async fn compare_strategies(
        &self,
        strategy_ids: &[String],
        base: &BacktestConfig,
    ) -> Result<Vec<BacktestResult>, BacktestError> {
        let mut results = Vec::with_capacity(strategy_ids.len());

        for id in strategy_ids {
            let config = base.with_strategy(id);
            match self.simulator.run(&config).await {
                Ok(result) => results.push(result),
                Err(e @ BacktestError::Strategy(_)) => {
                    warn!("Compare: skipping '{}': {}", id, e);
                }
                Err(e) => return Err(e),
            }
        }

        results.sort_by(|a, b| b.total_return.total_cmp(&a.total_return));
        Ok(results)
    }

    /// Exhaustive grid search over `domains`, ranked by total return.
    pub async fn optimize_parameters(
        &self,
        strategy_id: &str,
        base: &BacktestConfig,
        domains: ParameterSpace,
    ) -> Result<(ParameterSet, BacktestResult), OptimizationError> {
        let budget = space_size(&domains).max(1);
        let mut config = OptimizationConfig::new(base.with_strategy(strategy_id), domains);
        config.method = SearchMethod::Grid;
        config.max_iterations = budget;

        let result = self.engine.optimize_algorithm(config).await?;
        Ok((result.best_parameters, result.best_result))
    }

    pub async fn optimize_algorithm(
        &self,
        config: OptimizationConfig,
    ) -> Result<OptimizationResult, OptimizationError> {
        self.engine.optimize_algorithm(config).await
    }
}
