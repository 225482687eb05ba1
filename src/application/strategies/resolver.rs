use super::fallback::{MockStrategy, StatisticalStrategy};
use super::registry::StrategyRegistry;
use super::traits::Strategy;
use crate::domain::backtest::ResolutionTier;
use crate::domain::errors::StrategyError;
use crate::domain::optimization::parameters::ParameterSet;
use crate::domain::ports::SignalStatsRepository;
use crate::domain::trading::types::{Candle, TradeSignal};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A strategy together with the tier that produced it
pub enum ResolvedStrategy {
    Registered(Box<dyn Strategy>),
    Statistical(StatisticalStrategy),
    Mock(MockStrategy),
}

impl ResolvedStrategy {
    pub fn tier(&self) -> ResolutionTier {
        match self {
            ResolvedStrategy::Registered(_) => ResolutionTier::Registered,
            ResolvedStrategy::Statistical(_) => ResolutionTier::Statistical,
            ResolvedStrategy::Mock(_) => ResolutionTier::Mock,
        }
    }

    fn inner(&mut self) -> &mut dyn Strategy {
        match self {
            ResolvedStrategy::Registered(s) => s.as_mut(),
            ResolvedStrategy::Statistical(s) => s,
            ResolvedStrategy::Mock(s) => s,
        }
    }
}

impl Strategy for ResolvedStrategy {
    fn name(&self) -> &str {
        match self {
            ResolvedStrategy::Registered(s) => s.name(),
            ResolvedStrategy::Statistical(s) => s.name(),
            ResolvedStrategy::Mock(s) => s.name(),
        }
    }

    fn initialize(&mut self) -> Result<(), StrategyError> {
        self.inner().initialize()
    }

    fn on_candle(&mut self, candle: &Candle) -> Option<TradeSignal> {
        self.inner().on_candle(candle)
    }

    fn cleanup(&mut self) {
        self.inner().cleanup()
    }
}

/// Resolves a strategy id through registry, then signal history, then mock.
#[derive(Clone)]
pub struct StrategyResolver {
    registry: Arc<StrategyRegistry>,
    signal_stats: Option<Arc<dyn SignalStatsRepository>>,
}

impl StrategyResolver {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        signal_stats: Option<Arc<dyn SignalStatsRepository>>,
    ) -> Self {
        Self {
            registry,
            signal_stats,
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Only malformed parameters for a registered strategy fail; unknown ids
    /// always resolve to a fallback.
    pub async fn resolve(
        &self,
        strategy_id: &str,
        params: &ParameterSet,
        seed: Option<u64>,
    ) -> Result<ResolvedStrategy, StrategyError> {
        if let Some(built) = self.registry.find(strategy_id, params) {
            debug!("StrategyResolver: '{}' resolved to registered implementation", strategy_id);
            return built.map(ResolvedStrategy::Registered);
        }

        if let Some(repo) = &self.signal_stats {
            match repo.average_confidence_and_count(strategy_id).await {
                Ok(stats) if stats.count > 0 => {
                    info!(
                        "StrategyResolver: '{}' not registered, using statistical fallback ({} signals, avg confidence {:.2})",
                        strategy_id, stats.count, stats.avg_confidence
                    );
                    return Ok(ResolvedStrategy::Statistical(StatisticalStrategy::new(
                        strategy_id,
                        stats,
                        seed,
                    )));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "StrategyResolver: signal history lookup failed for '{}': {}",
                        strategy_id, e
                    );
                }
            }
        }

        info!(
            "StrategyResolver: '{}' has no implementation or history, using mock signals",
            strategy_id
        );
        Ok(ResolvedStrategy::Mock(MockStrategy::new(strategy_id, seed)))
    }
}
