use super::always_buy::AlwaysBuyStrategy;
use super::rsi_reversion::RsiReversionStrategy;
use super::sma_trend::SmaTrendStrategy;
use super::traits::Strategy;
use crate::domain::errors::StrategyError;
use crate::domain::optimization::parameters::ParameterSet;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a fresh strategy instance for one run
pub type StrategyFactory =
    Arc<dyn Fn(&str, &ParameterSet) -> Result<Box<dyn Strategy>, StrategyError> + Send + Sync>;

/// Maps strategy ids to concrete implementations.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with `always_buy`, `sma_trend` and `rsi_reversion`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("always_buy", Arc::new(build_always_buy));
        registry.register("sma_trend", Arc::new(build_sma_trend));
        registry.register("rsi_reversion", Arc::new(build_rsi_reversion));
        registry
    }

    pub fn register(&mut self, id: &str, factory: StrategyFactory) {
        self.factories.insert(id.to_string(), factory);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// None when the id is not registered
    pub fn find(
        &self,
        id: &str,
        params: &ParameterSet,
    ) -> Option<Result<Box<dyn Strategy>, StrategyError>> {
        self.factories.get(id).map(|factory| factory(id, params))
    }
}

fn build_always_buy(id: &str, _params: &ParameterSet) -> Result<Box<dyn Strategy>, StrategyError> {
    Ok(Box::new(AlwaysBuyStrategy::new(id)))
}

fn build_sma_trend(id: &str, params: &ParameterSet) -> Result<Box<dyn Strategy>, StrategyError> {
    Ok(Box::new(SmaTrendStrategy::from_parameters(id, params)?))
}

fn build_rsi_reversion(id: &str, params: &ParameterSet) -> Result<Box<dyn Strategy>, StrategyError> {
    Ok(Box::new(RsiReversionStrategy::from_parameters(id, params)?))
}
