use crate::application::market_data::MarketDataProvider;
use crate::application::optimization::service::BacktestService;
use crate::application::optimization::simulator::Simulator;
use crate::application::strategies::registry::StrategyRegistry;
use crate::application::strategies::resolver::StrategyResolver;
use crate::config::EngineConfig;
use crate::domain::ports::{CandleSource, ResultSink, SignalStatsRepository};
use crate::infrastructure::alpaca::AlpacaCandleSource;
use crate::infrastructure::persistence::Database;
use crate::infrastructure::persistence::repositories::{
    SqliteResultSink, SqliteSignalStatsRepository,
};
use crate::infrastructure::repositories::{InMemoryResultSink, InMemorySignalStatsRepository};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ServiceFactory;

impl ServiceFactory {
    /// Live candle source when credentials are configured.
    pub fn create_candle_source(config: &EngineConfig) -> Option<Arc<dyn CandleSource>> {
        if !config.market_data.has_credentials() {
            warn!("ServiceFactory: no market data credentials, runs will use synthetic data");
            return None;
        }
        let source = AlpacaCandleSource::new(
            config.market_data.api_key.clone(),
            config.market_data.api_secret.clone(),
            config.market_data.data_url.clone(),
            config.market_data.timeout(),
        );
        Some(Arc::new(source))
    }

    /// Wires the service against SQLite, or in-memory stores when `persist` is false.
    pub async fn create_service(config: &EngineConfig, persist: bool) -> Result<BacktestService> {
        let (sink, stats): (Arc<dyn ResultSink>, Arc<dyn SignalStatsRepository>) = if persist {
            let db = Database::new(&config.database_url).await?;
            (
                Arc::new(SqliteResultSink::new(db.pool.clone())),
                Arc::new(SqliteSignalStatsRepository::new(db.pool)),
            )
        } else {
            info!("ServiceFactory: persistence disabled, using in-memory stores");
            (
                Arc::new(InMemoryResultSink::new()),
                Arc::new(InMemorySignalStatsRepository::new()),
            )
        };

        let provider =
            MarketDataProvider::new(Self::create_candle_source(config), config.market_data.timeout());
        let resolver = StrategyResolver::new(Arc::new(StrategyRegistry::with_builtins()), Some(stats));
        let simulator = Simulator::new(provider, resolver, Some(sink));

        Ok(BacktestService::new(simulator))
    }
}
