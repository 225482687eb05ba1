mod common;

use anyhow::{Result, bail};
use async_trait::async_trait;
use backtestr::application::market_data::MarketDataProvider;
use backtestr::application::optimization::service::BacktestService;
use backtestr::application::optimization::simulator::Simulator;
use backtestr::application::strategies::{StrategyRegistry, StrategyResolver};
use backtestr::domain::backtest::RunSummary;
use backtestr::domain::optimization::parameters::ParameterSpace;
use backtestr::domain::optimization::types::{OptimizationConfig, SearchMethod};
use backtestr::domain::ports::ResultSink;
use backtestr::infrastructure::MockCandleSource;
use common::{config, daily_candles, date, wave_closes};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Sink whose storage is always unavailable
#[derive(Default)]
struct BrokenSink {
    attempts: AtomicUsize,
}

#[async_trait]
impl ResultSink for BrokenSink {
    async fn append(&self, _summary: &RunSummary) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        bail!("database is locked")
    }
}

fn service_with(sink: Arc<BrokenSink>) -> BacktestService {
    let source = MockCandleSource::new().with_candles(
        "TEST",
        daily_candles("TEST", date(2024, 1, 1), &wave_closes(60)),
    );
    let provider = MarketDataProvider::new(Some(Arc::new(source)), Duration::from_secs(5));
    let resolver = StrategyResolver::new(Arc::new(StrategyRegistry::with_builtins()), None);
    BacktestService::new(Simulator::new(provider, resolver, Some(sink)))
}

#[tokio::test]
async fn test_backtest_completes_when_sink_fails() {
    let sink = Arc::new(BrokenSink::default());
    let service = service_with(sink.clone());

    let cfg = config("always_buy", &["TEST"], date(2024, 1, 1), date(2024, 2, 29));
    let result = service.run_backtest(&cfg).await.unwrap();

    assert!(result.total_trades > 0);
    assert_eq!(result.trades.len(), result.total_trades);
    assert_eq!(result.equity_curve.len(), 60);
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_optimization_completes_when_sink_fails() {
    let sink = Arc::new(BrokenSink::default());
    let service = service_with(sink.clone());

    let mut space = ParameterSpace::new();
    space.insert("period".to_string(), vec![json!(5), json!(10), json!(20)]);
    let mut base = config("sma_trend", &["TEST"], date(2024, 1, 1), date(2024, 2, 29));
    base.seed = Some(3);
    let mut cfg = OptimizationConfig::new(base, space);
    cfg.method = SearchMethod::Grid;
    cfg.max_iterations = 3;

    let result = service.optimize_algorithm(cfg).await.unwrap();

    assert_eq!(result.history.len(), 3);
    assert_eq!(result.best_result.equity_curve.len(), 60);
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
}
