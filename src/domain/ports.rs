use crate::domain::backtest::RunSummary;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::trading::types::Candle;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// External market data contract. Any error means "unavailable"; callers
/// decide on fallback and never inspect the error type.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        interval: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Candle>>;

    fn name(&self) -> &str;
}

/// Aggregate over the historical signals recorded for one strategy id
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalStats {
    pub count: u64,
    pub avg_confidence: f64,
}

/// Historical signal statistics lookup, used only by the statistical
/// fallback tier of strategy resolution.
#[async_trait]
pub trait SignalStatsRepository: Send + Sync {
    async fn average_confidence_and_count(&self, strategy_id: &str) -> Result<SignalStats>;
}

/// Append-only sink for flattened run summaries. Never read back by the engine.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn append(&self, summary: &RunSummary) -> Result<()>;
}
