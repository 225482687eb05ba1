//! In-memory implementations of the persistence ports.
//!
//! Thread-safe through `Arc<RwLock>`. Used by tests and by runs started
//! without a database URL; everything is lost on exit.

use crate::domain::backtest::RunSummary;
use crate::domain::ports::{ResultSink, SignalStats, SignalStatsRepository};
use crate::domain::trading::types::TradeSignal;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Collects run summaries in insertion order
#[derive(Clone, Default)]
pub struct InMemoryResultSink {
    summaries: Arc<RwLock<Vec<RunSummary>>>,
}

impl InMemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn summaries(&self) -> Vec<RunSummary> {
        self.summaries.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.summaries.read().await.len()
    }
}

#[async_trait]
impl ResultSink for InMemoryResultSink {
    async fn append(&self, summary: &RunSummary) -> Result<()> {
        self.summaries.write().await.push(summary.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemorySignalStatsRepository {
    signals: Arc<RwLock<Vec<TradeSignal>>>,
}

impl InMemorySignalStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_signal(&self, signal: &TradeSignal) {
        self.signals.write().await.push(signal.clone());
    }
}

#[async_trait]
impl SignalStatsRepository for InMemorySignalStatsRepository {
    async fn average_confidence_and_count(&self, strategy_id: &str) -> Result<SignalStats> {
        let signals = self.signals.read().await;
        let confidences: Vec<f64> = signals
            .iter()
            .filter(|s| s.strategy_id == strategy_id)
            .map(|s| s.confidence)
            .collect();

        if confidences.is_empty() {
            return Ok(SignalStats::default());
        }

        Ok(SignalStats {
            count: confidences.len() as u64,
            avg_confidence: confidences.iter().sum::<f64>() / confidences.len() as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::types::{Candle, Direction};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn signal(strategy_id: &str, confidence: f64) -> TradeSignal {
        let candle = Candle {
            symbol: "AAPL".to_string(),
            interval: "1Day".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100),
            volume: dec!(1000),
        };
        TradeSignal::new(&candle, strategy_id, Direction::Long, confidence)
    }

    #[tokio::test]
    async fn test_signal_stats_aggregate_per_strategy() {
        let repo = InMemorySignalStatsRepository::new();
        repo.record_signal(&signal("momentum", 0.6)).await;
        repo.record_signal(&signal("momentum", 0.8)).await;
        repo.record_signal(&signal("other", 0.1)).await;

        let stats = repo.average_confidence_and_count("momentum").await.unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.avg_confidence - 0.7).abs() < 1e-9);

        let empty = repo.average_confidence_and_count("unknown").await.unwrap();
        assert_eq!(empty, SignalStats::default());
    }

    #[tokio::test]
    async fn test_result_sink_keeps_insertion_order() {
        let sink = InMemoryResultSink::new();
        for (i, id) in ["a", "b"].iter().enumerate() {
            let summary = RunSummary {
                strategy_id: id.to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap(),
                trade_count: i,
                success_count: 0,
                total_return_pct: 0.0,
                win_rate_pct: 0.0,
                fitness_score: 0.0,
                patterns_used: vec![],
            };
            sink.append(&summary).await.unwrap();
        }

        let stored = sink.summaries().await;
        assert_eq!(sink.count().await, 2);
        assert_eq!(stored[0].strategy_id, "a");
        assert_eq!(stored[1].strategy_id, "b");
    }
}
