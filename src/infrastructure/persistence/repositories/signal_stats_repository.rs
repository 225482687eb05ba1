use crate::domain::ports::{SignalStats, SignalStatsRepository};
use crate::domain::trading::types::TradeSignal;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

pub struct SqliteSignalStatsRepository {
    pool: SqlitePool,
}

impl SqliteSignalStatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record_signal(&self, signal: &TradeSignal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trade_signals
            (id, strategy_id, symbol, direction, confidence, price, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&signal.strategy_id)
        .bind(&signal.symbol)
        .bind(signal.direction.to_string())
        .bind(signal.confidence)
        .bind(signal.price.to_string())
        .bind(signal.timestamp.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to save trade signal")?;

        Ok(())
    }
}

#[async_trait]
impl SignalStatsRepository for SqliteSignalStatsRepository {
    async fn average_confidence_and_count(&self, strategy_id: &str) -> Result<SignalStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS signal_count, AVG(confidence) AS avg_confidence FROM trade_signals WHERE strategy_id = ?",
        )
        .bind(strategy_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to aggregate trade signals")?;

        let count: i64 = row.try_get("signal_count")?;
        // AVG over zero rows is NULL
        let avg_confidence: Option<f64> = row.try_get("avg_confidence")?;

        Ok(SignalStats {
            count: count.max(0) as u64,
            avg_confidence: avg_confidence.unwrap_or(0.0),
        })
    }
}
