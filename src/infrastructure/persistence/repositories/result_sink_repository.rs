use crate::domain::backtest::RunSummary;
use crate::domain::ports::ResultSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqlitePool};

/// Append-only store for flattened run summaries
pub struct SqliteResultSink {
    pool: SqlitePool,
}

impl SqliteResultSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent summaries for one strategy, newest first.
    pub async fn find_by_strategy(&self, strategy_id: &str, limit: usize) -> Result<Vec<RunSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT strategy_id, run_date, trade_count, success_count, total_return_pct,
                   win_rate_pct, fitness_score, patterns_used
            FROM backtest_summaries
            WHERE strategy_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(strategy_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load backtest summaries")?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let date_str: String = row.try_get("run_date")?;
            let patterns_json: String = row.try_get("patterns_used")?;
            let trade_count: i64 = row.try_get("trade_count")?;
            let success_count: i64 = row.try_get("success_count")?;

            summaries.push(RunSummary {
                strategy_id: row.try_get("strategy_id")?,
                date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                    .with_context(|| format!("Invalid run date '{}'", date_str))?,
                trade_count: trade_count.max(0) as usize,
                success_count: success_count.max(0) as usize,
                total_return_pct: row.try_get("total_return_pct")?,
                win_rate_pct: row.try_get("win_rate_pct")?,
                fitness_score: row.try_get("fitness_score")?,
                patterns_used: serde_json::from_str(&patterns_json)
                    .context("Invalid patterns_used JSON")?,
            });
        }

        Ok(summaries)
    }
}

#[async_trait]
impl ResultSink for SqliteResultSink {
    async fn append(&self, summary: &RunSummary) -> Result<()> {
        let patterns_json = serde_json::to_string(&summary.patterns_used)?;

        sqlx::query(
            r#"
            INSERT INTO backtest_summaries
            (strategy_id, run_date, trade_count, success_count, total_return_pct,
             win_rate_pct, fitness_score, patterns_used, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&summary.strategy_id)
        .bind(summary.date.format("%Y-%m-%d").to_string())
        .bind(summary.trade_count as i64)
        .bind(summary.success_count as i64)
        .bind(summary.total_return_pct)
        .bind(summary.win_rate_pct)
        .bind(summary.fitness_score)
        .bind(patterns_json)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to save backtest summary")?;

        Ok(())
    }
}
