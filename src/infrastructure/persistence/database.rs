use anyhow::{Context, Result};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Shared connection pool, injected into the repositories
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Ensure the directory exists if it's a file path
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let in_memory = db_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal); // Better for concurrency
        }

        // Every in-memory connection is its own database
        let max_connections = if in_memory { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        // 1. Run summaries (append-only)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS backtest_summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                strategy_id TEXT NOT NULL,
                run_date TEXT NOT NULL,
                trade_count INTEGER NOT NULL,
                success_count INTEGER NOT NULL,
                total_return_pct REAL NOT NULL,
                win_rate_pct REAL NOT NULL,
                fitness_score REAL NOT NULL,
                patterns_used TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create backtest_summaries table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_backtest_summaries_strategy
            ON backtest_summaries (strategy_id, run_date);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create backtest_summaries index")?;

        // 2. Historical trade signals
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trade_signals (
                id TEXT PRIMARY KEY,
                strategy_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                direction TEXT NOT NULL,
                confidence REAL NOT NULL,
                price TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create trade_signals table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_trade_signals_strategy
            ON trade_signals (strategy_id);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create trade_signals index")?;

        info!("Database schema initialized");
        Ok(())
    }
}
