#![allow(dead_code)]

use backtestr::application::market_data::MarketDataProvider;
use backtestr::application::optimization::service::BacktestService;
use backtestr::application::optimization::simulator::Simulator;
use backtestr::application::strategies::{StrategyRegistry, StrategyResolver};
use backtestr::domain::backtest::BacktestConfig;
use backtestr::domain::trading::types::Candle;
use backtestr::infrastructure::{InMemoryResultSink, InMemorySignalStatsRepository, MockCandleSource};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One daily bar per day from `start`, closes following `closes`.
pub fn daily_candles(symbol: &str, start: NaiveDate, closes: &[Decimal]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            let day = start + Duration::days(i as i64);
            Candle {
                symbol: symbol.to_string(),
                interval: "1Day".to_string(),
                timestamp: Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap()),
                open: *close,
                high: *close + dec!(1),
                low: *close - dec!(1),
                close: *close,
                volume: dec!(100000),
            }
        })
        .collect()
}

/// Deterministic zig-zag series: a slow uptrend with a 5-bar wobble.
pub fn wave_closes(n: usize) -> Vec<Decimal> {
    (0..n)
        .map(|i| {
            let trend = Decimal::from(100 + i as i64 / 2);
            let wobble = Decimal::from((i % 5) as i64 * 2) - dec!(4);
            trend + wobble
        })
        .collect()
}

pub struct Harness {
    pub service: BacktestService,
    pub sink: InMemoryResultSink,
    pub stats: InMemorySignalStatsRepository,
}

pub fn harness(source: MockCandleSource) -> Harness {
    harness_with_timeout(source, std::time::Duration::from_secs(5))
}

pub fn harness_with_timeout(source: MockCandleSource, timeout: std::time::Duration) -> Harness {
    let sink = InMemoryResultSink::new();
    let stats = InMemorySignalStatsRepository::new();

    let provider = MarketDataProvider::new(Some(Arc::new(source)), timeout);
    let resolver = StrategyResolver::new(
        Arc::new(StrategyRegistry::with_builtins()),
        Some(Arc::new(stats.clone())),
    );
    let simulator = Simulator::new(provider, resolver, Some(Arc::new(sink.clone())));

    Harness {
        service: BacktestService::new(simulator),
        sink,
        stats,
    }
}

pub fn config(strategy: &str, symbols: &[&str], start: NaiveDate, end: NaiveDate) -> BacktestConfig {
    BacktestConfig::new(
        strategy,
        symbols.iter().map(|s| s.to_string()).collect(),
        start,
        end,
    )
}
