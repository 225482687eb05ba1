use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::CandleSource;
use crate::domain::trading::types::Candle;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted candle source for tests and offline runs.
///
/// Returns the candles registered for a symbol (empty when none), or always
/// fails when built with `failing()`. An optional delay simulates a slow API.
#[derive(Clone, Default)]
pub struct MockCandleSource {
    candles: HashMap<String, Vec<Candle>>,
    fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockCandleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.candles.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches served so far, failures included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandleSource for MockCandleSource {
    async fn fetch(
        &self,
        symbol: &str,
        _interval: Timeframe,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<Candle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("MockCandleSource: simulated outage for {}", symbol);
        }
        Ok(self.candles.get(symbol).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
