use super::synthetic::SyntheticCandleGenerator;
use crate::domain::backtest::DataOrigin;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::CandleSource;
use crate::domain::trading::types::Candle;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Candles for one symbol plus where they came from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCandles {
    pub candles: Vec<Candle>,
    pub origin: DataOrigin,
}

/// Loads candles from the configured source, falling back to synthetic data
/// on any failure. `load` never fails.
#[derive(Clone)]
pub struct MarketDataProvider {
    source: Option<Arc<dyn CandleSource>>,
    timeout: Duration,
    synthetic: SyntheticCandleGenerator,
}

impl MarketDataProvider {
    pub fn new(source: Option<Arc<dyn CandleSource>>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            synthetic: SyntheticCandleGenerator::default(),
        }
    }

    /// Provider with no external source; every load is synthetic
    pub fn synthetic_only() -> Self {
        Self::new(None, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_generator(mut self, generator: SyntheticCandleGenerator) -> Self {
        self.synthetic = generator;
        self
    }

    pub async fn load(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
        seed: Option<u64>,
    ) -> LoadedCandles {
        let Some(source) = &self.source else {
            debug!("MarketData: no source configured for {}, generating synthetic bars", symbol);
            return self.synthetic(symbol, start, end, seed);
        };

        let fetch = source.fetch(symbol, timeframe, start, end);
        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(candles)) => {
                let candles = normalize(candles, start, end);
                info!(
                    "MarketData: loaded {} bars for {} from {}",
                    candles.len(),
                    symbol,
                    source.name()
                );
                LoadedCandles {
                    candles,
                    origin: DataOrigin::Live,
                }
            }
            Ok(Err(e)) => {
                warn!(
                    "MarketData: {} fetch failed for {}: {:#}. Using synthetic data.",
                    source.name(),
                    symbol,
                    e
                );
                self.synthetic(symbol, start, end, seed)
            }
            Err(_) => {
                warn!(
                    "MarketData: {} fetch for {} timed out after {:?}. Using synthetic data.",
                    source.name(),
                    symbol,
                    self.timeout
                );
                self.synthetic(symbol, start, end, seed)
            }
        }
    }

    fn synthetic(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        seed: Option<u64>,
    ) -> LoadedCandles {
        LoadedCandles {
            candles: self.synthetic.generate(symbol, start, end, seed),
            origin: DataOrigin::Synthetic,
        }
    }
}

/// Keeps bars inside the inclusive date range, oldest first, one per timestamp.
fn normalize(mut candles: Vec<Candle>, start: NaiveDate, end: NaiveDate) -> Vec<Candle> {
    candles.retain(|c| {
        let day = c.timestamp.date_naive();
        day >= start && day <= end
    });
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    candles
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    struct FixedSource(Vec<Candle>);

    #[async_trait]
    impl CandleSource for FixedSource {
        async fn fetch(
            &self,
            _symbol: &str,
            _interval: Timeframe,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Candle>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct SlowSource;

    #[async_trait]
    impl CandleSource for SlowSource {
        async fn fetch(
            &self,
            _symbol: &str,
            _interval: Timeframe,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Candle>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn candle(day: u32) -> Candle {
        Candle {
            symbol: "TEST".to_string(),
            interval: "1Day".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: dec!(10),
            high: dec!(11),
            low: dec!(9),
            close: dec!(10),
            volume: dec!(100),
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_live_data_is_sorted_and_clipped() {
        let source = FixedSource(vec![candle(5), candle(2), candle(3), candle(3), candle(20)]);
        let provider = MarketDataProvider::new(Some(Arc::new(source)), DEFAULT_FETCH_TIMEOUT);

        let loaded = provider
            .load("TEST", Timeframe::OneDay, date(1), date(10), None)
            .await;

        assert_eq!(loaded.origin, DataOrigin::Live);
        let days: Vec<u32> = loaded
            .candles
            .iter()
            .map(|c| chrono::Datelike::day(&c.timestamp))
            .collect();
        assert_eq!(days, vec![2, 3, 5]);
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_synthetic() {
        let provider =
            MarketDataProvider::new(Some(Arc::new(SlowSource)), Duration::from_millis(20));

        let loaded = provider
            .load("TEST", Timeframe::OneDay, date(1), date(10), Some(5))
            .await;

        assert_eq!(loaded.origin, DataOrigin::Synthetic);
        assert_eq!(loaded.candles.len(), 10);
    }

    #[tokio::test]
    async fn test_no_source_is_synthetic() {
        let loaded = MarketDataProvider::synthetic_only()
            .load("TEST", Timeframe::OneDay, date(1), date(3), Some(1))
            .await;
        assert_eq!(loaded.origin, DataOrigin::Synthetic);
        assert_eq!(loaded.candles.len(), 3);
    }
}
