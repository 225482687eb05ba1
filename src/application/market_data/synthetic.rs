use crate::domain::trading::types::Candle;
use chrono::{NaiveDate, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// Generates a bounded random walk with one daily bar per calendar day.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticCandleGenerator {
    /// Max absolute daily move as a fraction of the open
    pub daily_volatility: f64,
    pub min_base_price: f64,
    pub max_base_price: f64,
    /// Price never walks below this
    pub price_floor: f64,
}

impl Default for SyntheticCandleGenerator {
    fn default() -> Self {
        Self {
            daily_volatility: 0.02,
            min_base_price: 50.0,
            max_base_price: 500.0,
            price_floor: 1.0,
        }
    }
}

impl SyntheticCandleGenerator {
    /// Bars for every day in `[start, end]`, oldest first.
    pub fn generate(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        seed: Option<u64>,
    ) -> Vec<Candle> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ symbol_hash(symbol)),
            None => StdRng::from_os_rng(),
        };

        let mut price = rng.random_range(self.min_base_price..=self.max_base_price);
        let mut candles = Vec::new();

        for day in start.iter_days().take_while(|d| *d <= end) {
            let open = price;
            let change = rng.random_range(-self.daily_volatility..=self.daily_volatility);
            let close = (open * (1.0 + change)).max(self.price_floor);
            let wick = self.daily_volatility / 2.0;
            let high = open.max(close) * (1.0 + rng.random_range(0.0..=wick));
            let low = (open.min(close) * (1.0 - rng.random_range(0.0..=wick))).max(self.price_floor);
            let volume: u64 = rng.random_range(100_000..=1_000_000);

            let Some(timestamp) = day
                .and_hms_opt(0, 0, 0)
                .map(|dt| Utc.from_utc_datetime(&dt))
            else {
                continue;
            };

            candles.push(Candle {
                symbol: symbol.to_string(),
                interval: "1Day".to_string(),
                timestamp,
                open: to_price(open),
                high: to_price(high),
                low: to_price(low),
                close: to_price(close),
                volume: Decimal::from(volume),
            });

            price = close;
        }

        candles
    }
}

fn to_price(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ONE).round_dp(2)
}

/// Stable per-symbol seed offset (FNV-1a)
fn symbol_hash(symbol: &str) -> u64 {
    symbol.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_one_bar_per_calendar_day() {
        let generator = SyntheticCandleGenerator::default();
        let candles = generator.generate("TEST", date(2024, 1, 1), date(2024, 1, 10), Some(1));

        assert_eq!(candles.len(), 10);
        assert_eq!(candles[0].timestamp.date_naive(), date(2024, 1, 1));
        assert_eq!(candles[9].timestamp.date_naive(), date(2024, 1, 10));
        assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_bars_are_well_formed() {
        let generator = SyntheticCandleGenerator::default();
        for candle in generator.generate("TEST", date(2023, 1, 1), date(2023, 12, 31), Some(3)) {
            assert!(candle.low <= candle.open && candle.low <= candle.close);
            assert!(candle.high >= candle.open && candle.high >= candle.close);
            assert!(candle.low >= Decimal::ONE);
            assert!(candle.volume >= Decimal::from(100_000));
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let generator = SyntheticCandleGenerator::default();
        let a = generator.generate("AAPL", date(2024, 1, 1), date(2024, 3, 1), Some(11));
        let b = generator.generate("AAPL", date(2024, 1, 1), date(2024, 3, 1), Some(11));
        let other = generator.generate("MSFT", date(2024, 1, 1), date(2024, 3, 1), Some(11));

        assert_eq!(a, b);
        assert_ne!(a[0].close, other[0].close);
    }

    #[test]
    fn test_empty_range() {
        let generator = SyntheticCandleGenerator::default();
        assert!(generator
            .generate("TEST", date(2024, 1, 2), date(2024, 1, 1), Some(1))
            .is_empty());
    }
}
