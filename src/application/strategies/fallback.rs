//! Stand-in strategies used when no concrete implementation is registered.

use super::traits::Strategy;
use crate::domain::ports::SignalStats;
use crate::domain::trading::types::{Candle, Direction, TradeSignal};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Per-bar firing probability of the mock generator
pub const MOCK_FIRE_PROBABILITY: f64 = 0.05;

/// Confidence noise applied around the historical average
pub const STATISTICAL_NOISE: f64 = 0.1;

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn random_direction(rng: &mut StdRng) -> Direction {
    if rng.random_bool(0.5) {
        Direction::Long
    } else {
        Direction::Short
    }
}

/// Replays the historical signal profile of a strategy id: fires with
/// probability equal to the average confidence, in a random direction.
pub struct StatisticalStrategy {
    id: String,
    avg_confidence: f64,
    rng: StdRng,
}

impl StatisticalStrategy {
    pub fn new(id: &str, stats: SignalStats, seed: Option<u64>) -> Self {
        Self {
            id: id.to_string(),
            avg_confidence: normalize_confidence(stats.avg_confidence),
            rng: seeded_rng(seed),
        }
    }

    pub fn fire_probability(&self) -> f64 {
        self.avg_confidence
    }
}

/// Maps stored confidences to [0, 1]; values above 1 are read as percentages.
pub fn normalize_confidence(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    let scaled = if raw > 1.0 { raw / 100.0 } else { raw };
    scaled.clamp(0.0, 1.0)
}

impl Strategy for StatisticalStrategy {
    fn name(&self) -> &str {
        &self.id
    }

    fn on_candle(&mut self, candle: &Candle) -> Option<TradeSignal> {
        if !self.rng.random_bool(self.avg_confidence) {
            return None;
        }

        let direction = random_direction(&mut self.rng);
        let noise = self.rng.random_range(-STATISTICAL_NOISE..=STATISTICAL_NOISE);
        Some(TradeSignal::new(
            candle,
            &self.id,
            direction,
            self.avg_confidence + noise,
        ))
    }
}

/// Low-rate random signal generator for strategy ids with no history.
pub struct MockStrategy {
    id: String,
    rng: StdRng,
}

impl MockStrategy {
    pub fn new(id: &str, seed: Option<u64>) -> Self {
        Self {
            id: id.to_string(),
            rng: seeded_rng(seed),
        }
    }
}

impl Strategy for MockStrategy {
    fn name(&self) -> &str {
        &self.id
    }

    fn on_candle(&mut self, candle: &Candle) -> Option<TradeSignal> {
        if !self.rng.random_bool(MOCK_FIRE_PROBABILITY) {
            return None;
        }

        let direction = random_direction(&mut self.rng);
        let confidence = self.rng.random_range(0.6..=0.9);
        Some(TradeSignal::new(candle, &self.id, direction, confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn candles(n: i64) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                symbol: "TEST".to_string(),
                interval: "1Day".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i),
                open: dec!(100),
                high: dec!(101),
                low: dec!(99),
                close: dec!(100),
                volume: dec!(1000),
            })
            .collect()
    }

    #[test]
    fn test_normalize_confidence() {
        assert_eq!(normalize_confidence(0.7), 0.7);
        assert_eq!(normalize_confidence(70.0), 0.7);
        assert_eq!(normalize_confidence(250.0), 1.0);
        assert_eq!(normalize_confidence(-3.0), 0.0);
        assert_eq!(normalize_confidence(f64::NAN), 0.0);
    }

    #[test]
    fn test_mock_fires_rarely() {
        let mut strategy = MockStrategy::new("unknown", Some(42));
        let fired = candles(2000)
            .iter()
            .filter_map(|c| strategy.on_candle(c))
            .inspect(|s| assert!((0.6..=0.9).contains(&s.confidence)))
            .count();

        // 5% of 2000 = 100
        assert!(fired > 50 && fired < 160, "fired {}", fired);
    }

    #[test]
    fn test_statistical_tracks_average_confidence() {
        let stats = SignalStats {
            count: 12,
            avg_confidence: 0.8,
        };
        let mut strategy = StatisticalStrategy::new("legacy", stats, Some(7));
        assert_eq!(strategy.fire_probability(), 0.8);

        let signals: Vec<_> = candles(1000)
            .iter()
            .filter_map(|c| strategy.on_candle(c))
            .collect();

        assert!(signals.len() > 700 && signals.len() < 900);
        assert!(
            signals
                .iter()
                .all(|s| s.confidence >= 0.7 - 1e-9 && s.confidence <= 0.9 + 1e-9)
        );
        assert!(signals.iter().any(|s| s.direction == Direction::Long));
        assert!(signals.iter().any(|s| s.direction == Direction::Short));
    }

    #[test]
    fn test_same_seed_same_signals() {
        let run = || {
            let mut strategy = MockStrategy::new("unknown", Some(99));
            candles(500)
                .iter()
                .map(|c| strategy.on_candle(c).map(|s| (s.direction, s.timestamp)))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
