use super::traits::Strategy;
use crate::domain::trading::types::{Candle, TradeSignal};

/// Emits a full-confidence LONG signal on every bar.
#[derive(Debug, Clone)]
pub struct AlwaysBuyStrategy {
    id: String,
}

impl AlwaysBuyStrategy {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

impl Default for AlwaysBuyStrategy {
    fn default() -> Self {
        Self::new("always_buy")
    }
}

impl Strategy for AlwaysBuyStrategy {
    fn name(&self) -> &str {
        &self.id
    }

    fn on_candle(&mut self, candle: &Candle) -> Option<TradeSignal> {
        Some(TradeSignal::long(candle, &self.id, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::types::Direction;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signals_every_bar() {
        let mut strategy = AlwaysBuyStrategy::default();
        let candle = Candle {
            symbol: "TEST".to_string(),
            interval: "1Day".to_string(),
            timestamp: Utc::now(),
            open: dec!(10),
            high: dec!(11),
            low: dec!(9),
            close: dec!(10.5),
            volume: dec!(1000),
        };

        for _ in 0..3 {
            let signal = strategy.on_candle(&candle).unwrap();
            assert_eq!(signal.direction, Direction::Long);
            assert_eq!(signal.confidence, 1.0);
            assert_eq!(signal.price, dec!(10.5));
            assert_eq!(signal.strategy_id, "always_buy");
        }
    }
}
