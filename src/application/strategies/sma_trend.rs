use super::traits::Strategy;
use crate::domain::errors::StrategyError;
use crate::domain::optimization::parameters::ParameterSet;
use crate::domain::trading::types::{Candle, Direction, TradeSignal};
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use ta::Next;
use ta::indicators::SimpleMovingAverage;

const DEFAULT_PERIOD: usize = 20;

struct SymbolState {
    sma: SimpleMovingAverage,
    bars: usize,
    was_above: Option<bool>,
}

/// Price vs. simple moving average crossover.
///
/// LONG when the close crosses above the average, SHORT when it crosses
/// below. Confidence starts at 0.6 and grows with the distance from the average.
pub struct SmaTrendStrategy {
    id: String,
    period: usize,
    states: HashMap<String, SymbolState>,
}

impl SmaTrendStrategy {
    pub fn new(id: &str, period: usize) -> Result<Self, StrategyError> {
        // Fail fast on a bad period rather than on the first bar
        SimpleMovingAverage::new(period).map_err(|e| StrategyError::Indicator(e.to_string()))?;
        Ok(Self {
            id: id.to_string(),
            period,
            states: HashMap::new(),
        })
    }

    pub fn from_parameters(id: &str, params: &ParameterSet) -> Result<Self, StrategyError> {
        Self::new(id, params.get_period("period", DEFAULT_PERIOD)?)
    }

    pub fn period(&self) -> usize {
        self.period
    }

    fn confidence(close: f64, average: f64) -> f64 {
        if average <= 0.0 {
            return 0.6;
        }
        let distance = ((close - average) / average).abs();
        (0.6 + distance * 10.0).min(1.0)
    }
}

impl Strategy for SmaTrendStrategy {
    fn name(&self) -> &str {
        &self.id
    }

    fn initialize(&mut self) -> Result<(), StrategyError> {
        self.states.clear();
        Ok(())
    }

    fn on_candle(&mut self, candle: &Candle) -> Option<TradeSignal> {
        let close = candle.close.to_f64()?;

        if !self.states.contains_key(&candle.symbol) {
            let sma = SimpleMovingAverage::new(self.period).ok()?;
            self.states.insert(
                candle.symbol.clone(),
                SymbolState {
                    sma,
                    bars: 0,
                    was_above: None,
                },
            );
        }
        let state = self.states.get_mut(&candle.symbol)?;

        let average = state.sma.next(close);
        state.bars += 1;
        if state.bars < self.period {
            return None;
        }

        let is_above = close > average;
        let previous = state.was_above.replace(is_above);

        let direction = match (previous, is_above) {
            (Some(false), true) => Direction::Long,
            (Some(true), false) => Direction::Short,
            _ => return None,
        };

        tracing::debug!(
            "SmaTrend [{}]: {} cross (close={:.2}, sma={:.2})",
            candle.symbol,
            direction,
            close,
            average
        );

        Some(TradeSignal::new(
            candle,
            &self.id,
            direction,
            Self::confidence(close, average),
        ))
    }

    fn cleanup(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn candle(symbol: &str, day: i64, close: f64) -> Candle {
        let price = Decimal::try_from(close).unwrap();
        Candle {
            symbol: symbol.to_string(),
            interval: "1Day".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: Decimal::from(1000),
        }
    }

    #[test]
    fn test_rejects_zero_period() {
        let params = ParameterSet::new().with("period", 0);
        assert!(matches!(
            SmaTrendStrategy::from_parameters("sma_trend", &params),
            Err(StrategyError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_default_period() {
        let strategy = SmaTrendStrategy::from_parameters("sma_trend", &ParameterSet::new()).unwrap();
        assert_eq!(strategy.period(), 20);

        let params = ParameterSet::new().with("period", json!(5));
        let strategy = SmaTrendStrategy::from_parameters("sma_trend", &params).unwrap();
        assert_eq!(strategy.period(), 5);
    }

    #[test]
    fn test_cross_up_then_down() {
        let mut strategy = SmaTrendStrategy::new("sma_trend", 3).unwrap();
        strategy.initialize().unwrap();

        // Declining prices stay below the average
        let mut signals = Vec::new();
        for (day, close) in [100.0, 98.0, 96.0, 94.0, 110.0, 112.0, 90.0].iter().enumerate() {
            signals.push(strategy.on_candle(&candle("TEST", day as i64, *close)));
        }

        assert!(signals[..4].iter().all(|s| s.is_none()));
        let up = signals[4].as_ref().unwrap();
        assert_eq!(up.direction, Direction::Long);
        assert!(up.confidence > 0.6 && up.confidence <= 1.0);
        assert!(signals[5].is_none());
        assert_eq!(signals[6].as_ref().unwrap().direction, Direction::Short);
    }

    #[test]
    fn test_state_is_per_symbol() {
        let mut strategy = SmaTrendStrategy::new("sma_trend", 2).unwrap();

        // Interleaved symbols must not share an average
        assert!(strategy.on_candle(&candle("AAA", 0, 10.0)).is_none());
        assert!(strategy.on_candle(&candle("BBB", 0, 1000.0)).is_none());
        assert!(strategy.on_candle(&candle("AAA", 1, 9.0)).is_none());
        assert!(strategy.on_candle(&candle("BBB", 1, 990.0)).is_none());
        let signal = strategy.on_candle(&candle("AAA", 2, 12.0)).unwrap();
        assert_eq!(signal.symbol, "AAA");
        assert_eq!(signal.direction, Direction::Long);
    }
}
