use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trade direction of a signal or a simulated fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short. Used to orient price offsets.
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LONG" | "BUY" => Ok(Direction::Long),
            "SHORT" | "SELL" => Ok(Direction::Short),
            _ => anyhow::bail!("Invalid direction: {}. Must be 'LONG' or 'SHORT'", s),
        }
    }
}

/// One OHLCV bar. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub symbol: String,
    pub interval: String,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// A strategy's request to open a position on the current bar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeSignal {
    pub symbol: String,
    pub direction: Direction,
    /// Always within [0, 1].
    pub confidence: f64,
    pub strategy_id: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub quantity: Option<u64>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

impl TradeSignal {
    pub fn new(
        candle: &Candle,
        strategy_id: &str,
        direction: Direction,
        confidence: f64,
    ) -> Self {
        Self {
            symbol: candle.symbol.clone(),
            direction,
            confidence: confidence.clamp(0.0, 1.0),
            strategy_id: strategy_id.to_string(),
            timestamp: candle.timestamp,
            price: candle.close,
            quantity: None,
            stop_loss: None,
            take_profit: None,
        }
    }

    pub fn long(candle: &Candle, strategy_id: &str, confidence: f64) -> Self {
        Self::new(candle, strategy_id, Direction::Long, confidence)
    }

    pub fn short(candle: &Candle, strategy_id: &str, confidence: f64) -> Self {
        Self::new(candle, strategy_id, Direction::Short, confidence)
    }

    pub fn with_quantity(mut self, quantity: u64) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

/// A completed simulated round trip with realized P&L.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestTrade {
    pub id: String,
    pub symbol: String,
    pub side: Direction,
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: u64,
    /// Net of entry and exit commission and slippage.
    pub pnl: Decimal,
    pub pnl_pct: f64,
    pub holding_secs: i64,
}

impl BacktestTrade {
    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn candle() -> Candle {
        Candle {
            symbol: "AAPL".to_string(),
            interval: "1Day".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            open: dec!(100),
            high: dec!(102),
            low: dec!(99),
            close: dec!(101),
            volume: dec!(1000),
        }
    }

    #[test]
    fn test_signal_confidence_is_clamped() {
        let signal = TradeSignal::long(&candle(), "test", 1.7);
        assert_eq!(signal.confidence, 1.0);

        let signal = TradeSignal::short(&candle(), "test", -0.2);
        assert_eq!(signal.confidence, 0.0);
        assert_eq!(signal.price, dec!(101));
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!(Direction::from_str("buy").unwrap(), Direction::Long);
        assert_eq!(Direction::from_str("SHORT").unwrap(), Direction::Short);
        assert!(Direction::from_str("flat").is_err());
        assert_eq!(Direction::Short.sign(), dec!(-1));
    }
}
