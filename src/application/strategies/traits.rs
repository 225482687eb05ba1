use crate::domain::errors::StrategyError;
use crate::domain::trading::types::{Candle, TradeSignal};

/// Per-bar signal generator driven by the trade simulator.
///
/// The simulator calls `initialize` once, `on_candle` for every bar of every
/// symbol in chronological order, then `cleanup`. Bars of different symbols
/// are interleaved, so implementations keep indicator state per symbol.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    fn initialize(&mut self) -> Result<(), StrategyError> {
        Ok(())
    }

    /// At most one signal per bar
    fn on_candle(&mut self, candle: &Candle) -> Option<TradeSignal>;

    fn cleanup(&mut self) {}
}
