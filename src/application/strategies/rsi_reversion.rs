use super::traits::Strategy;
use crate::domain::errors::StrategyError;
use crate::domain::optimization::parameters::ParameterSet;
use crate::domain::trading::types::{Candle, Direction, TradeSignal};
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use ta::Next;
use ta::indicators::RelativeStrengthIndex;

struct SymbolState {
    rsi: RelativeStrengthIndex,
    bars: usize,
    last_rsi: Option<f64>,
}

/// RSI mean reversion.
///
/// LONG when RSI climbs back above `oversold`, SHORT when it falls back
/// below `overbought`.
pub struct RsiReversionStrategy {
    id: String,
    period: usize,
    oversold: f64,
    overbought: f64,
    states: HashMap<String, SymbolState>,
}

impl RsiReversionStrategy {
    pub fn new(
        id: &str,
        period: usize,
        oversold: f64,
        overbought: f64,
    ) -> Result<Self, StrategyError> {
        RelativeStrengthIndex::new(period).map_err(|e| StrategyError::Indicator(e.to_string()))?;

        if !(0.0..=100.0).contains(&oversold) || !(0.0..=100.0).contains(&overbought) {
            return Err(StrategyError::InvalidParameter {
                name: "oversold/overbought".to_string(),
                reason: "thresholds must be within [0, 100]".to_string(),
            });
        }
        if oversold >= overbought {
            return Err(StrategyError::InvalidParameter {
                name: "oversold".to_string(),
                reason: format!("{} must be below overbought {}", oversold, overbought),
            });
        }

        Ok(Self {
            id: id.to_string(),
            period,
            oversold,
            overbought,
            states: HashMap::new(),
        })
    }

    pub fn from_parameters(id: &str, params: &ParameterSet) -> Result<Self, StrategyError> {
        Self::new(
            id,
            params.get_period("period", 14)?,
            params.get_f64("oversold", 30.0)?,
            params.get_f64("overbought", 70.0)?,
        )
    }
}

impl Strategy for RsiReversionStrategy {
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
            let rsi = RelativeStrengthIndex::new(self.period).ok()?;
            self.states.insert(
                candle.symbol.clone(),
                SymbolState {
                    rsi,
                    bars: 0,
                    last_rsi: None,
                },
            );
        }
        let state = self.states.get_mut(&candle.symbol)?;

        let rsi = state.rsi.next(close);
        state.bars += 1;
        // Needs period + 1 closes for the first meaningful value
        if state.bars <= self.period {
            return None;
        }

        let previous = state.last_rsi.replace(rsi)?;

        if previous <= self.oversold && rsi > self.oversold {
            let depth = (self.oversold - previous.min(self.oversold)) / self.oversold.max(1.0);
            return Some(TradeSignal::new(
                candle,
                &self.id,
                Direction::Long,
                0.6 + depth.min(0.4),
            ));
        }

        if previous >= self.overbought && rsi < self.overbought {
            let height =
                (previous.max(self.overbought) - self.overbought) / (100.0 - self.overbought).max(1.0);
            return Some(TradeSignal::new(
                candle,
                &self.id,
                Direction::Short,
                0.6 + height.min(0.4),
            ));
        }

        None
    }

    fn cleanup(&mut self) {
        self.states.clear();
    }
}
