use crate::domain::trading::types::TradeSignal;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Minimum signal confidence the risk gate accepts
pub const MIN_SIGNAL_CONFIDENCE: f64 = 0.5;

/// Caps applied to every simulated trade.
///
/// `max_position_size` and `max_daily_loss` are currency amounts;
/// `stop_loss_pct` and `take_profit_pct` are fractions of the entry price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    pub max_position_size: Decimal,
    pub max_daily_loss: Decimal,
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            max_position_size: dec!(10000),
            max_daily_loss: dec!(1000),
            stop_loss_pct: dec!(0.02),
            take_profit_pct: dec!(0.04),
        }
    }
}

/// Result of a risk validation check
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Validation passed, trade can proceed
    Approve,
    /// Validation failed, trade should be rejected with a reason
    Reject(String),
}

impl ValidationResult {
    pub fn is_approved(&self) -> bool {
        matches!(self, ValidationResult::Approve)
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            ValidationResult::Reject(reason) => Some(reason),
            ValidationResult::Approve => None,
        }
    }
}

/// Account state the gate needs at signal time
#[derive(Debug, Clone, Copy)]
pub struct GateContext {
    pub capital: Decimal,
    pub daily_pnl: Decimal,
    pub position_size: Decimal,
}

/// Pre-trade checks applied to each emitted signal, in order:
/// daily loss limit, position size vs. remaining capital, confidence floor.
#[derive(Debug, Clone, Copy)]
pub struct RiskGate {
    policy: RiskPolicy,
}

impl RiskGate {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Position size after applying the policy cap
    pub fn effective_position_size(&self, requested: Decimal) -> Decimal {
        requested.min(self.policy.max_position_size)
    }

    pub fn validate(&self, signal: &TradeSignal, ctx: &GateContext) -> ValidationResult {
        if ctx.daily_pnl < -self.policy.max_daily_loss {
            return ValidationResult::Reject(format!(
                "Daily loss limit breached: {} < -{}",
                ctx.daily_pnl.round_dp(2),
                self.policy.max_daily_loss
            ));
        }

        if ctx.position_size > ctx.capital {
            return ValidationResult::Reject(format!(
                "Position size {} exceeds remaining capital {}",
                ctx.position_size,
                ctx.capital.round_dp(2)
            ));
        }

        if signal.confidence < MIN_SIGNAL_CONFIDENCE {
            return ValidationResult::Reject(format!(
                "Confidence {:.2} below {:.2}",
                signal.confidence, MIN_SIGNAL_CONFIDENCE
            ));
        }

        ValidationResult::Approve
    }
}
