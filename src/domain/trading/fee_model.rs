use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct TradeCost {
    pub commission: Decimal,
    pub slippage_cost: Decimal,
    pub total_impact: Decimal,
}

/// Commission and slippage, both expressed as a fraction of notional value
/// (e.g. 0.001 = 0.1%). Applied once per side of a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentFeeModel {
    pub commission_pct: Decimal,
    pub slippage_pct: Decimal,
}

impl PercentFeeModel {
    pub fn new(commission_pct: Decimal, slippage_pct: Decimal) -> Self {
        Self {
            commission_pct,
            slippage_pct,
        }
    }

    pub fn zero() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO)
    }

    /// Calculate the cost of filling `quantity` units at `price`.
    pub fn calculate_cost(&self, quantity: u64, price: Decimal) -> TradeCost {
        let trade_value = Decimal::from(quantity) * price;
        let commission = trade_value * self.commission_pct;
        let slippage_cost = trade_value * self.slippage_pct;

        TradeCost {
            commission,
            slippage_cost,
            total_impact: commission + slippage_cost,
        }
    }

    pub fn description(&self) -> String {
        format!(
            "Percent Fee Model (Com: {:.3}%, Slip: {:.3}%)",
            self.commission_pct * Decimal::from(100),
            self.slippage_pct * Decimal::from(100)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cost_scales_with_notional() {
        let model = PercentFeeModel::new(dec!(0.001), dec!(0.0005));
        let cost = model.calculate_cost(100, dec!(50));

        // notional 5000 -> commission 5, slippage 2.5
        assert_eq!(cost.commission, dec!(5));
        assert_eq!(cost.slippage_cost, dec!(2.5));
        assert_eq!(cost.total_impact, dec!(7.5));
    }

    #[test]
    fn test_zero_model_is_free() {
        let cost = PercentFeeModel::zero().calculate_cost(10, dec!(123.45));
        assert_eq!(cost.total_impact, Decimal::ZERO);
        assert!(PercentFeeModel::zero().description().contains("0.000%"));
    }
}
