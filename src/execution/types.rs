//! Execution types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order identifier
pub type OrderId = Uuid;

/// Whether the order takes or releases inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Buy,
    Sell,
}

/// A fill-or-kill order for one outcome token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Token identifier
    pub token_id: String,
    /// Buy or sell
    pub action: OrderAction,
    /// Limit price
    pub price: Decimal,
    /// Integer share count
    pub shares: u64,
}

/// A confirmed fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// Order this fill confirms
    pub order_id: OrderId,
    /// Token that traded
    pub token_id: String,
    /// Buy or sell
    pub action: OrderAction,
    /// Execution price
    pub price: Decimal,
    /// Shares traded
    pub shares: u64,
    /// Price times shares
    pub notional: Decimal,
    /// Taker fee charged
    pub fee: Decimal,
    /// Gas charged for the submission
    pub gas: Decimal,
    /// Execution timestamp
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    /// Cash that left the account (buy) including fee and gas
    pub fn total_cost(&self) -> Decimal {
        self.notional + self.fee + self.gas
    }

    /// Cash that entered the account (sell) net of fee and gas
    pub fn net_proceeds(&self) -> Decimal {
        self.notional - self.fee - self.gas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fill(action: OrderAction) -> Fill {
        Fill {
            order_id: Uuid::new_v4(),
            token_id: "up-token".to_string(),
            action,
            price: dec!(0.50),
            shares: 100,
            notional: dec!(50),
            fee: dec!(0.5),
            gas: dec!(0.01),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_total_cost_includes_fee_and_gas() {
        let f = fill(OrderAction::Buy);
        assert_eq!(f.total_cost(), dec!(50.51));
    }

    #[test]
    fn test_net_proceeds_subtracts_fee_and_gas() {
        let f = fill(OrderAction::Sell);
        assert_eq!(f.net_proceeds(), dec!(49.49));
    }

    #[test]
    fn test_order_roundtrip_serde() {
        let order = Order {
            token_id: "down-token".to_string(),
            action: OrderAction::Sell,
            price: dec!(0.45),
            shares: 12,
        };
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back.token_id, "down-token");
        assert_eq!(back.action, OrderAction::Sell);
        assert_eq!(back.shares, 12);
    }
}
