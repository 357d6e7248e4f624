//! Paper trading execution engine

use super::{ExecutionEngine, Fill, Order, OrderAction, OrderId};
use crate::book::FeeModel;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

struct PaperAccount {
    cash: Decimal,
    fills: Vec<Fill>,
}

/// Paper execution engine with simulated fill-or-kill fills
///
/// Orders fill immediately at their limit price. Buys are killed when the
/// account cannot cover notional, fee and gas; settlement sells at $0 or $1
/// always fill.
pub struct PaperEngine {
    fee_model: FeeModel,
    gas_per_order: Decimal,
    account: Arc<RwLock<PaperAccount>>,
}

impl PaperEngine {
    /// Create a paper engine with the given starting cash
    pub fn new(fee_model: FeeModel, gas_per_order: Decimal, initial_cash: Decimal) -> Self {
        Self {
            fee_model,
            gas_per_order,
            account: Arc::new(RwLock::new(PaperAccount {
                cash: initial_cash,
                fills: vec![],
            })),
        }
    }

    /// All fills since the engine started
    pub async fn fills(&self) -> Vec<Fill> {
        self.account.read().await.fills.clone()
    }
}

#[async_trait]
impl ExecutionEngine for PaperEngine {
    async fn submit_order(&self, order: &Order) -> anyhow::Result<Option<Fill>> {
        let notional = order.price * Decimal::from(order.shares);
        let fee = self.fee_model.taker_fee(notional, order.price);

        let mut account = self.account.write().await;
        let fill = Fill {
            order_id: OrderId::new_v4(),
            token_id: order.token_id.clone(),
            action: order.action,
            price: order.price,
            shares: order.shares,
            notional,
            fee,
            gas: self.gas_per_order,
            timestamp: Utc::now(),
        };

        match order.action {
            OrderAction::Buy => {
                let cost = fill.total_cost();
                if cost > account.cash {
                    tracing::warn!(
                        token = %order.token_id,
                        cost = %cost,
                        cash = %account.cash,
                        "Paper buy killed, insufficient cash"
                    );
                    return Ok(None);
                }
                account.cash -= cost;
            }
            OrderAction::Sell => {
                account.cash += fill.net_proceeds();
            }
        }

        tracing::info!(
            order_id = %fill.order_id,
            token = %fill.token_id,
            action = ?fill.action,
            price = %fill.price,
            shares = fill.shares,
            fee = %fill.fee,
            "Paper order filled"
        );
        account.fills.push(fill.clone());
        Ok(Some(fill))
    }

    async fn available_balance(&self) -> anyhow::Result<Decimal> {
        Ok(self.account.read().await.cash)
    }
}
