//! Order book module
//!
//! Book state for the two outcome tokens plus the pure sweep and fee
//! arithmetic every sizing path is built on.

mod book;
mod fees;
mod sweep;

pub use book::OrderBook;
pub use fees::{normalize_fee_bps, FeeModel};
pub use sweep::{
    cost_to_buy, largest_feasible, max_shares_for_budget, proceeds_from_sell, BookError, SweepFill,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price level in the order book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price at this level
    pub price: Decimal,
    /// Total size available
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}
