//! Execution engine module
//!
//! Order submission behind one trait: fill-or-kill in, fill confirmation
//! out. The paper engine simulates against its own cash account; a live
//! engine would wrap venue connectivity behind the same surface.

mod paper;
mod types;

pub use paper::PaperEngine;
pub use types::{Fill, Order, OrderAction, OrderId};

use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for execution engine implementations
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Submit a fill-or-kill order
    ///
    /// `Ok(Some(fill))` on a complete fill, `Ok(None)` when the order was
    /// killed. A killed order leaves no position behind.
    async fn submit_order(&self, order: &Order) -> anyhow::Result<Option<Fill>>;

    /// Cash available for new entries
    async fn available_balance(&self) -> anyhow::Result<Decimal>;
}
