//! Equity guard
//!
//! Tracks equity against its peak and the daily open, and halts new entries
//! when loss limits are breached. A halt never touches open positions; exits
//! keep evaluating so a losing day cannot also strand inventory.

mod limits;

pub use limits::{EquityGuard, HaltReason};
