//! Prometheus metrics

use metrics::{counter, gauge, histogram};

/// Count an admitted decision by strategy and reason
pub fn record_decision(strategy: &'static str, reason: &'static str) {
    counter!("updown_decisions_total", "strategy" => strategy, "reason" => reason).increment(1);
}

/// Count a skipped tick by strategy and reason
///
/// Skip counts are the main tuning signal: a strategy that never trades
/// shows exactly which gate it keeps dying on.
pub fn record_skip(strategy: &'static str, reason: &'static str) {
    counter!("updown_skips_total", "strategy" => strategy, "reason" => reason).increment(1);
}

/// Count a confirmed fill
pub fn record_fill(strategy: &'static str, action: &'static str) {
    counter!("updown_fills_total", "strategy" => strategy, "action" => action).increment(1);
}

/// Latest account equity in dollars
pub fn set_equity(value: f64) {
    gauge!("updown_equity_usd").set(value);
}

/// Number of strategies holding a position
pub fn set_open_positions(count: f64) {
    gauge!("updown_open_positions").set(count);
}

/// Observed market response latency in milliseconds
pub fn record_lag_latency(latency_ms: f64) {
    histogram!("updown_lag_response_latency_ms").record(latency_ms);
}
