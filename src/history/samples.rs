//! Rolling spot price samples
//!
//! Append-only sequence pruned to a fixed horizon. Samples landing within
//! the dedupe interval of the previous one are dropped so a bursty feed
//! cannot flood the window.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A single spot price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotSample {
    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
    /// Observed price
    pub price: Decimal,
}

/// Bounded spot price history
#[derive(Debug)]
pub struct SpotHistory {
    horizon: Duration,
    dedupe: Duration,
    samples: VecDeque<SpotSample>,
}

impl SpotHistory {
    /// Create a history with the given horizon and dedupe interval
    pub fn new(horizon_secs: u64, dedupe_ms: i64) -> Self {
        Self {
            horizon: Duration::seconds(horizon_secs as i64),
            dedupe: Duration::milliseconds(dedupe_ms),
            samples: VecDeque::new(),
        }
    }

    /// Record a sample, pruning anything older than the horizon
    ///
    /// Returns false when the sample was dropped as a duplicate.
    pub fn record(&mut self, timestamp: DateTime<Utc>, price: Decimal) -> bool {
        if let Some(last) = self.samples.back() {
            if timestamp - last.timestamp < self.dedupe {
                return false;
            }
        }
        self.samples.push_back(SpotSample { timestamp, price });

        let cutoff = timestamp - self.horizon;
        while let Some(front) = self.samples.front() {
            if front.timestamp < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
        true
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<SpotSample> {
        self.samples.back().copied()
    }

    /// Newest sample at or before the given instant
    pub fn at_or_before(&self, instant: DateTime<Utc>) -> Option<SpotSample> {
        self.samples
            .iter()
            .rev()
            .find(|s| s.timestamp <= instant)
            .copied()
    }

    /// Latest price minus the price `window_secs` ago
    ///
    /// `None` until the history actually spans the window; a short history
    /// must not masquerade as a flat market.
    pub fn delta_over_seconds(&self, now: DateTime<Utc>, window_secs: u64) -> Option<Decimal> {
        let latest = self.latest()?;
        let reference = self.at_or_before(now - Duration::seconds(window_secs as i64))?;
        Some(latest.price - reference.price)
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples are retained
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Seconds covered by the retained samples
    pub fn span_secs(&self) -> i64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_seconds(),
            _ => 0,
        }
    }
}
