//! World state shared with strategies
//!
//! The orchestrator is the sole writer. Strategies receive a `&WorldState`
//! per tick and read a consistent picture: one interval, one spot quote,
//! both books and both fees, all refreshed under the cadence guards.

use crate::book::OrderBook;
use crate::history::SignalHistory;
use crate::risk::HaltReason;
use crate::strategy::Side;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One recurring binary interval market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalMarket {
    /// Market identifier
    pub market_id: String,
    /// Token paying $1 on an up resolution
    pub up_token_id: String,
    /// Token paying $1 on a down resolution
    pub down_token_id: String,
    /// Reference price at interval open
    pub open_price: Decimal,
    /// Interval open time
    pub open_time: DateTime<Utc>,
    /// Interval close/settlement time
    pub close_time: DateTime<Utc>,
}

impl IntervalMarket {
    /// Seconds until the interval resolves, negative once past
    pub fn seconds_to_close(&self, now: DateTime<Utc>) -> i64 {
        (self.close_time - now).num_seconds()
    }

    /// Seconds since the interval opened
    pub fn seconds_since_open(&self, now: DateTime<Utc>) -> i64 {
        (now - self.open_time).num_seconds()
    }
}

/// A spot quote from one reference feed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotQuote {
    /// Observed price
    pub price: Decimal,
    /// Feed timestamp
    pub timestamp: DateTime<Utc>,
}

/// Everything a strategy can see on one tick
#[derive(Debug)]
pub struct WorldState {
    /// Snapshot time; strategies use this, never the wall clock
    pub now: DateTime<Utc>,
    /// Active interval, when resolved
    pub interval: Option<IntervalMarket>,
    /// Primary reference feed
    pub spot: Option<SpotQuote>,
    /// Independent secondary feed for divergence checks
    pub spot_secondary: Option<SpotQuote>,
    /// Up token book
    pub up_book: OrderBook,
    /// Down token book
    pub down_book: OrderBook,
    /// Up token taker fee in bps
    pub up_fee_bps: Option<Decimal>,
    /// Down token taker fee in bps
    pub down_fee_bps: Option<Decimal>,
    /// Rolling market history
    pub history: SignalHistory,
    /// Set while the equity guard has trading halted
    pub halted: Option<HaltReason>,
}

impl WorldState {
    /// Create an empty world
    pub fn new(history: SignalHistory) -> Self {
        Self {
            now: Utc::now(),
            interval: None,
            spot: None,
            spot_secondary: None,
            up_book: OrderBook::new(""),
            down_book: OrderBook::new(""),
            up_fee_bps: None,
            down_fee_bps: None,
            history,
            halted: None,
        }
    }

    /// Book for one side
    pub fn book(&self, side: Side) -> &OrderBook {
        match side {
            Side::Up => &self.up_book,
            Side::Down => &self.down_book,
        }
    }

    /// Taker fee in bps for one side
    pub fn fee_bps(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::Up => self.up_fee_bps,
            Side::Down => self.down_fee_bps,
        }
    }

    /// Candle tracker for one side
    pub fn candles(&self, side: Side) -> &crate::history::CandleTracker {
        match side {
            Side::Up => &self.history.up_candles,
            Side::Down => &self.history.down_candles,
        }
    }

    /// Flow tracker for one side
    pub fn flow(&self, side: Side) -> &crate::history::FlowTracker {
        match side {
            Side::Up => &self.history.up_flow,
            Side::Down => &self.history.down_flow,
        }
    }

    /// Mid price history for one side
    pub fn mids(&self, side: Side) -> &crate::history::SpotHistory {
        match side {
            Side::Up => &self.history.up_mids,
            Side::Down => &self.history.down_mids,
        }
    }

    /// Absolute divergence between the two spot feeds
    ///
    /// `None` when only one feed is reporting; a single feed cannot
    /// disagree with itself.
    pub fn feed_divergence(&self) -> Option<Decimal> {
        match (&self.spot, &self.spot_secondary) {
            (Some(primary), Some(secondary)) => Some((primary.price - secondary.price).abs()),
            _ => None,
        }
    }

    /// Whether the feeds disagree beyond the given threshold
    pub fn feeds_disagree(&self, threshold: Decimal) -> bool {
        matches!(self.feed_divergence(), Some(d) if d > threshold)
    }
}

/// Market data consumed per tick, transport left to the implementation
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Current interval metadata
    async fn current_interval(&self) -> anyhow::Result<IntervalMarket>;

    /// Primary spot quote
    async fn spot(&self) -> anyhow::Result<SpotQuote>;

    /// Secondary spot quote, when a second feed exists
    async fn spot_secondary(&self) -> anyhow::Result<Option<SpotQuote>> {
        Ok(None)
    }

    /// Top-of-book levels for a token, best first on both sides
    async fn order_book(&self, token_id: &str) -> anyhow::Result<OrderBook>;

    /// Raw taker fee for a token as reported by the venue
    ///
    /// `None` while the venue has not reported one; callers must skip the
    /// tick rather than assume zero.
    async fn taker_fee(&self, token_id: &str) -> anyhow::Result<Option<Decimal>>;

    /// Recent taker prints for a token, oldest first
    async fn recent_prints(&self, token_id: &str) -> anyhow::Result<Vec<crate::history::TradePrint>> {
        let _ = token_id;
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn interval() -> IntervalMarket {
        let now = Utc::now();
        IntervalMarket {
            market_id: "btc-updown-1".to_string(),
            up_token_id: "tok-up".to_string(),
            down_token_id: "tok-down".to_string(),
            open_price: dec!(95000),
            open_time: now - Duration::minutes(5),
            close_time: now + Duration::minutes(10),
        }
    }

    #[test]
    fn test_interval_clock() {
        let market = interval();
        let now = Utc::now();
        assert!(market.seconds_since_open(now) >= 299);
        assert!(market.seconds_to_close(now) <= 600);
    }

    #[test]
    fn test_feed_divergence_requires_both_feeds() {
        let mut world = WorldState::new(SignalHistory::default());
        assert_eq!(world.feed_divergence(), None);
        assert!(!world.feeds_disagree(dec!(1)));

        world.spot = Some(SpotQuote {
            price: dec!(95000),
            timestamp: Utc::now(),
        });
        assert_eq!(world.feed_divergence(), None);

        world.spot_secondary = Some(SpotQuote {
            price: dec!(95040),
            timestamp: Utc::now(),
        });
        assert_eq!(world.feed_divergence(), Some(dec!(40)));
        assert!(world.feeds_disagree(dec!(25)));
        assert!(!world.feeds_disagree(dec!(50)));
    }

    #[test]
    fn test_side_accessors() {
        let mut world = WorldState::new(SignalHistory::default());
        world.up_fee_bps = Some(dec!(100));
        assert_eq!(world.fee_bps(Side::Up), Some(dec!(100)));
        assert_eq!(world.fee_bps(Side::Down), None);
        assert_eq!(world.book(Side::Up).token_id, "");
    }
}
