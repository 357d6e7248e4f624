//! One-minute OHLC candles per outcome side

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One wall-clock-minute OHLC candle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Minute bucket (unix epoch minutes)
    pub minute: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Start of the bucket
    pub start_time: DateTime<Utc>,
}

impl Candle {
    fn new(minute: i64, price: Decimal) -> Self {
        Self {
            minute,
            open: price,
            high: price,
            low: price,
            close: price,
            start_time: Utc
                .timestamp_opt(minute * 60, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }

    fn absorb(&mut self, price: Decimal) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }
}

/// Live candle plus a bounded archive of finished ones
#[derive(Debug)]
pub struct CandleTracker {
    live: Option<Candle>,
    archive: VecDeque<Candle>,
    max_archive: usize,
}

impl CandleTracker {
    /// Create a tracker keeping at most `max_archive` finished candles
    pub fn new(max_archive: usize) -> Self {
        Self {
            live: None,
            archive: VecDeque::new(),
            max_archive,
        }
    }

    /// Record a price, rolling the candle when the minute changes
    pub fn record(&mut self, timestamp: DateTime<Utc>, price: Decimal) {
        let minute = timestamp.timestamp() / 60;
        match &mut self.live {
            Some(candle) if candle.minute == minute => candle.absorb(price),
            Some(candle) => {
                // Minute rolled over: archive the finished candle and open
                // the new one at the latest price
                let finished = *candle;
                self.archive.push_back(finished);
                while self.archive.len() > self.max_archive {
                    self.archive.pop_front();
                }
                self.live = Some(Candle::new(minute, price));
            }
            None => self.live = Some(Candle::new(minute, price)),
        }
    }

    /// The candle currently forming
    pub fn live(&self) -> Option<&Candle> {
        self.live.as_ref()
    }

    /// Most recently finished candle
    pub fn previous(&self) -> Option<&Candle> {
        self.archive.back()
    }

    /// Finished candles, oldest first
    pub fn archive(&self) -> impl Iterator<Item = &Candle> {
        self.archive.iter()
    }

    /// Bullish check on the forming candle
    ///
    /// Bullish when the live close is at or above its open, or at or above
    /// the previous candle's close. The second arm tolerates a pullback
    /// within the current minute after a down minute.
    pub fn is_bullish(&self) -> bool {
        let Some(live) = self.live() else {
            return false;
        };
        if live.close >= live.open {
            return true;
        }
        match self.previous() {
            Some(prev) => live.close >= prev.close,
            None => false,
        }
    }
}
