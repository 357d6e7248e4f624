//! Taker flow over a short window against a longer baseline

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Aggressor side of a print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TakerSide {
    Buy,
    Sell,
}

/// A single taker print
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePrint {
    pub timestamp: DateTime<Utc>,
    pub side: TakerSide,
    pub size: Decimal,
    pub price: Decimal,
}

/// Flow metrics over the short window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowMetrics {
    /// Short-window volume per second over baseline volume per second
    pub volume_ratio: Decimal,
    /// Signed buy/sell imbalance in [-1, 1] over the short window
    pub imbalance: Decimal,
    /// Last print price minus first print price in the short window
    pub price_delta: Decimal,
}

/// Rolling taker print buffer
#[derive(Debug)]
pub struct FlowTracker {
    window: Duration,
    baseline: Duration,
    prints: VecDeque<TradePrint>,
}

impl FlowTracker {
    /// Create a tracker with the given short and baseline windows (seconds)
    pub fn new(window_secs: u64, baseline_secs: u64) -> Self {
        Self {
            window: Duration::seconds(window_secs as i64),
            baseline: Duration::seconds(baseline_secs as i64),
            prints: VecDeque::new(),
        }
    }

    /// Record a print, dropping anything older than the baseline window
    ///
    /// Out-of-order prints (at or before the latest retained timestamp) are
    /// ignored so a re-polled feed cannot double count.
    pub fn record(&mut self, print: TradePrint) -> bool {
        if let Some(last) = self.prints.back() {
            if print.timestamp <= last.timestamp {
                return false;
            }
        }
        self.prints.push_back(print);

        let cutoff = print.timestamp - self.baseline;
        while let Some(front) = self.prints.front() {
            if front.timestamp < cutoff {
                self.prints.pop_front();
            } else {
                break;
            }
        }
        true
    }

    /// Flow metrics at `now`
    ///
    /// `None` until the retained prints span most of the baseline window or
    /// the baseline volume is zero; a cold buffer has no baseline to compare
    /// against.
    pub fn metrics(&self, now: DateTime<Utc>) -> Option<FlowMetrics> {
        let oldest = self.prints.front()?;
        // Require at least half the baseline span before trusting the ratio
        if now - oldest.timestamp < self.baseline / 2 {
            return None;
        }

        let baseline_start = now - self.baseline;
        let window_start = now - self.window;

        let mut baseline_volume = Decimal::ZERO;
        let mut window_volume = Decimal::ZERO;
        let mut window_buys = Decimal::ZERO;
        let mut window_sells = Decimal::ZERO;
        let mut window_first_price: Option<Decimal> = None;
        let mut window_last_price = Decimal::ZERO;

        for print in &self.prints {
            if print.timestamp < baseline_start {
                continue;
            }
            baseline_volume += print.size;
            if print.timestamp >= window_start {
                window_volume += print.size;
                match print.side {
                    TakerSide::Buy => window_buys += print.size,
                    TakerSide::Sell => window_sells += print.size,
                }
                window_first_price.get_or_insert(print.price);
                window_last_price = print.price;
            }
        }

        if baseline_volume.is_zero() {
            return None;
        }

        let baseline_secs = Decimal::from(self.baseline.num_seconds().max(1));
        let window_secs = Decimal::from(self.window.num_seconds().max(1));
        let baseline_vps = baseline_volume / baseline_secs;
        let window_vps = window_volume / window_secs;

        let imbalance = if window_volume.is_zero() {
            Decimal::ZERO
        } else {
            (window_buys - window_sells) / window_volume
        };

        Some(FlowMetrics {
            volume_ratio: window_vps / baseline_vps,
            imbalance,
            price_delta: window_first_price
                .map(|first| window_last_price - first)
                .unwrap_or(Decimal::ZERO),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn print_at(t: DateTime<Utc>, side: TakerSide, size: Decimal, price: Decimal) -> TradePrint {
        TradePrint {
            timestamp: t,
            side,
            size,
            price,
        }
    }

    #[test]
    fn test_empty_tracker_yields_none() {
        let tracker = FlowTracker::new(10, 60);
        assert!(tracker.metrics(Utc::now()).is_none());
    }

    #[test]
    fn test_insufficient_baseline_yields_none() {
        let mut tracker = FlowTracker::new(10, 60);
        let t0 = Utc::now();

        // Only 5 seconds of data against a 60 second baseline
        tracker.record(print_at(t0, TakerSide::Buy, dec!(10), dec!(0.50)));
        tracker.record(print_at(
            t0 + Duration::seconds(5),
            TakerSide::Buy,
            dec!(10),
            dec!(0.51),
        ));

        assert!(tracker.metrics(t0 + Duration::seconds(5)).is_none());
    }

    #[test]
    fn test_burst_raises_volume_ratio() {
        let mut tracker = FlowTracker::new(10, 60);
        let t0 = Utc::now();

        // Steady 1-lot trickle for the baseline
        for i in 0..50 {
            tracker.record(print_at(
                t0 + Duration::seconds(i),
                TakerSide::Sell,
                dec!(1),
                dec!(0.50),
            ));
        }
        // Burst inside the short window
        for i in 0..8 {
            tracker.record(print_at(
                t0 + Duration::seconds(52) + Duration::milliseconds(i * 500),
                TakerSide::Buy,
                dec!(10),
                dec!(0.52),
            ));
        }

        let now = t0 + Duration::seconds(56);
        let metrics = tracker.metrics(now).unwrap();
        assert!(metrics.volume_ratio > dec!(1));
        assert!(metrics.imbalance > dec!(0.5));
    }

    #[test]
    fn test_imbalance_sign_matches_aggressors() {
        let mut tracker = FlowTracker::new(10, 40);
        let t0 = Utc::now();

        for i in 0..40 {
            let side = if i < 35 { TakerSide::Buy } else { TakerSide::Sell };
            tracker.record(print_at(
                t0 + Duration::seconds(i),
                side,
                dec!(2),
                dec!(0.50),
            ));
        }

        let now = t0 + Duration::seconds(40);
        let metrics = tracker.metrics(now).unwrap();
        // Window holds 5 buys then 5 sells: balanced
        assert_eq!(metrics.imbalance, dec!(0));

        let mut sell_heavy = FlowTracker::new(10, 40);
        for i in 0..40 {
            sell_heavy.record(print_at(
                t0 + Duration::seconds(i),
                TakerSide::Sell,
                dec!(2),
                dec!(0.50),
            ));
        }
        let metrics = sell_heavy.metrics(now).unwrap();
        assert_eq!(metrics.imbalance, dec!(-1));
    }

    #[test]
    fn test_price_delta_within_window() {
        let mut tracker = FlowTracker::new(10, 40);
        let t0 = Utc::now();

        for i in 0..40 {
            let price = dec!(0.50) + Decimal::new(i, 3);
            tracker.record(print_at(
                t0 + Duration::seconds(i),
                TakerSide::Buy,
                dec!(1),
                price,
            ));
        }

        let now = t0 + Duration::seconds(39);
        let metrics = tracker.metrics(now).unwrap();
        // Window spans prints at t=29..=39: 0.539 - 0.529
        assert_eq!(metrics.price_delta, dec!(0.010));
    }

    #[test]
    fn test_out_of_order_prints_ignored() {
        let mut tracker = FlowTracker::new(10, 60);
        let t0 = Utc::now();

        assert!(tracker.record(print_at(t0, TakerSide::Buy, dec!(1), dec!(0.50))));
        assert!(!tracker.record(print_at(
            t0 - Duration::seconds(1),
            TakerSide::Buy,
            dec!(1),
            dec!(0.50)
        )));
        assert!(!tracker.record(print_at(t0, TakerSide::Buy, dec!(1), dec!(0.50))));
    }
}
