//! Simulated market data for paper runs
//!
//! A deterministic random-walk spot feed plus synthetic books priced off
//! the walk, rolling through 15-minute intervals. Lets the whole engine run
//! end to end with no venue connectivity; tests and the paper CLI mode both
//! drive it.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Mutex;

use super::world::{IntervalMarket, MarketData, SpotQuote};
use crate::book::{OrderBook, PriceLevel};
use crate::history::{TakerSide, TradePrint};

/// Interval length in seconds
const INTERVAL_SECS: i64 = 15 * 60;

struct SimInner {
    rng: u64,
    spot: Decimal,
    /// Open price of the interval currently being served
    interval_open_price: Decimal,
    interval_index: i64,
    last_print_at: DateTime<Utc>,
}

/// Deterministic simulated venue
pub struct SimMarketData {
    inner: Mutex<SimInner>,
    fee: Decimal,
}

impl SimMarketData {
    /// Create a sim starting at the given spot price
    pub fn new(seed: u64, start_spot: Decimal) -> Self {
        Self {
            inner: Mutex::new(SimInner {
                rng: seed.max(1),
                spot: start_spot,
                interval_open_price: start_spot,
                interval_index: 0,
                last_print_at: Utc::now(),
            }),
            fee: Decimal::new(1, 2), // 0.01, fraction form
        }
    }

    fn interval_index(now: DateTime<Utc>) -> i64 {
        now.timestamp() / INTERVAL_SECS
    }

    /// Implied up probability from the walk's distance to the open
    fn up_probability(spot: Decimal, open: Decimal) -> Decimal {
        if open.is_zero() {
            return Decimal::new(50, 2);
        }
        // Roughly 10 cents of probability per 0.1% of spot move
        let move_pct = (spot - open) / open * Decimal::ONE_HUNDRED;
        let prob = Decimal::new(50, 2) + move_pct;
        prob.max(Decimal::new(2, 2)).min(Decimal::new(98, 2))
    }
}

/// xorshift64 step, deterministic across runs for a fixed seed
fn next_rng(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

#[async_trait]
impl MarketData for SimMarketData {
    async fn current_interval(&self) -> anyhow::Result<IntervalMarket> {
        let now = Utc::now();
        let index = Self::interval_index(now);
        let open_ts = index * INTERVAL_SECS;
        let open_time = Utc
            .timestamp_opt(open_ts, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("invalid interval timestamp"))?;
        let close_time = Utc
            .timestamp_opt(open_ts + INTERVAL_SECS, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("invalid interval timestamp"))?;

        let mut inner = self.inner.lock().unwrap();
        if inner.interval_index != index {
            inner.interval_index = index;
            inner.interval_open_price = inner.spot;
        }

        Ok(IntervalMarket {
            market_id: format!("sim-updown-{index}"),
            up_token_id: format!("sim-updown-{index}-up"),
            down_token_id: format!("sim-updown-{index}-down"),
            open_price: inner.interval_open_price,
            open_time,
            close_time,
        })
    }

    async fn spot(&self) -> anyhow::Result<SpotQuote> {
        let mut inner = self.inner.lock().unwrap();
        // Walk step in [-12, 12] dollars with occasional larger jumps
        let roll = next_rng(&mut inner.rng);
        let step = Decimal::from((roll % 25) as i64 - 12);
        let jump = if roll % 97 == 0 {
            Decimal::from(((roll >> 8) % 60) as i64 - 30)
        } else {
            Decimal::ZERO
        };
        inner.spot += step + jump;
        Ok(SpotQuote {
            price: inner.spot,
            timestamp: Utc::now(),
        })
    }

    async fn spot_secondary(&self) -> anyhow::Result<Option<SpotQuote>> {
        let mut inner = self.inner.lock().unwrap();
        // The second feed trails the first by a small deterministic offset
        let offset = Decimal::from((next_rng(&mut inner.rng) % 7) as i64 - 3);
        Ok(Some(SpotQuote {
            price: inner.spot + offset,
            timestamp: Utc::now(),
        }))
    }

    async fn order_book(&self, token_id: &str) -> anyhow::Result<OrderBook> {
        let mut inner = self.inner.lock().unwrap();
        let prob = Self::up_probability(inner.spot, inner.interval_open_price);
        let mid = if token_id.ends_with("-up") {
            prob
        } else {
            Decimal::ONE - prob
        };

        let tick = Decimal::new(1, 2);
        let jitter = Decimal::from((next_rng(&mut inner.rng) % 3) as i64) * Decimal::new(5, 3);
        let bid = (mid - tick - jitter).max(Decimal::new(1, 2));
        let ask = (mid + tick + jitter).min(Decimal::new(99, 2));

        let mut book = OrderBook::new(token_id);
        book.bids = (0..3)
            .map(|i| {
                PriceLevel::new(
                    (bid - tick * Decimal::from(i)).max(Decimal::new(1, 2)),
                    Decimal::from(150 + (next_rng(&mut inner.rng) % 200)),
                )
            })
            .collect();
        book.asks = (0..3)
            .map(|i| {
                PriceLevel::new(
                    (ask + tick * Decimal::from(i)).min(Decimal::new(99, 2)),
                    Decimal::from(150 + (next_rng(&mut inner.rng) % 200)),
                )
            })
            .collect();
        Ok(book)
    }

    async fn taker_fee(&self, _token_id: &str) -> anyhow::Result<Option<Decimal>> {
        Ok(Some(self.fee))
    }

    async fn recent_prints(&self, token_id: &str) -> anyhow::Result<Vec<TradePrint>> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        if (now - inner.last_print_at).num_milliseconds() < 400 {
            return Ok(vec![]);
        }
        inner.last_print_at = now;

        let prob = Self::up_probability(inner.spot, inner.interval_open_price);
        let mid = if token_id.ends_with("-up") {
            prob
        } else {
            Decimal::ONE - prob
        };
        let roll = next_rng(&mut inner.rng);
        let side = if roll % 2 == 0 {
            TakerSide::Buy
        } else {
            TakerSide::Sell
        };
        Ok(vec![TradePrint {
            timestamp: now,
            side,
            size: Decimal::from(1 + (roll % 40)),
            price: mid,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_interval_is_quarter_hour_aligned() {
        let sim = SimMarketData::new(42, dec!(95000));
        let interval = sim.current_interval().await.unwrap();

        assert_eq!(interval.open_time.timestamp() % INTERVAL_SECS, 0);
        assert_eq!(
            (interval.close_time - interval.open_time).num_seconds(),
            INTERVAL_SECS
        );
        assert!(interval.up_token_id.ends_with("-up"));
        assert!(interval.down_token_id.ends_with("-down"));
    }

    #[tokio::test]
    async fn test_walk_is_deterministic_per_seed() {
        let a = SimMarketData::new(7, dec!(95000));
        let b = SimMarketData::new(7, dec!(95000));

        for _ in 0..10 {
            let pa = a.spot().await.unwrap().price;
            let pb = b.spot().await.unwrap().price;
            assert_eq!(pa, pb);
        }
    }

    #[tokio::test]
    async fn test_books_are_complementary() {
        let sim = SimMarketData::new(42, dec!(95000));
        let interval = sim.current_interval().await.unwrap();

        let up = sim.order_book(&interval.up_token_id).await.unwrap();
        let down = sim.order_book(&interval.down_token_id).await.unwrap();

        let up_mid = up.mid_price().unwrap();
        let down_mid = down.mid_price().unwrap();
        // Mids hover around complementary probabilities
        assert!((up_mid + down_mid - Decimal::ONE).abs() < dec!(0.10));

        // Ladders are sorted best-first
        assert!(up.asks[0].price <= up.asks[1].price);
        assert!(up.bids[0].price >= up.bids[1].price);
    }

    #[tokio::test]
    async fn test_fee_reported_as_fraction() {
        let sim = SimMarketData::new(42, dec!(95000));
        assert_eq!(sim.taker_fee("any").await.unwrap(), Some(dec!(0.01)));
    }
}
