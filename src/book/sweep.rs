//! Pure sweep and sizing arithmetic over book levels
//!
//! Every sizing path in the engine prices fills by sweeping the resting
//! levels of one side, so cost is non-decreasing in the share count. That
//! monotonicity is what lets [`max_shares_for_budget`] binary-search instead
//! of scanning.

use super::PriceLevel;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from sweeping a book side
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    /// The side does not hold enough size to fill the request
    #[error("insufficient depth: wanted {wanted} shares, fillable {fillable}")]
    InsufficientDepth { wanted: u64, fillable: u64 },
    /// A sweep of zero shares is meaningless
    #[error("sweep of zero shares")]
    ZeroShares,
}

/// Result of sweeping one side for an exact share count
#[derive(Debug, Clone, PartialEq)]
pub struct SweepFill {
    /// Shares consumed, always the requested count
    pub shares: u64,
    /// Notional before fees
    pub notional: Decimal,
    /// Fee on the notional
    pub fee: Decimal,
    /// Cost (buy, fee added) or proceeds (sell, fee removed)
    pub total: Decimal,
    /// Notional divided by shares
    pub avg_price: Decimal,
    /// Price of the deepest level touched
    pub worst_price: Decimal,
}

/// Cost of buying an exact number of shares by sweeping asks best-first
///
/// Fails with [`BookError::InsufficientDepth`] when the asks cannot cover
/// `shares`; a partial fill is never reported as success. The returned cost
/// is fee-inclusive: `notional * (1 + fee_bps / 10_000)`.
pub fn cost_to_buy(asks: &[PriceLevel], shares: u64, fee_bps: Decimal) -> Result<SweepFill, BookError> {
    let swept = sweep(asks, shares, None)?;
    let fee = swept.notional * fee_bps / Decimal::from(10_000);
    Ok(SweepFill {
        total: swept.notional + fee,
        fee,
        ..swept
    })
}

/// Proceeds from selling an exact number of shares by sweeping bids best-first
///
/// Bids are sorted descending, so the sweep stops at the first level priced
/// below `min_price`; everything past it is at least as bad. Proceeds are
/// fee-exclusive: `notional * (1 - fee_bps / 10_000)`.
pub fn proceeds_from_sell(
    bids: &[PriceLevel],
    shares: u64,
    fee_bps: Decimal,
    min_price: Decimal,
) -> Result<SweepFill, BookError> {
    let swept = sweep(bids, shares, Some(min_price))?;
    let fee = swept.notional * fee_bps / Decimal::from(10_000);
    Ok(SweepFill {
        total: swept.notional - fee,
        fee,
        ..swept
    })
}

/// Walk levels best-first, consuming exactly `shares`
fn sweep(
    levels: &[PriceLevel],
    shares: u64,
    min_price: Option<Decimal>,
) -> Result<SweepFill, BookError> {
    if shares == 0 {
        return Err(BookError::ZeroShares);
    }

    let wanted = Decimal::from(shares);
    let mut remaining = wanted;
    let mut notional = Decimal::ZERO;
    let mut worst_price = Decimal::ZERO;

    for level in levels {
        if let Some(floor) = min_price {
            if level.price < floor {
                break;
            }
        }
        let take = remaining.min(level.size);
        if take.is_zero() {
            continue;
        }
        notional += take * level.price;
        worst_price = level.price;
        remaining -= take;
        if remaining.is_zero() {
            let filled = wanted;
            return Ok(SweepFill {
                shares,
                notional,
                fee: Decimal::ZERO,
                total: notional,
                avg_price: notional / filled,
                worst_price,
            });
        }
    }

    let fillable = wanted - remaining;
    Err(BookError::InsufficientDepth {
        wanted: shares,
        // Truncated: a fractional tail cannot complete an integer share
        fillable: fillable.trunc().to_u64().unwrap_or(0),
    })
}

/// Largest `n` in `[lo, hi]` for which `feasible(n)` holds
///
/// `feasible` must be monotone: once false it stays false as `n` grows.
/// Returns `None` when `feasible(lo)` is already false or the range is empty.
pub fn largest_feasible(lo: u64, hi: u64, mut feasible: impl FnMut(u64) -> bool) -> Option<u64> {
    if lo > hi || !feasible(lo) {
        return None;
    }
    let (mut good, mut bad) = (lo, hi + 1);
    while bad - good > 1 {
        let mid = good + (bad - good) / 2;
        if feasible(mid) {
            good = mid;
        } else {
            bad = mid;
        }
    }
    Some(good)
}

/// Largest share count whose fee-inclusive cost fits the budget
///
/// Returns `None` when even `min_shares` is unaffordable or unfillable.
pub fn max_shares_for_budget(
    asks: &[PriceLevel],
    fee_bps: Decimal,
    budget: Decimal,
    min_shares: u64,
) -> Option<u64> {
    let depth: Decimal = asks.iter().map(|l| l.size).sum();
    let hi = depth.trunc().to_u64().unwrap_or(0);
    let lo = min_shares.max(1);
    largest_feasible(lo, hi, |n| {
        matches!(cost_to_buy(asks, n, fee_bps), Ok(fill) if fill.total <= budget)
    })
}
