//! Taker fee arithmetic
//!
//! The venue charges takers proportionally to how far the execution price
//! sits from certainty: `fee = notional * (1 - price) * base_rate`. An order
//! filling at 99 cents pays almost nothing, one filling at 50 cents pays the
//! full base rate on half the distance.

use crate::config::FeeConfig;
use rust_decimal::Decimal;

/// Distance-from-certainty taker fee model
#[derive(Debug, Clone)]
pub struct FeeModel {
    /// Base taker rate (0.02 by default)
    pub base_rate: Decimal,
}

impl FeeModel {
    /// Create a fee model with the given base rate
    pub fn new(base_rate: Decimal) -> Self {
        Self { base_rate }
    }

    /// Create from FeeConfig
    pub fn from_config(config: &FeeConfig) -> Self {
        Self {
            base_rate: config.base_rate,
        }
    }

    /// Fee charged on a taker fill of `notional` at `price`
    pub fn taker_fee(&self, notional: Decimal, price: Decimal) -> Decimal {
        notional * (Decimal::ONE - price) * self.base_rate
    }

    /// Total cash out the door for a buy: notional plus fee
    pub fn apply_on_buy(&self, notional: Decimal, price: Decimal) -> Decimal {
        notional + self.taker_fee(notional, price)
    }

    /// Cash received for a sell: notional minus fee
    pub fn apply_on_sell(&self, notional: Decimal, price: Decimal) -> Decimal {
        notional - self.taker_fee(notional, price)
    }

    /// Round-trip fee per share at `price`, in cents
    ///
    /// Approximates the exit fill at the entry price; the exit leg is not
    /// known at sizing time.
    pub fn round_trip_cents(&self, price: Decimal) -> Decimal {
        self.taker_fee(price, price) * Decimal::TWO * Decimal::ONE_HUNDRED
    }
}

impl Default for FeeModel {
    fn default() -> Self {
        Self {
            base_rate: Decimal::new(2, 2), // 0.02
        }
    }
}

/// Normalize a reported fee into basis points
///
/// Venues report the taker rate either as a fraction (0.01) or already in
/// basis points (100). Anything in (0, 1) is treated as a fraction. Negative
/// rates are rejected.
pub fn normalize_fee_bps(raw: Decimal) -> Option<Decimal> {
    if raw < Decimal::ZERO {
        return None;
    }
    if raw > Decimal::ZERO && raw < Decimal::ONE {
        Some(raw * Decimal::from(10_000))
    } else {
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_taker_fee_scales_with_distance() {
        let fees = FeeModel::default();
        // $100 notional at 50 cents: 100 * 0.5 * 0.02 = 1
        assert_eq!(fees.taker_fee(dec!(100), dec!(0.50)), dec!(1));
        // Same notional at 90 cents pays a fifth of that
        assert_eq!(fees.taker_fee(dec!(100), dec!(0.90)), dec!(0.2));
    }

    #[test]
    fn test_fee_vanishes_at_certainty() {
        let fees = FeeModel::default();
        assert_eq!(fees.taker_fee(dec!(100), dec!(1)), dec!(0));
    }

    #[test]
    fn test_round_trip_always_loses() {
        let fees = FeeModel::default();
        let start = dec!(50);
        for price in [dec!(0.05), dec!(0.30), dec!(0.50), dec!(0.80), dec!(0.99)] {
            let after = fees.apply_on_sell(fees.apply_on_buy(start, price), price);
            assert!(after < start, "no drag at price {price}");
        }
    }

    #[test]
    fn test_apply_on_buy_adds() {
        let fees = FeeModel::default();
        assert_eq!(fees.apply_on_buy(dec!(100), dec!(0.50)), dec!(101));
    }

    #[test]
    fn test_apply_on_sell_removes() {
        let fees = FeeModel::default();
        assert_eq!(fees.apply_on_sell(dec!(100), dec!(0.50)), dec!(99));
    }

    #[test]
    fn test_round_trip_cents_at_mid() {
        let fees = FeeModel::default();
        // 0.5 * 0.5 * 0.02 * 2 * 100 = 1 cent
        assert_eq!(fees.round_trip_cents(dec!(0.50)), dec!(1.0000));
    }

    #[test]
    fn test_normalize_fraction() {
        assert_eq!(normalize_fee_bps(dec!(0.01)), Some(dec!(100)));
        assert_eq!(normalize_fee_bps(dec!(0.999)), Some(dec!(9990)));
    }

    #[test]
    fn test_normalize_already_bps() {
        assert_eq!(normalize_fee_bps(dec!(100)), Some(dec!(100)));
        assert_eq!(normalize_fee_bps(dec!(1)), Some(dec!(1)));
        assert_eq!(normalize_fee_bps(dec!(0)), Some(dec!(0)));
    }

    #[test]
    fn test_normalize_rejects_negative() {
        assert_eq!(normalize_fee_bps(dec!(-5)), None);
    }
}
