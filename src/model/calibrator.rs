//! Online calibration of the market's response rate

use crate::config::CalibratorConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// EMA estimate of cents-of-response per dollar-of-spot-move
///
/// Fed only when the market is actually observed responding to a spot move,
/// and only with the favored side's repricing. Until enough observations
/// accumulate, a static fallback rate stands in. State survives interval
/// rollovers; it is never reset mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCalibrator {
    ema_weight: Decimal,
    min_rate: Decimal,
    max_rate: Decimal,
    min_samples: u32,
    fallback_rate: Decimal,
    ema: Decimal,
    samples: u32,
}

impl ResponseCalibrator {
    /// Create a calibrator from configuration
    pub fn from_config(config: &CalibratorConfig) -> Self {
        Self {
            ema_weight: config.ema_weight,
            min_rate: config.min_rate,
            max_rate: config.max_rate,
            min_samples: config.min_samples,
            fallback_rate: config.fallback_rate,
            ema: Decimal::ZERO,
            samples: 0,
        }
    }

    /// Fold in one observed response
    ///
    /// `response_cents` is the favored side's repricing, `spot_move` the
    /// absolute spot move that caused it. Zero moves are ignored.
    pub fn observe(&mut self, response_cents: Decimal, spot_move: Decimal) {
        if spot_move.is_zero() {
            return;
        }
        let rate = (response_cents.abs() / spot_move.abs())
            .max(self.min_rate)
            .min(self.max_rate);

        if self.samples == 0 {
            self.ema = rate;
        } else {
            self.ema = self.ema + self.ema_weight * (rate - self.ema);
        }
        self.samples += 1;
    }

    /// Current cents-per-dollar rate
    ///
    /// The EMA only once enough observations have accumulated, otherwise the
    /// static fallback.
    pub fn rate(&self) -> Decimal {
        if self.is_calibrated() {
            self.ema
        } else {
            self.fallback_rate
        }
    }

    /// Whether the EMA has cleared the sample threshold
    pub fn is_calibrated(&self) -> bool {
        self.samples >= self.min_samples
    }

    /// Number of observations folded in so far
    pub fn samples(&self) -> u32 {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn calibrator() -> ResponseCalibrator {
        ResponseCalibrator::from_config(&CalibratorConfig::default())
    }

    #[test]
    fn test_fallback_until_threshold() {
        let mut cal = calibrator();
        assert!(!cal.is_calibrated());
        assert_eq!(cal.rate(), dec!(0.01));

        for _ in 0..7 {
            cal.observe(dec!(5), dec!(250));
        }
        // Seven samples, threshold is eight
        assert!(!cal.is_calibrated());
        assert_eq!(cal.rate(), dec!(0.01));

        cal.observe(dec!(5), dec!(250));
        assert!(cal.is_calibrated());
        assert_eq!(cal.rate(), dec!(0.02));
    }

    #[test]
    fn test_first_observation_seeds_ema() {
        let mut cal = calibrator();
        cal.observe(dec!(4), dec!(200));
        assert_eq!(cal.samples(), 1);
        // Seeded directly rather than blended with the zero initial state
        for _ in 0..7 {
            cal.observe(dec!(4), dec!(200));
        }
        assert_eq!(cal.rate(), dec!(0.02));
    }

    #[test]
    fn test_ema_moves_toward_new_rate() {
        let mut cal = calibrator();
        for _ in 0..8 {
            cal.observe(dec!(2), dec!(200)); // rate 0.01
        }
        let before = cal.rate();
        cal.observe(dec!(8), dec!(200)); // rate 0.04
        let after = cal.rate();
        assert!(after > before);
        assert!(after < dec!(0.04));
    }

    #[test]
    fn test_rate_clamped() {
        let mut cal = calibrator();
        for _ in 0..8 {
            // 50 cents per dollar, far above the 0.05 ceiling
            cal.observe(dec!(100), dec!(200));
        }
        assert_eq!(cal.rate(), dec!(0.05));

        let mut low = calibrator();
        for _ in 0..8 {
            low.observe(dec!(0.001), dec!(500));
        }
        assert_eq!(low.rate(), dec!(0.001));
    }

    #[test]
    fn test_zero_move_ignored() {
        let mut cal = calibrator();
        cal.observe(dec!(5), dec!(0));
        assert_eq!(cal.samples(), 0);
    }

    #[test]
    fn test_negative_response_uses_magnitude() {
        let mut cal = calibrator();
        for _ in 0..8 {
            cal.observe(dec!(-5), dec!(-250));
        }
        assert_eq!(cal.rate(), dec!(0.02));
    }
}
