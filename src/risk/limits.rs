//! Drawdown tracking and entry halts

use crate::config::RiskConfig;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why new entries are halted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HaltReason {
    /// Daily loss limit breached
    DailyLoss(Decimal),
    /// Drawdown from peak breached
    Drawdown(Decimal),
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::DailyLoss(pct) => write!(f, "daily loss {pct}"),
            HaltReason::Drawdown(pct) => write!(f, "drawdown {pct}"),
        }
    }
}

/// Equity guard with daily reset
#[derive(Debug, Clone)]
pub struct EquityGuard {
    max_daily_loss_pct: Decimal,
    max_drawdown_pct: Decimal,
    peak: Decimal,
    current: Decimal,
    day_open: Decimal,
    day: Option<DateTime<Utc>>,
}

impl EquityGuard {
    /// Create a guard seeded with the starting equity
    pub fn new(config: &RiskConfig, initial_equity: Decimal) -> Self {
        Self {
            max_daily_loss_pct: config.max_daily_loss_pct,
            max_drawdown_pct: config.max_drawdown_pct,
            peak: initial_equity,
            current: initial_equity,
            day_open: initial_equity,
            day: None,
        }
    }

    /// Fold in a fresh equity reading
    ///
    /// Rolls the daily baseline when the UTC date changes.
    pub fn update(&mut self, now: DateTime<Utc>, equity: Decimal) {
        match self.day {
            None => self.day = Some(now),
            Some(day) if day.date_naive() == now.date_naive() => {}
            Some(_) => {
                self.day = Some(now);
                self.day_open = equity;
            }
        }
        self.current = equity;
        self.peak = self.peak.max(equity);
    }

    /// Fractional drawdown from the peak
    pub fn drawdown(&self) -> Decimal {
        if self.peak.is_zero() {
            return Decimal::ZERO;
        }
        (self.peak - self.current) / self.peak
    }

    /// Fractional loss since the daily open
    pub fn daily_loss(&self) -> Decimal {
        if self.day_open.is_zero() {
            return Decimal::ZERO;
        }
        (self.day_open - self.current) / self.day_open
    }

    /// Halt reason, when a limit is breached
    pub fn halt_reason(&self) -> Option<HaltReason> {
        let daily = self.daily_loss();
        if daily > self.max_daily_loss_pct {
            return Some(HaltReason::DailyLoss(daily));
        }
        let drawdown = self.drawdown();
        if drawdown > self.max_drawdown_pct {
            return Some(HaltReason::Drawdown(drawdown));
        }
        None
    }

    /// Current equity reading
    pub fn equity(&self) -> Decimal {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn guard(initial: Decimal) -> EquityGuard {
        EquityGuard::new(&RiskConfig::default(), initial)
    }

    #[test]
    fn test_no_halt_at_start() {
        let g = guard(dec!(500));
        assert_eq!(g.halt_reason(), None);
        assert_eq!(g.drawdown(), dec!(0));
    }

    #[test]
    fn test_daily_loss_halts_first() {
        let mut g = guard(dec!(500));
        let now = Utc::now();
        g.update(now, dec!(500));
        // 6% down on the day against a 5% limit
        g.update(now + Duration::minutes(1), dec!(470));
        assert!(matches!(g.halt_reason(), Some(HaltReason::DailyLoss(_))));
    }

    #[test]
    fn test_drawdown_from_peak_halts() {
        let mut g = guard(dec!(500));
        let day1 = Utc::now();
        g.update(day1, dec!(600));

        // New day resets the daily baseline, drawdown from peak remains
        let day2 = day1 + Duration::days(1);
        g.update(day2, dec!(530));
        assert_eq!(g.daily_loss(), dec!(0));
        // 70 / 600 > 10%
        assert!(matches!(g.halt_reason(), Some(HaltReason::Drawdown(_))));
    }

    #[test]
    fn test_peak_tracks_highs() {
        let mut g = guard(dec!(500));
        let now = Utc::now();
        g.update(now, dec!(550));
        g.update(now + Duration::minutes(1), dec!(540));
        assert_eq!(g.drawdown(), dec!(10) / dec!(550));
        assert_eq!(g.halt_reason(), None);
    }

    #[test]
    fn test_recovery_clears_halt() {
        let mut g = guard(dec!(500));
        let now = Utc::now();
        g.update(now, dec!(470));
        assert!(g.halt_reason().is_some());
        g.update(now + Duration::minutes(5), dec!(495));
        assert!(g.halt_reason().is_none());
    }
}
