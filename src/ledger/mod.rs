//! Per-strategy trade ledger
//!
//! An append-only audit trail of completed trade lifecycles plus the
//! strategy's own capital accounting. Each strategy owns exactly one ledger;
//! nothing else writes to it.

use crate::strategy::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a trade lifecycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    /// Exited at the profit target
    TakeProfit,
    /// Exited at the stop
    StopLoss,
    /// Held to interval resolution
    Settlement,
    /// Unwound after a partial fill broke an atomic entry
    Abort,
}

/// One completed trade lifecycle
///
/// Records are immutable once appended; corrections happen by appending,
/// never by editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Ledger entry identifier
    pub id: Uuid,
    /// Strategy that owned the lifecycle
    pub strategy: String,
    /// Market the trade ran in
    pub market_id: String,
    /// Outcome side held
    pub side: Side,
    /// Shares held
    pub shares: u64,
    /// Average entry price
    pub entry_price: Decimal,
    /// Average exit price
    pub exit_price: Decimal,
    /// Total fees across both legs
    pub fee: Decimal,
    /// Total gas across both legs
    pub gas: Decimal,
    /// Capital before the entry leg
    pub capital_before: Decimal,
    /// Capital after the exit leg
    pub capital_after: Decimal,
    /// Return on the capital committed at entry
    pub roi: Decimal,
    /// How the lifecycle ended
    pub outcome: TradeOutcome,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

/// Append-only ledger with capital accounting
#[derive(Debug)]
pub struct TradeLedger {
    strategy: &'static str,
    initial_capital: Decimal,
    capital: Decimal,
    trades: Vec<Trade>,
}

/// Inputs for building one ledger record
#[derive(Debug, Clone)]
pub struct TradeRecord {
    pub market_id: String,
    pub side: Side,
    pub shares: u64,
    pub entry_price: Decimal,
    pub entry_cost: Decimal,
    pub exit_price: Decimal,
    pub exit_proceeds: Decimal,
    pub fee: Decimal,
    pub gas: Decimal,
    pub outcome: TradeOutcome,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl TradeLedger {
    /// Create a ledger holding the strategy's capital allocation
    pub fn new(strategy: &'static str, initial_capital: Decimal) -> Self {
        Self {
            strategy,
            initial_capital,
            capital: initial_capital,
            trades: Vec::new(),
        }
    }

    /// Capital not currently committed to a position
    pub fn available(&self) -> Decimal {
        self.capital
    }

    /// Remove cash committed to an entry leg
    pub fn debit(&mut self, amount: Decimal) {
        self.capital -= amount;
    }

    /// Return cash from an exit leg or settlement
    pub fn credit(&mut self, amount: Decimal) {
        self.capital += amount;
    }

    /// Append a completed lifecycle
    ///
    /// `capital_before` is reconstructed from the current capital, which the
    /// caller has already credited with the exit proceeds.
    pub fn record(&mut self, record: TradeRecord) -> Trade {
        let capital_after = self.capital;
        let committed = record.entry_cost + record.gas;
        let capital_before = capital_after - record.exit_proceeds + committed;
        let roi = if committed.is_zero() {
            Decimal::ZERO
        } else {
            (record.exit_proceeds - committed) / committed
        };

        let trade = Trade {
            id: Uuid::new_v4(),
            strategy: self.strategy.to_string(),
            market_id: record.market_id,
            side: record.side,
            shares: record.shares,
            entry_price: record.entry_price,
            exit_price: record.exit_price,
            fee: record.fee,
            gas: record.gas,
            capital_before,
            capital_after,
            roi,
            outcome: record.outcome,
            opened_at: record.opened_at,
            closed_at: record.closed_at,
        };
        self.trades.push(trade.clone());
        trade
    }

    /// All recorded trades, oldest first
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Profit and loss realized since the ledger opened
    pub fn realized_pnl(&self) -> Decimal {
        self.capital - self.initial_capital
    }

    /// Number of recorded lifecycles
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// True when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(entry_cost: Decimal, exit_proceeds: Decimal, outcome: TradeOutcome) -> TradeRecord {
        TradeRecord {
            market_id: "btc-updown-1".to_string(),
            side: Side::Up,
            shares: 10,
            entry_price: dec!(0.50),
            entry_cost,
            exit_price: dec!(0.60),
            exit_proceeds,
            fee: dec!(0.10),
            gas: dec!(0.02),
            outcome,
            opened_at: Utc::now(),
            closed_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_ledger_holds_allocation() {
        let ledger = TradeLedger::new("lag", dec!(200));
        assert_eq!(ledger.available(), dec!(200));
        assert_eq!(ledger.realized_pnl(), dec!(0));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_debit_credit_roundtrip() {
        let mut ledger = TradeLedger::new("lag", dec!(200));
        ledger.debit(dec!(50));
        assert_eq!(ledger.available(), dec!(150));
        ledger.credit(dec!(60));
        assert_eq!(ledger.available(), dec!(210));
        assert_eq!(ledger.realized_pnl(), dec!(10));
    }

    #[test]
    fn test_record_captures_capital_and_roi() {
        let mut ledger = TradeLedger::new("lag", dec!(200));

        // Entry commits 5.02 (cost plus gas), exit returns 6.00
        ledger.debit(dec!(5.02));
        ledger.credit(dec!(6.00));
        let trade = ledger.record(record(dec!(5.00), dec!(6.00), TradeOutcome::TakeProfit));

        assert_eq!(trade.capital_before, dec!(200));
        assert_eq!(trade.capital_after, dec!(200.98));
        // (6.00 - 5.02) / 5.02
        assert!((trade.roi - dec!(0.1952)).abs() < dec!(0.001));
        assert_eq!(trade.outcome, TradeOutcome::TakeProfit);
    }

    #[test]
    fn test_losing_trade_has_negative_roi() {
        let mut ledger = TradeLedger::new("certainty", dec!(100));

        ledger.debit(dec!(10.02));
        ledger.credit(dec!(7.00));
        let trade = ledger.record(record(dec!(10.00), dec!(7.00), TradeOutcome::StopLoss));

        assert!(trade.roi < dec!(0));
        assert_eq!(ledger.realized_pnl(), dec!(-3.02));
    }

    #[test]
    fn test_trades_are_append_only() {
        let mut ledger = TradeLedger::new("lag", dec!(200));
        ledger.record(record(dec!(5), dec!(6), TradeOutcome::TakeProfit));
        ledger.record(record(dec!(5), dec!(4), TradeOutcome::StopLoss));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.trades()[0].outcome, TradeOutcome::TakeProfit);
        assert_eq!(ledger.trades()[1].outcome, TradeOutcome::StopLoss);
    }

    #[test]
    fn test_settlement_outcome_recorded() {
        let mut ledger = TradeLedger::new("arbitrage", dec!(200));
        ledger.debit(dec!(9.52));
        ledger.credit(dec!(10));
        let trade = ledger.record(record(dec!(9.50), dec!(10), TradeOutcome::Settlement));
        assert_eq!(trade.outcome, TradeOutcome::Settlement);
        assert!(trade.roi > dec!(0));
    }
}
