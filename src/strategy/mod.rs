//! Strategy modules
//!
//! Three decision engines behind one trait: straddle arbitrage, lag
//! trading, and late-interval certainty entries. A strategy reads the
//! world, never writes it; everything it mutates (position, ledger, model
//! state) is its own.

mod arbitrage;
mod certainty;
mod lag;

pub use arbitrage::ArbitrageStrategy;
pub use certainty::CertaintyStrategy;
pub use lag::LagStrategy;

use crate::engine::{IntervalMarket, WorldState};
use crate::execution::{Fill, Order, OrderAction};
use crate::ledger::TradeLedger;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Outcome side of the binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Pays $1 when the interval resolves up
    Up,
    /// Pays $1 when the interval resolves down
    Down,
}

impl Side {
    /// The complementary side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Up => Side::Down,
            Side::Down => Side::Up,
        }
    }

    /// Token id of this side within an interval
    pub fn token_id<'a>(&self, interval: &'a IntervalMarket) -> &'a str {
        match self {
            Side::Up => &interval.up_token_id,
            Side::Down => &interval.down_token_id,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Up => write!(f, "up"),
            Side::Down => write!(f, "down"),
        }
    }
}

/// Why a decision was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionReason {
    /// One leg of a straddle entry
    StraddleLeg,
    /// Lag strategy entry
    LagEntry,
    /// Lag strategy take-profit exit
    LagTakeProfit,
    /// Lag strategy stop-loss exit
    LagStopLoss,
    /// Certainty strategy entry
    CertaintyEntry,
    /// Certainty strategy take-profit exit
    CertaintyTakeProfit,
    /// Certainty strategy stop-loss exit
    CertaintyStopLoss,
    /// Position carried into interval resolution
    Settlement,
}

impl DecisionReason {
    /// Stable label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            DecisionReason::StraddleLeg => "straddle_leg",
            DecisionReason::LagEntry => "lag_entry",
            DecisionReason::LagTakeProfit => "lag_take_profit",
            DecisionReason::LagStopLoss => "lag_stop_loss",
            DecisionReason::CertaintyEntry => "certainty_entry",
            DecisionReason::CertaintyTakeProfit => "certainty_take_profit",
            DecisionReason::CertaintyStopLoss => "certainty_stop_loss",
            DecisionReason::Settlement => "settlement",
        }
    }
}

/// An admitted, sized, priced trade decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Decision identifier
    pub id: Uuid,
    /// Market the decision targets
    pub market_id: String,
    /// Token the order trades
    pub token_id: String,
    /// Outcome side
    pub side: Side,
    /// Buy or sell
    pub action: OrderAction,
    /// Integer share count, at least one
    pub shares: u64,
    /// Limit price
    pub limit_price: Decimal,
    /// Expected cost (buy) or proceeds (sell), fee-inclusive
    pub expected_total: Decimal,
    /// Why the strategy acted
    pub reason: DecisionReason,
}

impl Decision {
    /// Convert to a submittable order
    pub fn to_order(&self) -> Order {
        Order {
            token_id: self.token_id.clone(),
            action: self.action,
            price: self.limit_price,
            shares: self.shares,
        }
    }
}

/// Why a tick produced no decision
///
/// Rejections are observations, not failures; each one is logged and counted
/// so thresholds can be tuned against reality.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("no active interval")]
    NoInterval,
    #[error("no spot quote")]
    NoSpot,
    #[error("taker fee unknown")]
    UnknownFee,
    #[error("spot feeds disagree")]
    FeedDisagreement,
    #[error("book depth cannot fill the size")]
    InsufficientDepth,
    #[error("budget below minimum size")]
    BudgetTooSmall,
    #[error("risk cap blocks the trade")]
    RiskCapBlocksTrade,
    #[error("predicted edge {predicted} below required {required}")]
    EdgeTooSmall {
        predicted: Decimal,
        required: Decimal,
    },
    #[error("risk/reward {ratio} below required {required}")]
    RiskRewardTooLow { ratio: Decimal, required: Decimal },
    #[error("profit target unreachable under the price cap")]
    TargetUnreachable,
    #[error("awaiting confirmation ticks")]
    AwaitingConfirmation,
    #[error("cooling down")]
    Cooldown,
    #[error("warming up")]
    WarmingUp,
    #[error("outside the entry window")]
    OutsideWindow,
    #[error("no qualifying candidate")]
    NoCandidate,
    #[error("position already open")]
    PositionOpen,
    #[error("open position references a stale interval")]
    StaleInterval,
    #[error("trading halted")]
    Halted,
}

impl SkipReason {
    /// Stable label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::NoInterval => "no_interval",
            SkipReason::NoSpot => "no_spot",
            SkipReason::UnknownFee => "unknown_fee",
            SkipReason::FeedDisagreement => "feed_disagreement",
            SkipReason::InsufficientDepth => "insufficient_depth",
            SkipReason::BudgetTooSmall => "budget_too_small",
            SkipReason::RiskCapBlocksTrade => "risk_cap",
            SkipReason::EdgeTooSmall { .. } => "edge_too_small",
            SkipReason::RiskRewardTooLow { .. } => "rr_too_low",
            SkipReason::TargetUnreachable => "target_unreachable",
            SkipReason::AwaitingConfirmation => "awaiting_confirmation",
            SkipReason::Cooldown => "cooldown",
            SkipReason::WarmingUp => "warming_up",
            SkipReason::OutsideWindow => "outside_window",
            SkipReason::NoCandidate => "no_candidate",
            SkipReason::PositionOpen => "position_open",
            SkipReason::StaleInterval => "stale_interval",
            SkipReason::Halted => "halted",
        }
    }
}

/// An open position owned by exactly one strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    /// Market the position was opened in
    pub market_id: String,
    /// Token held
    pub token_id: String,
    /// Outcome side held
    pub side: Side,
    /// Shares held
    pub shares: u64,
    /// Average entry price
    pub entry_price: Decimal,
    /// Cash committed at entry, fee and gas included
    pub entry_cost: Decimal,
    /// Fee paid at entry
    pub entry_fee: Decimal,
    /// Gas paid at entry
    pub entry_gas: Decimal,
    /// Stop price, when the strategy runs one
    pub stop_price: Option<Decimal>,
    /// Target price, when the strategy runs one
    pub target_price: Option<Decimal>,
    /// Entry fill time
    pub opened_at: DateTime<Utc>,
    /// Interval resolution time at entry
    pub settles_at: DateTime<Utc>,
}

impl OpenPosition {
    /// Whether the position belongs to the interval in the snapshot
    ///
    /// A mismatched market or token id means the world rolled while the
    /// position is still open; exit evaluation must freeze rather than act
    /// on another interval's prices.
    pub fn matches_interval(&self, interval: &IntervalMarket) -> bool {
        self.market_id == interval.market_id && self.token_id == self.side.token_id(interval)
    }
}

/// Consecutive-tick confirmation gate
///
/// A condition must hold for N consecutive observations keyed by the same
/// side and price bucket before it is acted on. Any change of key or a
/// missed tick resets the streak.
#[derive(Debug, Clone)]
pub struct Confirmation {
    needed: u32,
    streak: u32,
    key: Option<(Side, Decimal)>,
}

impl Confirmation {
    /// Gate requiring `needed` consecutive observations
    pub fn new(needed: u32) -> Self {
        Self {
            needed,
            streak: 0,
            key: None,
        }
    }

    /// Observe the condition holding for `side` at `price`
    ///
    /// Returns true once the streak reaches the requirement. Prices are
    /// bucketed to the cent so sub-cent jitter does not reset the streak.
    pub fn observe(&mut self, side: Side, price: Decimal) -> bool {
        let bucket = price.round_dp(2);
        match self.key {
            Some((s, p)) if s == side && p == bucket => self.streak += 1,
            _ => {
                self.key = Some((side, bucket));
                self.streak = 1;
            }
        }
        self.streak >= self.needed
    }

    /// Drop the streak
    pub fn reset(&mut self) {
        self.streak = 0;
        self.key = None;
    }

    /// Current streak length
    pub fn streak(&self) -> u32 {
        self.streak
    }
}

/// Trait all strategies implement
///
/// `on_tick` reads one consistent snapshot and may admit decisions; the
/// orchestrator submits them and reports back through `on_fill` or
/// `on_reject`. Position state changes only on confirmed fills, so a
/// rejected order leaves the next tick free to re-evaluate cleanly.
pub trait Strategy: Send {
    /// Strategy name for logs, metrics and the ledger
    fn name(&self) -> &'static str;

    /// Evaluate one snapshot
    fn on_tick(&mut self, world: &WorldState) -> Result<Vec<Decision>, SkipReason>;

    /// Commit a confirmed fill into strategy state
    fn on_fill(&mut self, decision: &Decision, fill: &Fill);

    /// An order was killed or rejected; state must be left unchanged
    fn on_reject(&mut self, decision: &Decision) {
        tracing::warn!(
            strategy = self.name(),
            decision = %decision.id,
            reason = decision.reason.label(),
            "Order not filled, state unchanged"
        );
    }

    /// The tracked interval rolled; settle anything still open
    ///
    /// `winner` is the side that resolved to $1, `None` when the outcome
    /// could not be determined.
    fn on_interval_roll(&mut self, world: &WorldState, winner: Option<Side>) -> Vec<Decision>;

    /// The strategy's trade ledger
    fn ledger(&self) -> &TradeLedger;

    /// Whether a position is currently open
    fn has_open_position(&self) -> bool;
}
