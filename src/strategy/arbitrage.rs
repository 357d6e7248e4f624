//! Straddle arbitrage strategy
//!
//! Complementary outcome tokens settle at $1 combined. Whenever buying N of
//! both sides, swept against real depth and fees, costs less than $N with
//! enough margin, the pair is a synthetic arbitrage: buy both legs, hold to
//! resolution, collect $1 per pair.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::book::{cost_to_buy, largest_feasible};
use crate::config::ArbitrageConfig;
use crate::engine::WorldState;
use crate::execution::{Fill, OrderAction};
use crate::ledger::{TradeLedger, TradeOutcome, TradeRecord};
use crate::strategy::{Decision, DecisionReason, SkipReason, Side, Strategy};

/// A straddle waiting for both entry fills
#[derive(Debug, Clone)]
struct PendingStraddle {
    market_id: String,
    shares: u64,
    up_fill: Option<Fill>,
    down_fill: Option<Fill>,
    /// One leg was killed; the other must be unwound
    broken: bool,
}

/// A fully opened straddle held to resolution
#[derive(Debug, Clone)]
struct OpenStraddle {
    market_id: String,
    up_token_id: String,
    down_token_id: String,
    shares: u64,
    /// Cash committed across both legs, fees and gas included
    total_cost: Decimal,
    total_fee: Decimal,
    total_gas: Decimal,
    opened_at: DateTime<Utc>,
    /// Settlement sells still waiting for fills
    settling: u8,
    winner: Option<Side>,
}

#[derive(Debug, Clone)]
enum ArbState {
    Idle,
    Pending(PendingStraddle),
    Open(OpenStraddle),
}

/// Straddle arbitrage: idle until both asks sum below $1, then the largest
/// pair count that clears the profit floor within budget
pub struct ArbitrageStrategy {
    config: ArbitrageConfig,
    state: ArbState,
    ledger: TradeLedger,
}

fn settlement_decision(
    market_id: &str,
    token_id: &str,
    side: Side,
    shares: u64,
    winner: Side,
) -> Decision {
    let payout = if side == winner {
        Decimal::ONE
    } else {
        Decimal::ZERO
    };
    Decision {
        id: Uuid::new_v4(),
        market_id: market_id.to_string(),
        token_id: token_id.to_string(),
        side,
        action: OrderAction::Sell,
        shares,
        limit_price: payout,
        expected_total: payout * Decimal::from(shares),
        reason: DecisionReason::Settlement,
    }
}

impl ArbitrageStrategy {
    /// Create the strategy with its capital allocation
    pub fn new(config: ArbitrageConfig) -> Self {
        let ledger = TradeLedger::new("arbitrage", config.capital);
        Self {
            config,
            state: ArbState::Idle,
            ledger,
        }
    }

    /// Largest pair count affordable and profitable against both ladders
    fn size_straddle(
        &self,
        world: &WorldState,
        up_fee_bps: Decimal,
        down_fee_bps: Decimal,
    ) -> Result<u64, SkipReason> {
        let up_asks = &world.up_book.asks;
        let down_asks = &world.down_book.asks;

        let budget = self.ledger.available();
        let profit_floor = self.config.min_profit_cents / Decimal::ONE_HUNDRED;

        let hi = world
            .up_book
            .ask_depth()
            .min(world.down_book.ask_depth())
            .trunc()
            .to_u64()
            .unwrap_or(0);

        // Cost per pair rises with depth while the payout stays $1, so both
        // the budget bound and the profit floor are monotone in N
        let feasible = |n: u64| -> bool {
            let (Ok(up), Ok(down)) = (
                cost_to_buy(up_asks, n, up_fee_bps),
                cost_to_buy(down_asks, n, down_fee_bps),
            ) else {
                return false;
            };
            let combined = up.total + down.total;
            if combined > budget {
                return false;
            }
            let profit_per_pair = Decimal::ONE - combined / Decimal::from(n);
            profit_per_pair >= profit_floor
        };

        largest_feasible(self.config.min_shares.max(1), hi, feasible).ok_or(SkipReason::NoCandidate)
    }
}

impl Strategy for ArbitrageStrategy {
    fn name(&self) -> &'static str {
        "arbitrage"
    }

    fn on_tick(&mut self, world: &WorldState) -> Result<Vec<Decision>, SkipReason> {
        match &self.state {
            ArbState::Open(_) => return Err(SkipReason::PositionOpen),
            ArbState::Pending(pending) => {
                if !pending.broken {
                    return Err(SkipReason::PositionOpen);
                }
                // Unwind the leg that did fill at the current best bid
                let (fill, side) = match (&pending.up_fill, &pending.down_fill) {
                    (Some(fill), None) => (fill, Side::Up),
                    (None, Some(fill)) => (fill, Side::Down),
                    _ => return Err(SkipReason::PositionOpen),
                };
                let bid = world
                    .book(side)
                    .best_bid()
                    .ok_or(SkipReason::InsufficientDepth)?;
                return Ok(vec![Decision {
                    id: Uuid::new_v4(),
                    market_id: pending.market_id.clone(),
                    token_id: fill.token_id.clone(),
                    side,
                    action: OrderAction::Sell,
                    shares: fill.shares,
                    limit_price: bid,
                    expected_total: bid * Decimal::from(fill.shares),
                    reason: DecisionReason::StraddleLeg,
                }]);
            }
            ArbState::Idle => {}
        }

        if world.halted.is_some() {
            return Err(SkipReason::Halted);
        }
        let interval = world.interval.as_ref().ok_or(SkipReason::NoInterval)?;

        // Both sides must quote an ask and report a fee before sizing
        if world.up_book.best_ask().is_none() || world.down_book.best_ask().is_none() {
            return Err(SkipReason::NoCandidate);
        }
        let up_fee_bps = world.up_fee_bps.ok_or(SkipReason::UnknownFee)?;
        let down_fee_bps = world.down_fee_bps.ok_or(SkipReason::UnknownFee)?;

        let shares = self.size_straddle(world, up_fee_bps, down_fee_bps)?;

        let up_cost = cost_to_buy(&world.up_book.asks, shares, up_fee_bps)
            .map_err(|_| SkipReason::InsufficientDepth)?;
        let down_cost = cost_to_buy(&world.down_book.asks, shares, down_fee_bps)
            .map_err(|_| SkipReason::InsufficientDepth)?;

        tracing::info!(
            market = %interval.market_id,
            shares,
            up_limit = %up_cost.worst_price,
            down_limit = %down_cost.worst_price,
            combined = %(up_cost.total + down_cost.total),
            "Straddle admitted"
        );

        // Both legs or neither: the pair is only riskless as a pair
        self.state = ArbState::Pending(PendingStraddle {
            market_id: interval.market_id.clone(),
            shares,
            up_fill: None,
            down_fill: None,
            broken: false,
        });

        Ok(vec![
            Decision {
                id: Uuid::new_v4(),
                market_id: interval.market_id.clone(),
                token_id: interval.up_token_id.clone(),
                side: Side::Up,
                action: OrderAction::Buy,
                shares,
                limit_price: up_cost.worst_price,
                expected_total: up_cost.total,
                reason: DecisionReason::StraddleLeg,
            },
            Decision {
                id: Uuid::new_v4(),
                market_id: interval.market_id.clone(),
                token_id: interval.down_token_id.clone(),
                side: Side::Down,
                action: OrderAction::Buy,
                shares,
                limit_price: down_cost.worst_price,
                expected_total: down_cost.total,
                reason: DecisionReason::StraddleLeg,
            },
        ])
    }

    fn on_fill(&mut self, decision: &Decision, fill: &Fill) {
        let mut next: Option<ArbState> = None;

        match &mut self.state {
            ArbState::Pending(pending) if decision.action == OrderAction::Buy => {
                self.ledger.debit(fill.total_cost());
                match decision.side {
                    Side::Up => pending.up_fill = Some(fill.clone()),
                    Side::Down => pending.down_fill = Some(fill.clone()),
                }
                if let (Some(up), Some(down)) = (&pending.up_fill, &pending.down_fill) {
                    next = Some(ArbState::Open(OpenStraddle {
                        market_id: pending.market_id.clone(),
                        up_token_id: up.token_id.clone(),
                        down_token_id: down.token_id.clone(),
                        shares: pending.shares,
                        total_cost: up.total_cost() + down.total_cost(),
                        total_fee: up.fee + down.fee,
                        total_gas: up.gas + down.gas,
                        opened_at: up.timestamp.min(down.timestamp),
                        settling: 0,
                        winner: None,
                    }));
                }
            }
            ArbState::Pending(pending) if decision.action == OrderAction::Sell => {
                // Unwind of a broken straddle, or settlement of a partial one
                self.ledger.credit(fill.net_proceeds());
                let entry = pending.up_fill.as_ref().or(pending.down_fill.as_ref());
                if let Some(entry) = entry {
                    let outcome = if decision.reason == DecisionReason::Settlement {
                        TradeOutcome::Settlement
                    } else {
                        TradeOutcome::Abort
                    };
                    self.ledger.record(TradeRecord {
                        market_id: pending.market_id.clone(),
                        side: decision.side,
                        shares: fill.shares,
                        entry_price: entry.price,
                        entry_cost: entry.total_cost(),
                        exit_price: fill.price,
                        exit_proceeds: fill.net_proceeds(),
                        fee: entry.fee + fill.fee,
                        gas: entry.gas + fill.gas,
                        outcome,
                        opened_at: entry.timestamp,
                        closed_at: fill.timestamp,
                    });
                }
                next = Some(ArbState::Idle);
            }
            ArbState::Open(open) if decision.action == OrderAction::Sell => {
                self.ledger.credit(fill.net_proceeds());
                if open.settling > 0 {
                    open.settling -= 1;
                }
                if open.settling == 0 {
                    let winner = open.winner.unwrap_or(Side::Up);
                    let shares = open.shares;
                    let pair_cost = open.total_cost / Decimal::from(shares);
                    self.ledger.record(TradeRecord {
                        market_id: open.market_id.clone(),
                        side: winner,
                        shares,
                        entry_price: pair_cost,
                        entry_cost: open.total_cost - open.total_gas,
                        exit_price: Decimal::ONE,
                        exit_proceeds: Decimal::from(shares),
                        fee: open.total_fee,
                        gas: open.total_gas,
                        outcome: TradeOutcome::Settlement,
                        opened_at: open.opened_at,
                        closed_at: fill.timestamp,
                    });
                    tracing::info!(
                        market = %open.market_id,
                        shares,
                        pair_cost = %pair_cost,
                        "Straddle settled"
                    );
                    next = Some(ArbState::Idle);
                }
            }
            _ => {
                tracing::warn!(
                    decision = %decision.id,
                    "Fill arrived in an unexpected state"
                );
            }
        }

        if let Some(state) = next {
            self.state = state;
        }
    }

    fn on_reject(&mut self, decision: &Decision) {
        let mut back_to_idle = false;

        if let ArbState::Pending(pending) = &mut self.state {
            if decision.action == OrderAction::Buy {
                if pending.up_fill.is_none() && pending.down_fill.is_none() {
                    // Nothing filled yet; the straddle simply never opened
                    back_to_idle = true;
                } else {
                    pending.broken = true;
                    tracing::warn!(
                        market = %pending.market_id,
                        "Straddle leg killed, unwinding the filled leg"
                    );
                }
            }
        }

        if back_to_idle {
            self.state = ArbState::Idle;
        }
    }

    fn on_interval_roll(&mut self, _world: &WorldState, winner: Option<Side>) -> Vec<Decision> {
        let Some(winner) = winner else {
            if !matches!(self.state, ArbState::Idle) {
                tracing::warn!("Interval rolled without a determinable winner, holding");
            }
            return vec![];
        };

        match &mut self.state {
            ArbState::Open(open) => {
                open.settling = 2;
                open.winner = Some(winner);
                vec![
                    settlement_decision(
                        &open.market_id,
                        &open.up_token_id,
                        Side::Up,
                        open.shares,
                        winner,
                    ),
                    settlement_decision(
                        &open.market_id,
                        &open.down_token_id,
                        Side::Down,
                        open.shares,
                        winner,
                    ),
                ]
            }
            ArbState::Pending(pending) => {
                // A partial straddle at resolution settles whatever filled
                let mut decisions = vec![];
                if let Some(fill) = &pending.up_fill {
                    decisions.push(settlement_decision(
                        &pending.market_id,
                        &fill.token_id,
                        Side::Up,
                        fill.shares,
                        winner,
                    ));
                }
                if let Some(fill) = &pending.down_fill {
                    decisions.push(settlement_decision(
                        &pending.market_id,
                        &fill.token_id,
                        Side::Down,
                        fill.shares,
                        winner,
                    ));
                }
                decisions
            }
            ArbState::Idle => vec![],
        }
    }

    fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    fn has_open_position(&self) -> bool {
        !matches!(self.state, ArbState::Idle)
    }
}
