//! Certainty strategy
//!
//! Late in the interval one side usually trades near certainty. The strategy
//! buys that side only inside a trailing window before resolution, only on
//! bullish one-minute momentum, and only while the ask sits in a required
//! band with a tight spread. After a stop-out the band re-anchors around the
//! realized exit so re-entry happens near where the position was lost, on
//! whichever side qualifies first.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::book::{cost_to_buy, max_shares_for_budget, proceeds_from_sell};
use crate::config::CertaintyConfig;
use crate::engine::WorldState;
use crate::execution::{Fill, OrderAction};
use crate::ledger::{TradeLedger, TradeOutcome, TradeRecord};
use crate::strategy::{
    Confirmation, Decision, DecisionReason, OpenPosition, SkipReason, Side, Strategy,
};

/// Sub-state scoped to one interval
#[derive(Debug, Clone)]
struct IntervalScope {
    market_id: String,
    /// First tick that saw this interval, the warm-up clock
    first_seen: DateTime<Utc>,
    /// Entry band override after a stop-out, cleared by a successful re-entry
    reentry_band: Option<(Decimal, Decimal)>,
    cooldown_until: Option<DateTime<Utc>>,
}

/// Entry metadata carried from decision to fill
#[derive(Debug, Clone)]
struct PlannedEntry {
    decision_id: Uuid,
    settles_at: DateTime<Utc>,
}

/// Certainty strategy state machine
pub struct CertaintyStrategy {
    config: CertaintyConfig,
    ledger: TradeLedger,
    scope: Option<IntervalScope>,
    entry_gate: Confirmation,
    exit_gate: Confirmation,
    planned: Option<PlannedEntry>,
    position: Option<OpenPosition>,
}

impl CertaintyStrategy {
    /// Create the strategy with its capital allocation
    pub fn new(config: CertaintyConfig) -> Self {
        let entry_gate = Confirmation::new(config.confirm_ticks);
        let exit_gate = Confirmation::new(config.exit_confirm_ticks);
        let ledger = TradeLedger::new("certainty", config.capital);
        Self {
            config,
            ledger,
            scope: None,
            entry_gate,
            exit_gate,
            planned: None,
            position: None,
        }
    }

    /// Required entry band for the current scope
    fn entry_band(&self) -> (Decimal, Decimal) {
        self.scope
            .as_ref()
            .and_then(|s| s.reentry_band)
            .unwrap_or((self.config.entry_min, self.config.entry_max))
    }

    /// Re-key the interval scope when the tracked interval changes
    fn refresh_scope(&mut self, world: &WorldState) {
        let Some(interval) = &world.interval else {
            return;
        };
        let stale = self
            .scope
            .as_ref()
            .map(|s| s.market_id != interval.market_id)
            .unwrap_or(true);
        if stale {
            self.scope = Some(IntervalScope {
                market_id: interval.market_id.clone(),
                first_seen: world.now,
                reentry_band: None,
                cooldown_until: None,
            });
            self.entry_gate.reset();
            self.exit_gate.reset();
        }
    }

    fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.scope
            .as_ref()
            .and_then(|s| s.cooldown_until)
            .map(|until| now < until)
            .unwrap_or(false)
    }

    fn start_cooldown(&mut self, from: DateTime<Utc>) {
        if let Some(scope) = &mut self.scope {
            scope.cooldown_until = Some(from + Duration::seconds(self.config.cooldown_secs as i64));
        }
    }

    /// Exit evaluation, take-profit zone before the stop
    fn check_exit(&mut self, world: &WorldState) -> Result<Vec<Decision>, SkipReason> {
        let Some(position) = &self.position else {
            return Err(SkipReason::NoCandidate);
        };
        if self.in_cooldown(world.now) {
            return Err(SkipReason::Cooldown);
        }

        let book = world.book(position.side);
        let fee_bps = world.fee_bps(position.side).ok_or(SkipReason::UnknownFee)?;
        let bid = book.best_bid().ok_or(SkipReason::NoCandidate)?;

        // Take-profit: the bid walked into the target zone
        if bid >= self.config.tp_zone_min && bid <= self.config.tp_zone_max {
            if !self.exit_gate.observe(position.side, bid) {
                return Err(SkipReason::AwaitingConfirmation);
            }
            let proceeds = proceeds_from_sell(&book.bids, position.shares, fee_bps, Decimal::ZERO)
                .map_err(|_| SkipReason::InsufficientDepth)?;
            return Ok(vec![Decision {
                id: Uuid::new_v4(),
                market_id: position.market_id.clone(),
                token_id: position.token_id.clone(),
                side: position.side,
                action: OrderAction::Sell,
                shares: position.shares,
                limit_price: proceeds.worst_price,
                expected_total: proceeds.total,
                reason: DecisionReason::CertaintyTakeProfit,
            }]);
        }

        // Stop: at or below the trigger, filled at the best bid level still
        // inside the buffer instead of demanding the trigger price itself
        if bid <= self.config.sl_price {
            if !self.exit_gate.observe(position.side, bid) {
                return Err(SkipReason::AwaitingConfirmation);
            }
            let floor = self.config.sl_price - self.config.sl_fill_buffer;
            let proceeds = proceeds_from_sell(&book.bids, position.shares, fee_bps, floor)
                .map_err(|_| SkipReason::InsufficientDepth)?;
            return Ok(vec![Decision {
                id: Uuid::new_v4(),
                market_id: position.market_id.clone(),
                token_id: position.token_id.clone(),
                side: position.side,
                action: OrderAction::Sell,
                shares: position.shares,
                limit_price: proceeds.worst_price,
                expected_total: proceeds.total,
                reason: DecisionReason::CertaintyStopLoss,
            }]);
        }

        self.exit_gate.reset();
        Err(SkipReason::NoCandidate)
    }

    /// Entry evaluation inside the trailing window
    fn check_entry(&mut self, world: &WorldState) -> Result<Vec<Decision>, SkipReason> {
        if world.halted.is_some() {
            return Err(SkipReason::Halted);
        }
        let interval = world.interval.as_ref().ok_or(SkipReason::NoInterval)?;
        let scope = self.scope.as_ref().ok_or(SkipReason::NoInterval)?;

        // Observation time before the first entry of an interval
        if (world.now - scope.first_seen).num_seconds() < self.config.warmup_secs as i64 {
            return Err(SkipReason::WarmingUp);
        }
        // Entries only in the trailing window before resolution
        let to_close = interval.seconds_to_close(world.now);
        if to_close <= 0 || to_close > self.config.entry_window_secs as i64 {
            return Err(SkipReason::OutsideWindow);
        }
        if self.in_cooldown(world.now) {
            return Err(SkipReason::Cooldown);
        }

        let (band_lo, band_hi) = self.entry_band();
        let mut fee_missing = false;

        // Either side may qualify; the first that does is the candidate
        for side in [Side::Up, Side::Down] {
            let book = world.book(side);
            let Some(ask) = book.best_ask() else {
                continue;
            };
            if ask < band_lo || ask > band_hi {
                continue;
            }
            let Some(spread) = book.spread() else {
                continue;
            };
            if spread * Decimal::ONE_HUNDRED > self.config.max_spread_cents {
                continue;
            }
            if !world.candles(side).is_bullish() {
                continue;
            }
            let Some(fee_bps) = world.fee_bps(side) else {
                fee_missing = true;
                continue;
            };

            // Full budget, sized against real depth
            let budget = self.ledger.available();
            let shares = max_shares_for_budget(&book.asks, fee_bps, budget, 1)
                .ok_or(SkipReason::BudgetTooSmall)?;

            if !self.entry_gate.observe(side, ask) {
                return Err(SkipReason::AwaitingConfirmation);
            }

            let cost = cost_to_buy(&book.asks, shares, fee_bps)
                .map_err(|_| SkipReason::InsufficientDepth)?;
            let decision = Decision {
                id: Uuid::new_v4(),
                market_id: interval.market_id.clone(),
                token_id: side.token_id(interval).to_string(),
                side,
                action: OrderAction::Buy,
                shares,
                limit_price: cost.worst_price,
                expected_total: cost.total,
                reason: DecisionReason::CertaintyEntry,
            };
            self.planned = Some(PlannedEntry {
                decision_id: decision.id,
                settles_at: interval.close_time,
            });
            tracing::info!(
                market = %interval.market_id,
                side = %side,
                shares,
                ask = %ask,
                band_lo = %band_lo,
                band_hi = %band_hi,
                "Certainty entry admitted"
            );
            return Ok(vec![decision]);
        }

        if fee_missing {
            return Err(SkipReason::UnknownFee);
        }
        self.entry_gate.reset();
        Err(SkipReason::NoCandidate)
    }
}

impl Strategy for CertaintyStrategy {
    fn name(&self) -> &'static str {
        "certainty"
    }

    fn on_tick(&mut self, world: &WorldState) -> Result<Vec<Decision>, SkipReason> {
        self.refresh_scope(world);

        if let Some(position) = &self.position {
            if let Some(interval) = &world.interval {
                if !position.matches_interval(interval) {
                    tracing::warn!(
                        position_market = %position.market_id,
                        world_market = %interval.market_id,
                        "Open position references a stale interval, freezing exits"
                    );
                    return Err(SkipReason::StaleInterval);
                }
            }
            return self.check_exit(world);
        }

        self.check_entry(world)
    }

    fn on_fill(&mut self, decision: &Decision, fill: &Fill) {
        match decision.action {
            OrderAction::Buy => {
                let planned = match self.planned.take() {
                    Some(planned) if planned.decision_id == decision.id => planned,
                    other => {
                        tracing::warn!(decision = %decision.id, "Entry fill without a plan");
                        self.planned = other;
                        return;
                    }
                };
                self.ledger.debit(fill.total_cost());
                self.position = Some(OpenPosition {
                    market_id: decision.market_id.clone(),
                    token_id: decision.token_id.clone(),
                    side: decision.side,
                    shares: fill.shares,
                    entry_price: fill.price,
                    entry_cost: fill.total_cost(),
                    entry_fee: fill.fee,
                    entry_gas: fill.gas,
                    stop_price: Some(self.config.sl_price),
                    target_price: Some(self.config.tp_zone_min),
                    opened_at: fill.timestamp,
                    settles_at: planned.settles_at,
                });
                // A successful re-entry clears the stop-anchored band
                if let Some(scope) = &mut self.scope {
                    scope.reentry_band = None;
                }
                self.start_cooldown(fill.timestamp);
                self.entry_gate.reset();
                self.exit_gate.reset();
            }
            OrderAction::Sell => {
                let Some(position) = self.position.take() else {
                    tracing::warn!(decision = %decision.id, "Exit fill without a position");
                    return;
                };
                self.ledger.credit(fill.net_proceeds());
                let outcome = match decision.reason {
                    DecisionReason::CertaintyStopLoss => TradeOutcome::StopLoss,
                    DecisionReason::Settlement => TradeOutcome::Settlement,
                    _ => TradeOutcome::TakeProfit,
                };
                if outcome == TradeOutcome::StopLoss {
                    // Anchor the re-entry band around the realized exit
                    let band = (
                        fill.price - self.config.reentry_buffer,
                        fill.price + self.config.reentry_buffer,
                    );
                    if let Some(scope) = &mut self.scope {
                        scope.reentry_band = Some(band);
                    }
                    tracing::info!(
                        exit = %fill.price,
                        band_lo = %band.0,
                        band_hi = %band.1,
                        "Stop-out, re-entry band anchored"
                    );
                }
                self.ledger.record(TradeRecord {
                    market_id: position.market_id.clone(),
                    side: position.side,
                    shares: position.shares,
                    entry_price: position.entry_price,
                    entry_cost: position.entry_cost,
                    exit_price: fill.price,
                    exit_proceeds: fill.net_proceeds(),
                    fee: position.entry_fee + fill.fee,
                    gas: position.entry_gas + fill.gas,
                    outcome,
                    opened_at: position.opened_at,
                    closed_at: fill.timestamp,
                });
                self.start_cooldown(fill.timestamp);
                self.entry_gate.reset();
                self.exit_gate.reset();
            }
        }
    }

    fn on_reject(&mut self, decision: &Decision) {
        if decision.action == OrderAction::Buy {
            self.planned = None;
            self.entry_gate.reset();
        } else {
            self.exit_gate.reset();
        }
        tracing::warn!(
            decision = %decision.id,
            reason = decision.reason.label(),
            "Certainty order not filled, state unchanged"
        );
    }

    fn on_interval_roll(&mut self, _world: &WorldState, winner: Option<Side>) -> Vec<Decision> {
        // Scope state dies with the interval; refresh_scope rebuilds it
        self.scope = None;
        self.entry_gate.reset();
        self.exit_gate.reset();

        let Some(position) = &self.position else {
            return vec![];
        };
        let Some(winner) = winner else {
            tracing::warn!("Interval rolled without a winner, holding position frozen");
            return vec![];
        };
        let payout = if position.side == winner {
            Decimal::ONE
        } else {
            Decimal::ZERO
        };
        vec![Decision {
            id: Uuid::new_v4(),
            market_id: position.market_id.clone(),
            token_id: position.token_id.clone(),
            side: position.side,
            action: OrderAction::Sell,
            shares: position.shares,
            limit_price: payout,
            expected_total: payout * Decimal::from(position.shares),
            reason: DecisionReason::Settlement,
        }]
    }

    fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    fn has_open_position(&self) -> bool {
        self.position.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{OrderBook, PriceLevel};
    use crate::engine::{IntervalMarket, SpotQuote};
    use crate::history::SignalHistory;
    use rust_decimal_macros::dec;

    fn strategy() -> CertaintyStrategy {
        let config = CertaintyConfig {
            confirm_ticks: 1,
            exit_confirm_ticks: 1,
            warmup_secs: 0,
            cooldown_secs: 0,
            ..Default::default()
        };
        CertaintyStrategy::new(config)
    }

    fn book_for(token: &str, bid: Decimal, ask: Decimal) -> OrderBook {
        let mut book = OrderBook::new(token);
        book.bids = vec![PriceLevel::new(bid, dec!(500))];
        book.asks = vec![PriceLevel::new(ask, dec!(500))];
        book
    }

    /// World inside the trailing entry window with a bullish up candle
    fn world_in_window(now: DateTime<Utc>, up_ask: Decimal, candle_open: Decimal) -> WorldState {
        let mut world = WorldState::new(SignalHistory::default());
        world.now = now;
        world.interval = Some(IntervalMarket {
            market_id: "btc-updown-1".to_string(),
            up_token_id: "tok-up".to_string(),
            down_token_id: "tok-down".to_string(),
            open_price: dec!(95000),
            open_time: now - Duration::minutes(12),
            close_time: now + Duration::minutes(3),
        });
        world.spot = Some(SpotQuote {
            price: dec!(95500),
            timestamp: now,
        });
        world.up_book = book_for("tok-up", up_ask - dec!(0.01), up_ask);
        world.down_book = book_for("tok-down", dec!(0.15), dec!(0.20));
        world.up_fee_bps = Some(dec!(100));
        world.down_fee_bps = Some(dec!(100));

        // One-minute candle for the up side opening at `candle_open` and
        // closing at the current ask; both records share a timestamp so the
        // candle never straddles a minute boundary
        world.history.up_candles.record(now, candle_open);
        world.history.up_candles.record(now, up_ask);
        world
    }

    #[test]
    fn test_no_entry_below_band() {
        let mut strategy = strategy();
        let now = Utc::now();
        // Bullish candle but ask still below 0.80
        let world = world_in_window(now, dec!(0.78), dec!(0.78));
        assert_eq!(strategy.on_tick(&world), Err(SkipReason::NoCandidate));
    }

    #[test]
    fn test_entry_once_ask_reaches_band() {
        let mut strategy = strategy();
        let now = Utc::now();

        let world = world_in_window(now, dec!(0.78), dec!(0.78));
        assert!(strategy.on_tick(&world).is_err());

        let world = world_in_window(now + Duration::seconds(1), dec!(0.80), dec!(0.78));
        let decisions = strategy.on_tick(&world).expect("entry in band");
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].side, Side::Up);
        assert_eq!(decisions[0].reason, DecisionReason::CertaintyEntry);

        // 0.81 would also qualify, but the first qualifying tick proposed
        assert!(decisions[0].shares > 0);
    }

    #[test]
    fn test_bearish_candle_blocks_entry() {
        let mut strategy = strategy();
        let now = Utc::now();
        // Candle opened at 0.85 and closed at 0.80: bearish
        let world = world_in_window(now, dec!(0.80), dec!(0.85));
        assert_eq!(strategy.on_tick(&world), Err(SkipReason::NoCandidate));
    }

    #[test]
    fn test_outside_window_blocks_entry() {
        let mut strategy = strategy();
        let now = Utc::now();
        let mut world = world_in_window(now, dec!(0.80), dec!(0.78));
        // Ten minutes to close, window is four
        if let Some(interval) = &mut world.interval {
            interval.close_time = now + Duration::minutes(10);
        }
        assert_eq!(strategy.on_tick(&world), Err(SkipReason::OutsideWindow));
    }

    #[test]
    fn test_warmup_blocks_entry() {
        let config = CertaintyConfig {
            confirm_ticks: 1,
            warmup_secs: 60,
            ..Default::default()
        };
        let mut strategy = CertaintyStrategy::new(config);
        let now = Utc::now();
        let world = world_in_window(now, dec!(0.80), dec!(0.78));
        assert_eq!(strategy.on_tick(&world), Err(SkipReason::WarmingUp));
    }

    #[test]
    fn test_wide_spread_blocks_entry() {
        let mut strategy = strategy();
        let now = Utc::now();
        let mut world = world_in_window(now, dec!(0.80), dec!(0.78));
        // Five cent spread against a two cent limit
        world.up_book = book_for("tok-up", dec!(0.75), dec!(0.80));
        assert_eq!(strategy.on_tick(&world), Err(SkipReason::NoCandidate));
    }

    #[test]
    fn test_confirmation_ticks_gate_entry() {
        let config = CertaintyConfig {
            confirm_ticks: 2,
            warmup_secs: 0,
            cooldown_secs: 0,
            ..Default::default()
        };
        let mut strategy = CertaintyStrategy::new(config);
        let now = Utc::now();

        let world = world_in_window(now, dec!(0.80), dec!(0.78));
        assert_eq!(
            strategy.on_tick(&world),
            Err(SkipReason::AwaitingConfirmation)
        );

        let world = world_in_window(now + Duration::seconds(1), dec!(0.80), dec!(0.78));
        assert!(strategy.on_tick(&world).is_ok());
    }

    fn fill_for(decision: &Decision, price: Decimal) -> Fill {
        Fill {
            order_id: Uuid::new_v4(),
            token_id: decision.token_id.clone(),
            action: decision.action,
            price,
            shares: decision.shares,
            notional: price * Decimal::from(decision.shares),
            fee: dec!(0.10),
            gas: dec!(0.01),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_entry_fill_sizes_full_budget() {
        let mut strategy = strategy();
        let now = Utc::now();
        let world = world_in_window(now, dec!(0.80), dec!(0.78));

        let decisions = strategy.on_tick(&world).unwrap();
        let entry = &decisions[0];
        // 100 capital, 0.80 ask plus 100 bps: 123 shares fit
        assert_eq!(entry.shares, 123);

        strategy.on_fill(entry, &fill_for(entry, dec!(0.80)));
        assert!(strategy.has_open_position());

        // No second entry while the position is open
        let world = world_in_window(now + Duration::seconds(1), dec!(0.80), dec!(0.78));
        assert!(strategy.on_tick(&world).is_err());
        assert!(strategy.has_open_position());
    }

    #[test]
    fn test_take_profit_in_zone() {
        let mut strategy = strategy();
        let now = Utc::now();
        let world = world_in_window(now, dec!(0.80), dec!(0.78));
        let decisions = strategy.on_tick(&world).unwrap();
        strategy.on_fill(&decisions[0], &fill_for(&decisions[0], dec!(0.80)));

        let mut world = world_in_window(now + Duration::seconds(30), dec!(0.97), dec!(0.90));
        world.up_book = book_for("tok-up", dec!(0.95), dec!(0.97));

        let exits = strategy.on_tick(&world).unwrap();
        assert_eq!(exits[0].reason, DecisionReason::CertaintyTakeProfit);

        strategy.on_fill(&exits[0], &fill_for(&exits[0], dec!(0.95)));
        assert!(!strategy.has_open_position());
        assert_eq!(strategy.ledger().len(), 1);
        let trade = &strategy.ledger().trades()[0];
        assert_eq!(trade.outcome, TradeOutcome::TakeProfit);
        assert!(trade.roi > dec!(0));
    }

    #[test]
    fn test_stop_loss_anchors_reentry_band() {
        let mut strategy = strategy();
        let now = Utc::now();
        let world = world_in_window(now, dec!(0.80), dec!(0.78));
        let decisions = strategy.on_tick(&world).unwrap();
        strategy.on_fill(&decisions[0], &fill_for(&decisions[0], dec!(0.80)));

        // Bid collapses to 0.68, under the 0.70 trigger
        let mut world = world_in_window(now + Duration::seconds(30), dec!(0.70), dec!(0.78));
        world.up_book = book_for("tok-up", dec!(0.68), dec!(0.70));

        let exits = strategy.on_tick(&world).unwrap();
        assert_eq!(exits[0].reason, DecisionReason::CertaintyStopLoss);

        // Realized exit at 0.745 re-anchors the band around it
        strategy.on_fill(&exits[0], &fill_for(&exits[0], dec!(0.745)));
        assert!(!strategy.has_open_position());
        assert_eq!(strategy.entry_band(), (dec!(0.725), dec!(0.765)));

        // The default band no longer admits; the anchored band does
        let world = world_in_window(now + Duration::seconds(60), dec!(0.74), dec!(0.70));
        let reentry = strategy.on_tick(&world).expect("re-entry inside band");
        assert_eq!(reentry[0].side, Side::Up);

        // A successful re-entry clears the anchor
        strategy.on_fill(&reentry[0], &fill_for(&reentry[0], dec!(0.74)));
        assert_eq!(
            strategy.entry_band(),
            (dec!(0.80), dec!(0.82))
        );
    }

    #[test]
    fn test_reentry_band_admits_either_side() {
        let mut strategy = strategy();
        let now = Utc::now();
        let mut world = world_in_window(now, dec!(0.30), dec!(0.30));
        // Scope must exist before the band can be anchored
        strategy.refresh_scope(&world);
        if let Some(scope) = &mut strategy.scope {
            scope.reentry_band = Some((dec!(0.725), dec!(0.765)));
        }
        // The down side now trades inside the anchored band with bullish
        // momentum
        world.down_book = book_for("tok-down", dec!(0.73), dec!(0.74));
        world.history.down_candles.record(now, dec!(0.70));
        world.history.down_candles.record(now, dec!(0.74));

        let decisions = strategy.on_tick(&world).expect("down side re-entry");
        assert_eq!(decisions[0].side, Side::Down);
    }

    #[test]
    fn test_interval_roll_resets_scope_and_settles() {
        let mut strategy = strategy();
        let now = Utc::now();
        let world = world_in_window(now, dec!(0.80), dec!(0.78));
        let decisions = strategy.on_tick(&world).unwrap();
        strategy.on_fill(&decisions[0], &fill_for(&decisions[0], dec!(0.80)));

        let settlements = strategy.on_interval_roll(&world, Some(Side::Up));
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].limit_price, dec!(1));

        strategy.on_fill(&settlements[0], &fill_for(&settlements[0], dec!(1)));
        assert!(!strategy.has_open_position());
        assert_eq!(
            strategy.ledger().trades()[0].outcome,
            TradeOutcome::Settlement
        );
    }
}
