//! Lag strategy
//!
//! The reference feed moves first; the outcome tokens reprice with a delay.
//! When a confirmed spot move finds both mids still sitting where they were,
//! the gap between predicted and required repricing is the edge. Every
//! observed response also trains the calibrator and the linear model, so the
//! prediction sharpens as the session runs.
//!
//! Lifecycle: idle, then pending confirmation once an edge clears the bar,
//! then open until take-profit, stop, or settlement.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::book::{cost_to_buy, max_shares_for_budget, proceeds_from_sell, FeeModel};
use crate::config::{CalibratorConfig, LagConfig, LinearModelConfig, StopMode};
use crate::engine::WorldState;
use crate::execution::{Fill, OrderAction};
use crate::ledger::{TradeLedger, TradeOutcome, TradeRecord};
use crate::model::{FeatureVector, OnlineLinearModel, ResponseCalibrator};
use crate::strategy::{
    Confirmation, Decision, DecisionReason, OpenPosition, SkipReason, Side, Strategy,
};

/// EMA weight for latency statistics
const LATENCY_EMA_WEIGHT: Decimal = Decimal::from_parts(2, 0, 0, false, 1); // 0.2

/// Realized response latency statistics
#[derive(Debug, Clone, Default)]
pub struct LatencyStats {
    /// Smoothed latency in milliseconds
    pub ema_ms: Decimal,
    /// Most recent observation
    pub last_ms: i64,
    /// Worst observation
    pub max_ms: i64,
    /// Observation count
    pub samples: u32,
}

impl LatencyStats {
    fn record(&mut self, latency_ms: i64) {
        let observed = Decimal::from(latency_ms);
        if self.samples == 0 {
            self.ema_ms = observed;
        } else {
            self.ema_ms += LATENCY_EMA_WEIGHT * (observed - self.ema_ms);
        }
        self.last_ms = latency_ms;
        self.max_ms = self.max_ms.max(latency_ms);
        self.samples += 1;
    }
}

/// An unresponded spot move under observation
#[derive(Debug, Clone)]
struct LagWindow {
    opened_at: DateTime<Utc>,
    /// Side favored by the move
    side: Side,
    /// Absolute spot move that opened the window (dollars)
    magnitude: Decimal,
    /// Favored token mid when the window opened
    start_mid: Decimal,
    /// Feature snapshot at open, the training input if a response lands
    features: FeatureVector,
}

/// Stop and target planned at decision time, applied on the entry fill
#[derive(Debug, Clone)]
struct PlannedEntry {
    decision_id: Uuid,
    side: Side,
    stop_price: Decimal,
    target_price: Decimal,
    settles_at: DateTime<Utc>,
}

/// Lag strategy state machine
pub struct LagStrategy {
    config: LagConfig,
    fees: FeeModel,
    calibrator: ResponseCalibrator,
    model: OnlineLinearModel,
    ledger: TradeLedger,
    window: Option<LagWindow>,
    latency: LatencyStats,
    entry_gate: Confirmation,
    sl_gate: Confirmation,
    planned: Option<PlannedEntry>,
    position: Option<OpenPosition>,
    cooldown_until: Option<DateTime<Utc>>,
}

impl LagStrategy {
    /// Create the strategy with fresh model state
    ///
    /// Calibrator and model state live for the process only; they are not
    /// persisted across runs.
    pub fn new(
        config: LagConfig,
        fees: FeeModel,
        calibrator_config: &CalibratorConfig,
        model_config: &LinearModelConfig,
    ) -> Self {
        let entry_gate = Confirmation::new(config.confirm_ticks);
        let sl_gate = Confirmation::new(config.sl_confirm_ticks);
        let ledger = TradeLedger::new("lag", config.capital);
        Self {
            config,
            fees,
            calibrator: ResponseCalibrator::from_config(calibrator_config),
            model: OnlineLinearModel::from_config(model_config),
            ledger,
            window: None,
            latency: LatencyStats::default(),
            entry_gate,
            sl_gate,
            planned: None,
            position: None,
            cooldown_until: None,
        }
    }

    /// Realized latency statistics
    pub fn latency(&self) -> &LatencyStats {
        &self.latency
    }

    /// Calibrator state, exposed for observability
    pub fn calibrator(&self) -> &ResponseCalibrator {
        &self.calibrator
    }

    /// Feature vector for the favored side, signed so positive supports it
    fn build_features(&self, world: &WorldState, side: Side) -> Option<FeatureVector> {
        let spot = world.spot.as_ref()?;
        if spot.price.is_zero() {
            return None;
        }
        let book = world.book(side);
        let mid = book.mid_price()?;

        // Deltas in percent of spot, flipped so a favorable move is positive
        let orientation = match side {
            Side::Up => Decimal::ONE,
            Side::Down => Decimal::NEGATIVE_ONE,
        };
        let normalize = |delta: Decimal| delta / spot.price * Decimal::ONE_HUNDRED * orientation;

        let now = world.now;
        let fast = world
            .history
            .spot
            .delta_over_seconds(now, self.config.fast_window_secs)?;
        let slow = world
            .history
            .spot
            .delta_over_seconds(now, self.config.slow_window_secs)
            .unwrap_or(Decimal::ZERO);
        let baseline = world
            .history
            .spot
            .delta_over_seconds(now, self.config.baseline_window_secs)
            .unwrap_or(Decimal::ZERO);

        let spread_cents = book.spread()? * Decimal::ONE_HUNDRED;
        let imbalance = book.imbalance().unwrap_or(Decimal::ZERO);
        let micro_pressure = book
            .microprice()
            .map(|micro| (micro - mid) * Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ZERO);

        // Missing flow stays neutral rather than poisoning the model
        let flow = world.flow(side).metrics(now);
        let (flow_ratio, flow_imbalance, flow_price_delta) = match flow {
            Some(metrics) => (
                metrics.volume_ratio,
                metrics.imbalance,
                metrics.price_delta * Decimal::ONE_HUNDRED,
            ),
            None => (Decimal::ONE, Decimal::ZERO, Decimal::ZERO),
        };

        Some(FeatureVector {
            fast_delta: normalize(fast),
            slow_delta: normalize(slow),
            baseline_delta: normalize(baseline),
            spread: spread_cents,
            imbalance,
            micro_pressure,
            flow_ratio,
            flow_imbalance,
            flow_price_delta,
        })
    }

    /// Track lag windows and feed observed responses into the models
    fn maintain_window(&mut self, world: &WorldState) {
        let now = world.now;

        if let Some(window) = &self.window {
            if now - window.opened_at > Duration::seconds(self.config.window_max_age_secs as i64) {
                tracing::debug!(side = %window.side, "Lag window expired unanswered");
                self.window = None;
            } else if let Some(mid) = world.book(window.side).mid_price() {
                let response_cents = (mid - window.start_mid) * Decimal::ONE_HUNDRED;
                if response_cents >= self.config.response_threshold_cents {
                    let latency_ms = (now - window.opened_at).num_milliseconds();
                    self.latency.record(latency_ms);
                    crate::telemetry::record_lag_latency(latency_ms as f64);
                    self.calibrator.observe(response_cents, window.magnitude);
                    self.model.update(&window.features, response_cents);
                    tracing::info!(
                        side = %window.side,
                        latency_ms,
                        response_cents = %response_cents,
                        ema_latency_ms = %self.latency.ema_ms,
                        "Market responded to spot move"
                    );
                    self.window = None;
                }
            }
        }

        if self.window.is_some() {
            return;
        }

        // A new window needs a confirmed fast move with both mids unmoved
        let Some(fast) = world
            .history
            .spot
            .delta_over_seconds(now, self.config.fast_window_secs)
        else {
            return;
        };
        if fast.abs() < self.config.spot_move_threshold {
            return;
        }

        let window_secs = self.config.fast_window_secs;
        let mid_moves = [Side::Up, Side::Down].map(|side| {
            world
                .mids(side)
                .delta_over_seconds(now, window_secs)
                .map(|d| d.abs())
        });
        let unresponded = mid_moves.iter().all(|m| {
            matches!(m, Some(moved) if *moved * Decimal::ONE_HUNDRED < self.config.max_mid_response_cents)
        });
        if !unresponded {
            return;
        }

        let side = if fast > Decimal::ZERO {
            Side::Up
        } else {
            Side::Down
        };
        let Some(start_mid) = world.book(side).mid_price() else {
            return;
        };
        let Some(features) = self.build_features(world, side) else {
            return;
        };

        tracing::info!(
            side = %side,
            magnitude = %fast.abs(),
            start_mid = %start_mid,
            "Lag window opened"
        );
        self.window = Some(LagWindow {
            opened_at: now,
            side,
            magnitude: fast.abs(),
            start_mid,
            features,
        });
    }

    /// Effective stop distance in cents for a planned entry
    fn stop_cents(&self, entry_price: Decimal, tp_cents: Decimal) -> Decimal {
        let dynamic = (tp_cents * self.config.sl_fraction_of_tp)
            .max(self.config.min_sl_cents)
            .min(self.config.max_sl_cents);
        let percent = entry_price * self.config.percent_stop * Decimal::ONE_HUNDRED;
        match self.config.stop_mode {
            StopMode::Percent => percent,
            StopMode::Dynamic => dynamic,
            // Stricter stop is the one that cuts losses sooner
            StopMode::Stricter => dynamic.min(percent),
        }
    }

    /// Evaluate a possible entry once a lag window is open
    fn check_entry(&mut self, world: &WorldState) -> Result<Vec<Decision>, SkipReason> {
        if world.halted.is_some() {
            return Err(SkipReason::Halted);
        }
        if world.feeds_disagree(self.config.max_feed_divergence) {
            self.entry_gate.reset();
            return Err(SkipReason::FeedDisagreement);
        }
        if let Some(until) = self.cooldown_until {
            if world.now < until {
                return Err(SkipReason::Cooldown);
            }
        }

        let interval = world.interval.as_ref().ok_or(SkipReason::NoInterval)?;
        let window = self.window.as_ref().ok_or(SkipReason::NoCandidate)?;
        let side = window.side;

        let fee_bps = world.fee_bps(side).ok_or(SkipReason::UnknownFee)?;
        let book = world.book(side);
        let ask = book.best_ask().ok_or(SkipReason::NoCandidate)?;
        let bid = book.best_bid().ok_or(SkipReason::NoCandidate)?;
        let mid = (ask + bid) / Decimal::TWO;

        let features = self
            .build_features(world, side)
            .ok_or(SkipReason::NoCandidate)?;

        // Predicted repricing: calibrated heuristic blended with the model
        let heuristic_cents = window.magnitude * self.calibrator.rate();
        let predicted_cents = self.model.blend(heuristic_cents, &features);

        // Required edge: round-trip fees, spread, a flat floor, and
        // context-dependent penalties, less a bonus for aligned flow
        let spread_cents = (ask - bid) * Decimal::ONE_HUNDRED;
        let breakeven_cents = self.fees.round_trip_cents(ask);
        let mut required_cents =
            breakeven_cents + spread_cents + self.config.min_edge_cents;

        if features.imbalance < self.config.pressure_weak_threshold {
            required_cents += self.config.pressure_penalty_cents;
        }
        if features.slow_delta != Decimal::ZERO
            && features.fast_delta.is_sign_positive() != features.slow_delta.is_sign_positive()
        {
            required_cents += self.config.sign_penalty_cents;
        }
        let flow_aligned = features.flow_imbalance > Decimal::ZERO
            && features.flow_ratio >= self.config.flow_strong_ratio;
        let flow_against = features.flow_imbalance <= Decimal::ZERO
            || features.flow_ratio < self.config.flow_weak_ratio;
        if flow_aligned {
            required_cents -= self.config.flow_bonus_cents;
        } else if flow_against {
            required_cents += self.config.flow_penalty_cents;
        }

        if predicted_cents < required_cents {
            return Err(SkipReason::EdgeTooSmall {
                predicted: predicted_cents.round_dp(3),
                required: required_cents.round_dp(3),
            });
        }

        // Take-profit net of whatever the market already repriced
        let realized_cents = (mid - window.start_mid) * Decimal::ONE_HUNDRED;
        let net_cents = predicted_cents - realized_cents.max(Decimal::ZERO);
        if net_cents < self.config.min_tp_cents {
            return Err(SkipReason::EdgeTooSmall {
                predicted: net_cents.round_dp(3),
                required: self.config.min_tp_cents,
            });
        }
        let tp_cents = net_cents.min(self.config.max_tp_cents);
        let sl_cents = self.stop_cents(ask, tp_cents);

        let target_price = ask + tp_cents / Decimal::ONE_HUNDRED;
        let stop_price = ask - sl_cents / Decimal::ONE_HUNDRED;

        // Even a run to the cap must clear fees to be worth entering
        let entry_fee_cents = self.fees.taker_fee(ask, ask) * Decimal::ONE_HUNDRED;
        let exit_fee_at_cap_cents = self.fees.taker_fee(self.config.price_cap, self.config.price_cap)
            * Decimal::ONE_HUNDRED;
        if target_price > self.config.price_cap {
            return Err(SkipReason::TargetUnreachable);
        }
        let cap_gain_cents = (self.config.price_cap - ask) * Decimal::ONE_HUNDRED;
        if cap_gain_cents <= entry_fee_cents + exit_fee_at_cap_cents {
            return Err(SkipReason::TargetUnreachable);
        }

        let ratio = if sl_cents.is_zero() {
            Decimal::ZERO
        } else {
            tp_cents / sl_cents
        };
        if ratio < self.config.min_risk_reward {
            return Err(SkipReason::RiskRewardTooLow {
                ratio: ratio.round_dp(2),
                required: self.config.min_risk_reward,
            });
        }

        // Size to the lesser of book depth and the risk budget at the stop
        let budget = self.ledger.available();
        let depth_shares = max_shares_for_budget(&book.asks, fee_bps, budget, 1)
            .ok_or(SkipReason::BudgetTooSmall)?;

        let exit_fee_at_stop = self.fees.taker_fee(stop_price, stop_price);
        let worst_loss_per_share =
            (ask - stop_price) + self.fees.taker_fee(ask, ask) + exit_fee_at_stop;
        let risk_budget = budget * self.config.risk_budget_pct;
        let risk_shares = if worst_loss_per_share <= Decimal::ZERO {
            depth_shares
        } else {
            (risk_budget / worst_loss_per_share)
                .floor()
                .to_u64()
                .unwrap_or(0)
        };
        let shares = depth_shares.min(risk_shares);
        if shares == 0 {
            return Err(SkipReason::RiskCapBlocksTrade);
        }

        // Same side at the same price for N consecutive ticks before acting
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
            reason: DecisionReason::LagEntry,
        };
        self.planned = Some(PlannedEntry {
            decision_id: decision.id,
            side,
            stop_price,
            target_price,
            settles_at: interval.close_time,
        });

        tracing::info!(
            market = %interval.market_id,
            side = %side,
            shares,
            predicted_cents = %predicted_cents.round_dp(3),
            required_cents = %required_cents.round_dp(3),
            tp_cents = %tp_cents,
            sl_cents = %sl_cents,
            "Lag entry admitted"
        );
        Ok(vec![decision])
    }

    /// Exit evaluation for the open position, take-profit before stop
    fn check_exit(&mut self, world: &WorldState) -> Result<Vec<Decision>, SkipReason> {
        let Some(position) = &self.position else {
            return Err(SkipReason::NoCandidate);
        };
        let book = world.book(position.side);
        let fee_bps = world.fee_bps(position.side).ok_or(SkipReason::UnknownFee)?;
        let bid = book.best_bid().ok_or(SkipReason::NoCandidate)?;
        let mark = book.mid_price().unwrap_or(bid);

        if let Some(target) = position.target_price {
            if bid >= target {
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
                    reason: DecisionReason::LagTakeProfit,
                }]);
            }
        }

        if let Some(stop) = position.stop_price {
            // The stop stays disarmed through the post-entry grace period so
            // entry-tick noise cannot instantly shake the position out
            let armed = (world.now - position.opened_at).num_seconds()
                >= self.config.grace_secs as i64;
            if armed && (bid <= stop || mark <= stop) {
                if self.sl_gate.observe(position.side, bid) {
                    let proceeds =
                        proceeds_from_sell(&book.bids, position.shares, fee_bps, Decimal::ZERO)
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
                        reason: DecisionReason::LagStopLoss,
                    }]);
                }
                return Err(SkipReason::AwaitingConfirmation);
            }
            self.sl_gate.reset();
        }

        Err(SkipReason::NoCandidate)
    }
}

impl Strategy for LagStrategy {
    fn name(&self) -> &'static str {
        "lag"
    }

    fn on_tick(&mut self, world: &WorldState) -> Result<Vec<Decision>, SkipReason> {
        // Window bookkeeping and model training run in every phase
        self.maintain_window(world);

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
                self.cooldown_until =
                    Some(fill.timestamp + Duration::seconds(self.config.cooldown_secs as i64));
                let settles_at = planned.settles_at;
                self.position = Some(OpenPosition {
                    market_id: decision.market_id.clone(),
                    token_id: decision.token_id.clone(),
                    side: planned.side,
                    shares: fill.shares,
                    entry_price: fill.price,
                    entry_cost: fill.total_cost(),
                    entry_fee: fill.fee,
                    entry_gas: fill.gas,
                    stop_price: Some(planned.stop_price),
                    target_price: Some(planned.target_price),
                    opened_at: fill.timestamp,
                    settles_at,
                });
                self.entry_gate.reset();
                self.sl_gate.reset();
            }
            OrderAction::Sell => {
                let Some(position) = self.position.take() else {
                    tracing::warn!(decision = %decision.id, "Exit fill without a position");
                    return;
                };
                self.ledger.credit(fill.net_proceeds());
                let (outcome, cooldown_secs) = match decision.reason {
                    DecisionReason::LagStopLoss => {
                        (TradeOutcome::StopLoss, self.config.stop_cooldown_secs)
                    }
                    DecisionReason::Settlement => {
                        (TradeOutcome::Settlement, self.config.cooldown_secs)
                    }
                    _ => (TradeOutcome::TakeProfit, self.config.cooldown_secs),
                };
                self.cooldown_until =
                    Some(fill.timestamp + Duration::seconds(cooldown_secs as i64));
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
                self.entry_gate.reset();
                self.sl_gate.reset();
            }
        }
    }

    fn on_reject(&mut self, decision: &Decision) {
        if decision.action == OrderAction::Buy {
            // The planned stop/target die with the order; next tick starts a
            // clean evaluation
            self.planned = None;
            self.entry_gate.reset();
        }
        tracing::warn!(
            decision = %decision.id,
            reason = decision.reason.label(),
            "Lag order not filled, state unchanged"
        );
    }

    fn on_interval_roll(&mut self, _world: &WorldState, winner: Option<Side>) -> Vec<Decision> {
        // Stale lag windows die with the interval; model state survives
        self.window = None;
        self.entry_gate.reset();

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
