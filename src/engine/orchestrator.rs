//! Orchestrator
//!
//! Owns the world state and drives the strategies. Three cadences poll the
//! collaborators: quotes (spot feeds), books (order books plus strategy
//! evaluation), and world (interval, fees, budget, equity guard). The loop
//! is single-threaded and cooperative: each cadence step, including its
//! awaited I/O, runs to completion before the next timer fires is honored,
//! and missed timer ticks are dropped rather than queued.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::world::{IntervalMarket, MarketData, SpotQuote, WorldState};
use crate::book::normalize_fee_bps;
use crate::config::EngineConfig;
use crate::execution::{ExecutionEngine, OrderAction};
use crate::history::SignalHistory;
use crate::risk::EquityGuard;
use crate::strategy::{Decision, Side, Strategy};
use crate::telemetry;

/// Drives strategies off a shared snapshot on independent cadences
pub struct Orchestrator<D: MarketData, E: ExecutionEngine> {
    config: EngineConfig,
    data: Arc<D>,
    exec: Arc<E>,
    world: WorldState,
    strategies: Vec<Box<dyn Strategy>>,
    guard: EquityGuard,
}

impl<D: MarketData, E: ExecutionEngine> Orchestrator<D, E> {
    /// Assemble the orchestrator
    pub fn new(
        config: EngineConfig,
        data: Arc<D>,
        exec: Arc<E>,
        strategies: Vec<Box<dyn Strategy>>,
        guard: EquityGuard,
        history: SignalHistory,
    ) -> Self {
        Self {
            config,
            data,
            exec,
            world: WorldState::new(history),
            strategies,
            guard,
        }
    }

    /// Read-only view of the world, for status reporting and tests
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// The strategies driven by this orchestrator
    pub fn strategies(&self) -> &[Box<dyn Strategy>] {
        &self.strategies
    }

    /// Consume the orchestrator, returning its strategies
    pub fn into_strategies(self) -> Vec<Box<dyn Strategy>> {
        self.strategies
    }

    /// Seed the tracked interval, for warm starts
    pub fn seed_interval(&mut self, interval: IntervalMarket) {
        self.world.interval = Some(interval);
    }

    /// Seed the spot quote, for warm starts
    pub fn seed_spot(&mut self, spot: SpotQuote) {
        self.world.spot = Some(spot);
    }

    /// Winning side of a finished interval, judged by the last spot quote
    fn winner_for(&self, finished: &IntervalMarket) -> Option<Side> {
        let spot = self.world.spot.as_ref()?;
        if finished.open_price.is_zero() {
            return None;
        }
        if spot.price >= finished.open_price {
            Some(Side::Up)
        } else {
            Some(Side::Down)
        }
    }

    /// Refresh spot quotes and the spot history
    pub async fn refresh_quotes(&mut self) -> anyhow::Result<()> {
        let spot = self.data.spot().await?;
        self.world.spot_secondary = self.data.spot_secondary().await?;
        self.world
            .history
            .spot
            .record(spot.timestamp, spot.price);
        self.world.spot = Some(spot);
        Ok(())
    }

    /// Refresh interval, fees and the equity guard; settle on rollover
    pub async fn refresh_world(&mut self) -> anyhow::Result<()> {
        let interval = self.data.current_interval().await?;

        let rolled = self
            .world
            .interval
            .as_ref()
            .map(|current| current.market_id != interval.market_id)
            .unwrap_or(false);
        if rolled {
            self.settle_finished_interval().await;
        }

        let up_fee = self.data.taker_fee(&interval.up_token_id).await?;
        let down_fee = self.data.taker_fee(&interval.down_token_id).await?;
        self.world.up_fee_bps = up_fee.and_then(normalize_fee_bps);
        self.world.down_fee_bps = down_fee.and_then(normalize_fee_bps);
        self.world.interval = Some(interval);

        let equity = self.exec.available_balance().await?;
        self.guard.update(Utc::now(), equity);
        self.world.halted = self.guard.halt_reason();
        if let Some(reason) = &self.world.halted {
            tracing::warn!(%reason, "Entry halt active");
        }
        telemetry::set_equity(equity.to_f64().unwrap_or(0.0));
        Ok(())
    }

    /// Settle every strategy against the interval that just finished
    async fn settle_finished_interval(&mut self) {
        let Some(finished) = self.world.interval.clone() else {
            return;
        };
        let winner = self.winner_for(&finished);
        tracing::info!(
            market = %finished.market_id,
            winner = winner.map(|w| w.to_string()).unwrap_or_else(|| "unknown".to_string()),
            "Interval resolved"
        );

        for idx in 0..self.strategies.len() {
            let decisions = self.strategies[idx].on_interval_roll(&self.world, winner);
            if !decisions.is_empty() {
                self.submit_batch(idx, decisions).await;
            }
        }
    }

    /// Refresh both books and run every strategy against the new snapshot
    pub async fn refresh_books(&mut self) -> anyhow::Result<()> {
        let Some(interval) = self.world.interval.clone() else {
            // No resolved interval yet; nothing to price against
            return Ok(());
        };

        let up_book = self.data.order_book(&interval.up_token_id).await?;
        let down_book = self.data.order_book(&interval.down_token_id).await?;
        let now = Utc::now();
        self.world.now = now;

        // Derived history feeds before the books move into the snapshot
        if let Some(mid) = up_book.mid_price() {
            self.world.history.up_mids.record(now, mid);
        }
        if let Some(mid) = down_book.mid_price() {
            self.world.history.down_mids.record(now, mid);
        }
        if let Some(ask) = up_book.best_ask() {
            self.world.history.up_candles.record(now, ask);
        }
        if let Some(ask) = down_book.best_ask() {
            self.world.history.down_candles.record(now, ask);
        }
        for print in self.data.recent_prints(&interval.up_token_id).await? {
            self.world.history.up_flow.record(print);
        }
        for print in self.data.recent_prints(&interval.down_token_id).await? {
            self.world.history.down_flow.record(print);
        }

        self.world.up_book = up_book;
        self.world.down_book = down_book;

        // Strategy evaluation runs synchronously inside this step, so every
        // strategy sees the snapshot the step just wrote
        for idx in 0..self.strategies.len() {
            match self.strategies[idx].on_tick(&self.world) {
                Ok(decisions) if !decisions.is_empty() => {
                    self.submit_batch(idx, decisions).await;
                }
                Ok(_) => {}
                Err(reason) => {
                    let name = self.strategies[idx].name();
                    telemetry::record_skip(name, reason.label());
                    tracing::debug!(strategy = name, %reason, "Tick skipped");
                }
            }
        }

        let open = self
            .strategies
            .iter()
            .filter(|s| s.has_open_position())
            .count();
        telemetry::set_open_positions(open as f64);
        Ok(())
    }

    /// Submit one strategy's decisions in order
    ///
    /// A killed or failed buy aborts the rest of the batch so a multi-leg
    /// entry can never half-submit; the strategy hears on_reject for every
    /// decision that did not fill.
    async fn submit_batch(&mut self, idx: usize, decisions: Vec<Decision>) {
        let exec = Arc::clone(&self.exec);
        let mut abort_rest = false;

        for decision in decisions {
            let name = self.strategies[idx].name();
            if abort_rest {
                self.strategies[idx].on_reject(&decision);
                continue;
            }
            telemetry::record_decision(name, decision.reason.label());

            match exec.submit_order(&decision.to_order()).await {
                Ok(Some(fill)) => {
                    let action = match fill.action {
                        OrderAction::Buy => "buy",
                        OrderAction::Sell => "sell",
                    };
                    telemetry::record_fill(name, action);
                    self.strategies[idx].on_fill(&decision, &fill);
                }
                Ok(None) => {
                    if decision.action == OrderAction::Buy {
                        abort_rest = true;
                    }
                    self.strategies[idx].on_reject(&decision);
                }
                Err(e) => {
                    tracing::warn!(
                        strategy = name,
                        decision = %decision.id,
                        error = %e,
                        "Order submission failed"
                    );
                    abort_rest = true;
                    self.strategies[idx].on_reject(&decision);
                }
            }
        }
    }

    /// One full refresh cycle, used by tests and the status command
    pub async fn step(&mut self) -> anyhow::Result<()> {
        self.refresh_world().await?;
        self.refresh_quotes().await?;
        self.refresh_books().await
    }

    /// Run the cadence loop until ctrl-c
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut world_timer = interval(Duration::from_millis(self.config.world_refresh_ms));
        let mut book_timer = interval(Duration::from_millis(self.config.book_refresh_ms));
        let mut quote_timer = interval(Duration::from_millis(self.config.quote_refresh_ms));
        // Late timers drop their backlog instead of replaying it
        world_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        book_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        quote_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            strategies = self.strategies.len(),
            world_ms = self.config.world_refresh_ms,
            book_ms = self.config.book_refresh_ms,
            quote_ms = self.config.quote_refresh_ms,
            "Orchestrator running"
        );

        loop {
            tokio::select! {
                _ = world_timer.tick() => {
                    if let Err(e) = self.refresh_world().await {
                        tracing::warn!(error = %e, "World refresh failed");
                    }
                }
                _ = quote_timer.tick() => {
                    if let Err(e) = self.refresh_quotes().await {
                        tracing::warn!(error = %e, "Quote refresh failed");
                    }
                }
                _ = book_timer.tick() => {
                    if let Err(e) = self.refresh_books().await {
                        tracing::warn!(error = %e, "Book refresh failed");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown requested");
                    break;
                }
            }
        }
        Ok(())
    }
}
