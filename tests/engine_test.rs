//! End-to-end engine tests
//!
//! Drives the orchestrator against scripted and simulated venues with the
//! real strategies and the paper execution engine.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use updown_bot::book::{FeeModel, OrderBook, PriceLevel};
use updown_bot::config::{
    ArbitrageConfig, CalibratorConfig, CertaintyConfig, EngineConfig, HistoryConfig,
    LagConfig, LinearModelConfig, RiskConfig,
};
use updown_bot::engine::{
    IntervalMarket, MarketData, Orchestrator, SimMarketData, SpotQuote,
};
use updown_bot::execution::{ExecutionEngine, PaperEngine};
use updown_bot::history::SignalHistory;
use updown_bot::risk::EquityGuard;
use updown_bot::strategy::{
    ArbitrageStrategy, CertaintyStrategy, LagStrategy, Strategy,
};

/// Venue with a fixed straddle mispricing on static books
struct StaticVenue;

#[async_trait]
impl MarketData for StaticVenue {
    async fn current_interval(&self) -> anyhow::Result<IntervalMarket> {
        let now = Utc::now();
        Ok(IntervalMarket {
            market_id: "static-1".to_string(),
            up_token_id: "static-1-up".to_string(),
            down_token_id: "static-1-down".to_string(),
            open_price: dec!(95000),
            open_time: now - Duration::minutes(5),
            close_time: now + Duration::minutes(10),
        })
    }

    async fn spot(&self) -> anyhow::Result<SpotQuote> {
        Ok(SpotQuote {
            price: dec!(95000),
            timestamp: Utc::now(),
        })
    }

    async fn order_book(&self, token_id: &str) -> anyhow::Result<OrderBook> {
        let ask = if token_id.ends_with("-up") {
            dec!(0.40)
        } else {
            dec!(0.55)
        };
        let mut book = OrderBook::new(token_id);
        book.bids = vec![PriceLevel::new(ask - dec!(0.02), dec!(1000))];
        book.asks = vec![PriceLevel::new(ask, dec!(1000))];
        Ok(book)
    }

    async fn taker_fee(&self, _token_id: &str) -> anyhow::Result<Option<Decimal>> {
        Ok(Some(dec!(0.01)))
    }
}

fn all_strategies() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(ArbitrageStrategy::new(ArbitrageConfig::default())),
        Box::new(LagStrategy::new(
            LagConfig::default(),
            FeeModel::default(),
            &CalibratorConfig::default(),
            &LinearModelConfig::default(),
        )),
        Box::new(CertaintyStrategy::new(CertaintyConfig::default())),
    ]
}

#[tokio::test]
async fn test_straddle_fills_through_paper_engine() {
    let data = Arc::new(StaticVenue);
    let exec = Arc::new(PaperEngine::new(FeeModel::default(), dec!(0.01), dec!(500)));
    let strategies: Vec<Box<dyn Strategy>> =
        vec![Box::new(ArbitrageStrategy::new(ArbitrageConfig::default()))];
    let guard = EquityGuard::new(&RiskConfig::default(), dec!(500));

    let mut orch = Orchestrator::new(
        EngineConfig::default(),
        Arc::clone(&data),
        Arc::clone(&exec),
        strategies,
        guard,
        SignalHistory::from_config(&HistoryConfig::default()),
    );

    orch.step().await.unwrap();

    // Both legs filled and cash left the account
    let cash_after_entry = exec.available_balance().await.unwrap();
    assert!(cash_after_entry < dec!(500));
    assert_eq!(exec.fills().await.len(), 2);
    assert!(orch.strategies()[0].has_open_position());

    // Unchanged inputs with an open straddle never produce a second entry
    orch.step().await.unwrap();
    assert_eq!(exec.fills().await.len(), 2);
    assert_eq!(exec.available_balance().await.unwrap(), cash_after_entry);
}

#[tokio::test]
async fn test_simulated_session_smoke() {
    let data = Arc::new(SimMarketData::new(42, dec!(95000)));
    let exec = Arc::new(PaperEngine::new(FeeModel::default(), dec!(0.01), dec!(500)));
    let guard = EquityGuard::new(&RiskConfig::default(), dec!(500));

    let mut orch = Orchestrator::new(
        EngineConfig::default(),
        data,
        exec,
        all_strategies(),
        guard,
        SignalHistory::from_config(&HistoryConfig::default()),
    );

    for _ in 0..25 {
        orch.step().await.unwrap();
    }

    let world = orch.world();
    assert!(world.interval.is_some());
    assert!(world.spot.is_some());
    assert!(world.up_fee_bps.is_some());
    // Quote cadence fed the spot history
    assert!(!world.history.spot.is_empty());
    // Book cadence fed the candle trackers
    assert!(world.history.up_candles.live().is_some());
}

#[tokio::test]
async fn test_settlement_returns_more_cash_than_committed() {
    let data = Arc::new(StaticVenue);
    let exec = Arc::new(PaperEngine::new(FeeModel::default(), dec!(0.01), dec!(500)));
    let strategies: Vec<Box<dyn Strategy>> =
        vec![Box::new(ArbitrageStrategy::new(ArbitrageConfig::default()))];
    let guard = EquityGuard::new(&RiskConfig::default(), dec!(500));

    let mut orch = Orchestrator::new(
        EngineConfig::default(),
        Arc::clone(&data),
        Arc::clone(&exec),
        strategies,
        guard,
        SignalHistory::from_config(&HistoryConfig::default()),
    );

    orch.step().await.unwrap();
    let cash_after_entry = exec.available_balance().await.unwrap();
    assert!(orch.strategies()[0].has_open_position());

    // Force the interval to roll by settling directly through the strategy
    // path: a second venue reporting a new interval id would do the same
    struct RolledVenue;

    #[async_trait]
    impl MarketData for RolledVenue {
        async fn current_interval(&self) -> anyhow::Result<IntervalMarket> {
            let now = Utc::now();
            Ok(IntervalMarket {
                market_id: "static-2".to_string(),
                up_token_id: "static-2-up".to_string(),
                down_token_id: "static-2-down".to_string(),
                open_price: dec!(95000),
                open_time: now,
                close_time: now + Duration::minutes(15),
            })
        }

        async fn spot(&self) -> anyhow::Result<SpotQuote> {
            StaticVenue.spot().await
        }

        async fn order_book(&self, token_id: &str) -> anyhow::Result<OrderBook> {
            StaticVenue.order_book(token_id).await
        }

        async fn taker_fee(&self, token_id: &str) -> anyhow::Result<Option<Decimal>> {
            StaticVenue.taker_fee(token_id).await
        }
    }

    // Rebuild the orchestrator against the rolled venue, keeping the same
    // strategies and paper account by moving them over
    let mut orch = Orchestrator::new(
        EngineConfig::default(),
        Arc::new(RolledVenue),
        Arc::clone(&exec),
        orch.into_strategies(),
        EquityGuard::new(&RiskConfig::default(), cash_after_entry),
        SignalHistory::from_config(&HistoryConfig::default()),
    );
    // Seed the old interval so the roll is detected
    orch.seed_interval(IntervalMarket {
        market_id: "static-1".to_string(),
        up_token_id: "static-1-up".to_string(),
        down_token_id: "static-1-down".to_string(),
        open_price: dec!(95000),
        open_time: Utc::now() - Duration::minutes(20),
        close_time: Utc::now() - Duration::minutes(5),
    });
    orch.seed_spot(SpotQuote {
        price: dec!(95100),
        timestamp: Utc::now(),
    });

    orch.step().await.unwrap();

    // $1 per pair came back; the straddle was bought below $1. The same
    // step may already have opened a fresh straddle on the new interval,
    // so only the ledger and the cash delta are asserted.
    let cash_after_settlement = exec.available_balance().await.unwrap();
    assert!(cash_after_settlement > cash_after_entry);
    let ledger = orch.strategies()[0].ledger();
    assert_eq!(ledger.len(), 1);
    assert_eq!(
        ledger.trades()[0].outcome,
        updown_bot::ledger::TradeOutcome::Settlement
    );
    assert!(ledger.trades()[0].roi > dec!(0));
}
