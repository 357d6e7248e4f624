//! Rolling market history
//!
//! Spot samples, per-side one-minute candles, and taker flow over bounded
//! windows. The orchestrator is the only writer; strategies read.

mod candles;
mod flow;
mod samples;

pub use candles::{Candle, CandleTracker};
pub use flow::{FlowMetrics, FlowTracker, TakerSide, TradePrint};
pub use samples::{SpotHistory, SpotSample};

use crate::config::HistoryConfig;

/// All rolling history the engine keeps for one interval market
#[derive(Debug)]
pub struct SignalHistory {
    /// Spot price samples from the reference feed
    pub spot: SpotHistory,
    /// Mid price samples of the up token
    pub up_mids: SpotHistory,
    /// Mid price samples of the down token
    pub down_mids: SpotHistory,
    /// One-minute candles of the up token's best ask
    pub up_candles: CandleTracker,
    /// One-minute candles of the down token's best ask
    pub down_candles: CandleTracker,
    /// Taker prints on the up token
    pub up_flow: FlowTracker,
    /// Taker prints on the down token
    pub down_flow: FlowTracker,
}

impl SignalHistory {
    /// Create all trackers from configuration
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self {
            spot: SpotHistory::new(config.horizon_secs, config.dedupe_ms),
            up_mids: SpotHistory::new(config.horizon_secs, config.dedupe_ms),
            down_mids: SpotHistory::new(config.horizon_secs, config.dedupe_ms),
            up_candles: CandleTracker::new(config.candle_archive),
            down_candles: CandleTracker::new(config.candle_archive),
            up_flow: FlowTracker::new(config.flow_window_secs, config.flow_baseline_secs),
            down_flow: FlowTracker::new(config.flow_window_secs, config.flow_baseline_secs),
        }
    }
}

impl Default for SignalHistory {
    fn default() -> Self {
        Self::from_config(&HistoryConfig::default())
    }
}
