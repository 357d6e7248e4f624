//! Configuration types for updown-bot

use rust_decimal::Decimal;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub calibrator: CalibratorConfig,
    #[serde(default)]
    pub model: LinearModelConfig,
    #[serde(default)]
    pub arbitrage: ArbitrageConfig,
    #[serde(default)]
    pub lag: LagConfig,
    #[serde(default)]
    pub certainty: CertaintyConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Which strategies the orchestrator drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Arbitrage,
    Lag,
    Certainty,
}

/// Orchestrator cadences
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Enabled strategies, ticked in order on each book refresh
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,

    /// Interval/fee/budget refresh cadence (milliseconds)
    #[serde(default = "default_world_refresh_ms")]
    pub world_refresh_ms: u64,

    /// Order book refresh cadence; strategy evaluation runs inside this step
    #[serde(default = "default_book_refresh_ms")]
    pub book_refresh_ms: u64,

    /// Spot quote refresh cadence (milliseconds)
    #[serde(default = "default_quote_refresh_ms")]
    pub quote_refresh_ms: u64,
}

fn default_strategies() -> Vec<StrategyKind> {
    vec![
        StrategyKind::Arbitrage,
        StrategyKind::Lag,
        StrategyKind::Certainty,
    ]
}
fn default_world_refresh_ms() -> u64 {
    1_000
}
fn default_book_refresh_ms() -> u64 {
    500
}
fn default_quote_refresh_ms() -> u64 {
    250
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            world_refresh_ms: default_world_refresh_ms(),
            book_refresh_ms: default_book_refresh_ms(),
            quote_refresh_ms: default_quote_refresh_ms(),
        }
    }
}

/// Taker fee model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeeConfig {
    /// Base taker rate, scaled by distance of the execution price from $1
    #[serde(default = "default_base_fee_rate")]
    pub base_rate: Decimal,
}

fn default_base_fee_rate() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            base_rate: default_base_fee_rate(),
        }
    }
}

/// Rolling history configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Spot sample horizon (seconds)
    #[serde(default = "default_horizon_secs")]
    pub horizon_secs: u64,

    /// Samples closer together than this are dropped (milliseconds)
    #[serde(default = "default_dedupe_ms")]
    pub dedupe_ms: i64,

    /// Finished one-minute candles kept per side
    #[serde(default = "default_candle_archive")]
    pub candle_archive: usize,

    /// Short trade-flow window (seconds)
    #[serde(default = "default_flow_window_secs")]
    pub flow_window_secs: u64,

    /// Baseline trade-flow window (seconds)
    #[serde(default = "default_flow_baseline_secs")]
    pub flow_baseline_secs: u64,
}

fn default_horizon_secs() -> u64 {
    120
}
fn default_dedupe_ms() -> i64 {
    250
}
fn default_candle_archive() -> usize {
    5
}
fn default_flow_window_secs() -> u64 {
    10
}
fn default_flow_baseline_secs() -> u64 {
    60
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            horizon_secs: default_horizon_secs(),
            dedupe_ms: default_dedupe_ms(),
            candle_archive: default_candle_archive(),
            flow_window_secs: default_flow_window_secs(),
            flow_baseline_secs: default_flow_baseline_secs(),
        }
    }
}

/// Online response-rate calibrator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CalibratorConfig {
    /// EMA weight for each new observation
    #[serde(default = "default_ema_weight")]
    pub ema_weight: Decimal,

    /// Clamp floor for an observed rate (cents per dollar of spot move)
    #[serde(default = "default_min_rate")]
    pub min_rate: Decimal,

    /// Clamp ceiling for an observed rate
    #[serde(default = "default_max_rate")]
    pub max_rate: Decimal,

    /// Observations required before the EMA is trusted
    #[serde(default = "default_min_samples")]
    pub min_samples: u32,

    /// Static rate used until calibrated
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: Decimal,
}

fn default_ema_weight() -> Decimal {
    Decimal::new(15, 2) // 0.15
}
fn default_min_rate() -> Decimal {
    Decimal::new(1, 3) // 0.001
}
fn default_max_rate() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_min_samples() -> u32 {
    8
}
fn default_fallback_rate() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            ema_weight: default_ema_weight(),
            min_rate: default_min_rate(),
            max_rate: default_max_rate(),
            min_samples: default_min_samples(),
            fallback_rate: default_fallback_rate(),
        }
    }
}

/// Online linear model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LinearModelConfig {
    /// SGD learning rate
    #[serde(default = "default_learning_rate")]
    pub learning_rate: Decimal,

    /// L2 regularization strength
    #[serde(default = "default_l2")]
    pub l2: Decimal,

    /// Per-weight magnitude clamp
    #[serde(default = "default_max_abs_weight")]
    pub max_abs_weight: Decimal,

    /// Updates required before the model joins the blend
    #[serde(default = "default_model_min_samples")]
    pub min_samples: u32,

    /// Fraction of the blended prediction taken from the model
    #[serde(default = "default_mix_fraction")]
    pub mix_fraction: Decimal,
}

fn default_learning_rate() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_l2() -> Decimal {
    Decimal::new(1, 3) // 0.001
}
fn default_max_abs_weight() -> Decimal {
    Decimal::from(10)
}
fn default_model_min_samples() -> u32 {
    20
}
fn default_mix_fraction() -> Decimal {
    Decimal::new(35, 2) // 0.35
}

impl Default for LinearModelConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            l2: default_l2(),
            max_abs_weight: default_max_abs_weight(),
            min_samples: default_model_min_samples(),
            mix_fraction: default_mix_fraction(),
        }
    }
}

/// Straddle arbitrage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArbitrageConfig {
    /// Capital allocated to the strategy
    #[serde(default = "default_arb_capital")]
    pub capital: Decimal,

    /// Minimum guaranteed profit per share pair (cents)
    #[serde(default = "default_min_profit_cents")]
    pub min_profit_cents: Decimal,

    /// Smallest straddle worth submitting (shares per leg)
    #[serde(default = "default_min_shares")]
    pub min_shares: u64,
}

fn default_arb_capital() -> Decimal {
    Decimal::from(200)
}
fn default_min_profit_cents() -> Decimal {
    Decimal::ONE
}
fn default_min_shares() -> u64 {
    1
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            capital: default_arb_capital(),
            min_profit_cents: default_min_profit_cents(),
            min_shares: default_min_shares(),
        }
    }
}

/// Stop selection mode for the lag strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopMode {
    /// Stricter of the percent stop and the dynamic stop
    #[default]
    Stricter,
    /// Percent-of-entry stop only
    Percent,
    /// Fraction-of-target stop only
    Dynamic,
}

/// Lag strategy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LagConfig {
    /// Capital allocated to the strategy
    #[serde(default = "default_lag_capital")]
    pub capital: Decimal,

    /// Fast spot delta window (seconds)
    #[serde(default = "default_fast_window_secs")]
    pub fast_window_secs: u64,

    /// Slow spot delta window (seconds)
    #[serde(default = "default_slow_window_secs")]
    pub slow_window_secs: u64,

    /// Baseline spot delta window (seconds)
    #[serde(default = "default_baseline_window_secs")]
    pub baseline_window_secs: u64,

    /// Spot move on the fast window that opens a lag window (dollars)
    #[serde(default = "default_spot_move_threshold")]
    pub spot_move_threshold: Decimal,

    /// Both outcome mids must have moved less than this for a lag (cents)
    #[serde(default = "default_max_mid_response_cents")]
    pub max_mid_response_cents: Decimal,

    /// Favored-side mid move that counts as the market responding (cents)
    #[serde(default = "default_response_threshold_cents")]
    pub response_threshold_cents: Decimal,

    /// Lag windows older than this are abandoned (seconds)
    #[serde(default = "default_window_max_age_secs")]
    pub window_max_age_secs: u64,

    /// Flat edge requirement on top of breakeven and spread (cents)
    #[serde(default = "default_min_edge_cents")]
    pub min_edge_cents: Decimal,

    /// Book imbalance below this magnitude counts as weak pressure
    #[serde(default = "default_pressure_weak_threshold")]
    pub pressure_weak_threshold: Decimal,

    /// Edge penalty for weak or opposing book pressure (cents)
    #[serde(default = "default_pressure_penalty_cents")]
    pub pressure_penalty_cents: Decimal,

    /// Edge penalty when fast and slow deltas disagree in sign (cents)
    #[serde(default = "default_sign_penalty_cents")]
    pub sign_penalty_cents: Decimal,

    /// Edge penalty for weak or opposing trade flow (cents)
    #[serde(default = "default_flow_penalty_cents")]
    pub flow_penalty_cents: Decimal,

    /// Edge bonus for strongly aligned trade flow (cents)
    #[serde(default = "default_flow_bonus_cents")]
    pub flow_bonus_cents: Decimal,

    /// Flow volume ratio above which flow counts as strong
    #[serde(default = "default_flow_strong_ratio")]
    pub flow_strong_ratio: Decimal,

    /// Flow volume ratio below which flow counts as weak
    #[serde(default = "default_flow_weak_ratio")]
    pub flow_weak_ratio: Decimal,

    /// Take-profit clamp floor (cents)
    #[serde(default = "default_min_tp_cents")]
    pub min_tp_cents: Decimal,

    /// Take-profit clamp ceiling (cents)
    #[serde(default = "default_max_tp_cents")]
    pub max_tp_cents: Decimal,

    /// Dynamic stop as a fraction of the take-profit target
    #[serde(default = "default_sl_fraction")]
    pub sl_fraction_of_tp: Decimal,

    /// Dynamic stop clamp floor (cents)
    #[serde(default = "default_min_sl_cents")]
    pub min_sl_cents: Decimal,

    /// Dynamic stop clamp ceiling (cents)
    #[serde(default = "default_max_sl_cents")]
    pub max_sl_cents: Decimal,

    /// Percent stop as a fraction of entry price
    #[serde(default = "default_percent_stop")]
    pub percent_stop: Decimal,

    /// How the effective stop is chosen
    #[serde(default)]
    pub stop_mode: StopMode,

    /// Fraction of capital risked per trade at the stop
    #[serde(default = "default_risk_budget_pct")]
    pub risk_budget_pct: Decimal,

    /// Minimum take-profit to stop-loss ratio
    #[serde(default = "default_min_risk_reward")]
    pub min_risk_reward: Decimal,

    /// Outcome tokens never trade above this price
    #[serde(default = "default_price_cap")]
    pub price_cap: Decimal,

    /// Consecutive same-side ticks required to enter
    #[serde(default = "default_confirm_ticks")]
    pub confirm_ticks: u32,

    /// Consecutive confirming ticks required to stop out
    #[serde(default = "default_sl_confirm_ticks")]
    pub sl_confirm_ticks: u32,

    /// Stop-loss is disarmed for this long after entry (seconds)
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,

    /// Minimum time between entries (seconds)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Cooldown after a stop-out (seconds)
    #[serde(default = "default_stop_cooldown_secs")]
    pub stop_cooldown_secs: u64,

    /// Spot feeds further apart than this suppress new entries (dollars)
    #[serde(default = "default_max_feed_divergence")]
    pub max_feed_divergence: Decimal,
}

fn default_lag_capital() -> Decimal {
    Decimal::from(200)
}
fn default_fast_window_secs() -> u64 {
    5
}
fn default_slow_window_secs() -> u64 {
    30
}
fn default_baseline_window_secs() -> u64 {
    120
}
fn default_spot_move_threshold() -> Decimal {
    Decimal::from(20)
}
fn default_max_mid_response_cents() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_response_threshold_cents() -> Decimal {
    Decimal::ONE
}
fn default_window_max_age_secs() -> u64 {
    20
}
fn default_min_edge_cents() -> Decimal {
    Decimal::new(6, 1) // 0.6
}
fn default_pressure_weak_threshold() -> Decimal {
    Decimal::new(1, 1) // 0.1
}
fn default_pressure_penalty_cents() -> Decimal {
    Decimal::new(4, 1) // 0.4
}
fn default_sign_penalty_cents() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_flow_penalty_cents() -> Decimal {
    Decimal::new(4, 1) // 0.4
}
fn default_flow_bonus_cents() -> Decimal {
    Decimal::new(3, 1) // 0.3
}
fn default_flow_strong_ratio() -> Decimal {
    Decimal::new(15, 1) // 1.5
}
fn default_flow_weak_ratio() -> Decimal {
    Decimal::new(8, 1) // 0.8
}
fn default_min_tp_cents() -> Decimal {
    Decimal::ONE
}
fn default_max_tp_cents() -> Decimal {
    Decimal::from(6)
}
fn default_sl_fraction() -> Decimal {
    Decimal::new(6, 1) // 0.6
}
fn default_min_sl_cents() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_max_sl_cents() -> Decimal {
    Decimal::from(4)
}
fn default_percent_stop() -> Decimal {
    Decimal::new(8, 2) // 0.08
}
fn default_risk_budget_pct() -> Decimal {
    Decimal::new(25, 2) // 0.25
}
fn default_min_risk_reward() -> Decimal {
    Decimal::new(12, 1) // 1.2
}
fn default_price_cap() -> Decimal {
    Decimal::new(99, 2) // 0.99
}
fn default_confirm_ticks() -> u32 {
    2
}
fn default_sl_confirm_ticks() -> u32 {
    2
}
fn default_grace_secs() -> u64 {
    10
}
fn default_cooldown_secs() -> u64 {
    30
}
fn default_stop_cooldown_secs() -> u64 {
    120
}
fn default_max_feed_divergence() -> Decimal {
    Decimal::from(25)
}

impl Default for LagConfig {
    fn default() -> Self {
        Self {
            capital: default_lag_capital(),
            fast_window_secs: default_fast_window_secs(),
            slow_window_secs: default_slow_window_secs(),
            baseline_window_secs: default_baseline_window_secs(),
            spot_move_threshold: default_spot_move_threshold(),
            max_mid_response_cents: default_max_mid_response_cents(),
            response_threshold_cents: default_response_threshold_cents(),
            window_max_age_secs: default_window_max_age_secs(),
            min_edge_cents: default_min_edge_cents(),
            pressure_weak_threshold: default_pressure_weak_threshold(),
            pressure_penalty_cents: default_pressure_penalty_cents(),
            sign_penalty_cents: default_sign_penalty_cents(),
            flow_penalty_cents: default_flow_penalty_cents(),
            flow_bonus_cents: default_flow_bonus_cents(),
            flow_strong_ratio: default_flow_strong_ratio(),
            flow_weak_ratio: default_flow_weak_ratio(),
            min_tp_cents: default_min_tp_cents(),
            max_tp_cents: default_max_tp_cents(),
            sl_fraction_of_tp: default_sl_fraction(),
            min_sl_cents: default_min_sl_cents(),
            max_sl_cents: default_max_sl_cents(),
            percent_stop: default_percent_stop(),
            stop_mode: StopMode::default(),
            risk_budget_pct: default_risk_budget_pct(),
            min_risk_reward: default_min_risk_reward(),
            price_cap: default_price_cap(),
            confirm_ticks: default_confirm_ticks(),
            sl_confirm_ticks: default_sl_confirm_ticks(),
            grace_secs: default_grace_secs(),
            cooldown_secs: default_cooldown_secs(),
            stop_cooldown_secs: default_stop_cooldown_secs(),
            max_feed_divergence: default_max_feed_divergence(),
        }
    }
}

/// Certainty strategy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CertaintyConfig {
    /// Capital allocated to the strategy
    #[serde(default = "default_certainty_capital")]
    pub capital: Decimal,

    /// Entries allowed only within this window before resolution (seconds)
    #[serde(default = "default_entry_window_secs")]
    pub entry_window_secs: u64,

    /// Observation time required after an interval starts (seconds)
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,

    /// Default entry band floor (price)
    #[serde(default = "default_entry_min")]
    pub entry_min: Decimal,

    /// Default entry band ceiling (price)
    #[serde(default = "default_entry_max")]
    pub entry_max: Decimal,

    /// Maximum tolerated spread (cents)
    #[serde(default = "default_max_spread_cents")]
    pub max_spread_cents: Decimal,

    /// Half-width of the re-entry band around a realized stop exit (price)
    #[serde(default = "default_reentry_buffer")]
    pub reentry_buffer: Decimal,

    /// Take-profit zone floor (price)
    #[serde(default = "default_tp_zone_min")]
    pub tp_zone_min: Decimal,

    /// Take-profit zone ceiling (price)
    #[serde(default = "default_tp_zone_max")]
    pub tp_zone_max: Decimal,

    /// Stop-loss trigger price
    #[serde(default = "default_sl_price")]
    pub sl_price: Decimal,

    /// Bid levels this far below the trigger still count as fillable (price)
    #[serde(default = "default_sl_fill_buffer")]
    pub sl_fill_buffer: Decimal,

    /// Consecutive qualifying ticks required to enter
    #[serde(default = "default_confirm_ticks")]
    pub confirm_ticks: u32,

    /// Consecutive qualifying ticks required to exit
    #[serde(default = "default_exit_confirm_ticks")]
    pub exit_confirm_ticks: u32,

    /// Minimum time between actions (seconds)
    #[serde(default = "default_certainty_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_certainty_capital() -> Decimal {
    Decimal::from(100)
}
fn default_entry_window_secs() -> u64 {
    240
}
fn default_warmup_secs() -> u64 {
    30
}
fn default_entry_min() -> Decimal {
    Decimal::new(80, 2) // 0.80
}
fn default_entry_max() -> Decimal {
    Decimal::new(82, 2) // 0.82
}
fn default_max_spread_cents() -> Decimal {
    Decimal::TWO
}
fn default_reentry_buffer() -> Decimal {
    Decimal::new(2, 2) // 0.02
}
fn default_tp_zone_min() -> Decimal {
    Decimal::new(94, 2) // 0.94
}
fn default_tp_zone_max() -> Decimal {
    Decimal::new(995, 3) // 0.995
}
fn default_sl_price() -> Decimal {
    Decimal::new(70, 2) // 0.70
}
fn default_sl_fill_buffer() -> Decimal {
    Decimal::new(3, 2) // 0.03
}
fn default_exit_confirm_ticks() -> u32 {
    2
}
fn default_certainty_cooldown_secs() -> u64 {
    15
}

impl Default for CertaintyConfig {
    fn default() -> Self {
        Self {
            capital: default_certainty_capital(),
            entry_window_secs: default_entry_window_secs(),
            warmup_secs: default_warmup_secs(),
            entry_min: default_entry_min(),
            entry_max: default_entry_max(),
            max_spread_cents: default_max_spread_cents(),
            reentry_buffer: default_reentry_buffer(),
            tp_zone_min: default_tp_zone_min(),
            tp_zone_max: default_tp_zone_max(),
            sl_price: default_sl_price(),
            sl_fill_buffer: default_sl_fill_buffer(),
            confirm_ticks: default_confirm_ticks(),
            exit_confirm_ticks: default_exit_confirm_ticks(),
            cooldown_secs: default_certainty_cooldown_secs(),
        }
    }
}

/// Execution mode: paper trading or live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Paper,
    Live,
}

/// Execution engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Flat gas charge per submitted order (dollars)
    #[serde(default = "default_gas_per_order")]
    pub gas_per_order: Decimal,

    /// Starting cash for the paper engine
    #[serde(default = "default_initial_cash")]
    pub initial_cash: Decimal,
}

fn default_gas_per_order() -> Decimal {
    Decimal::new(1, 2) // 0.01
}
fn default_initial_cash() -> Decimal {
    Decimal::from(500)
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            gas_per_order: default_gas_per_order(),
            initial_cash: default_initial_cash(),
        }
    }
}

/// Equity guard configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Daily loss fraction that halts new entries
    #[serde(default = "default_max_daily_loss_pct")]
    pub max_daily_loss_pct: Decimal,

    /// Drawdown from peak that halts new entries
    #[serde(default = "default_max_drawdown_pct")]
    pub max_drawdown_pct: Decimal,
}

fn default_max_daily_loss_pct() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_max_drawdown_pct() -> Decimal {
    Decimal::new(10, 2) // 0.10
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_daily_loss_pct: default_max_daily_loss_pct(),
            max_drawdown_pct: default_max_drawdown_pct(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_metrics_port() -> u16 {
    9090
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.fees.base_rate, dec!(0.02));
        assert_eq!(config.calibrator.min_samples, 8);
        assert_eq!(config.history.horizon_secs, 120);
        assert_eq!(config.execution.mode, ExecutionMode::Paper);
        assert_eq!(config.engine.strategies.len(), 3);
    }

    #[test]
    fn test_partial_section_override() {
        let toml = r#"
            [lag]
            spot_move_threshold = 35
            confirm_ticks = 3

            [certainty]
            entry_min = 0.78
            entry_max = 0.84

            [execution]
            mode = "live"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.lag.spot_move_threshold, dec!(35));
        assert_eq!(config.lag.confirm_ticks, 3);
        // Untouched fields keep their defaults
        assert_eq!(config.lag.cooldown_secs, 30);
        assert_eq!(config.certainty.entry_min, dec!(0.78));
        assert_eq!(config.certainty.entry_max, dec!(0.84));
        assert_eq!(config.execution.mode, ExecutionMode::Live);
    }

    #[test]
    fn test_strategy_list_deserialize() {
        let toml = r#"
            [engine]
            strategies = ["lag"]
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.engine.strategies, vec![StrategyKind::Lag]);
    }

    #[test]
    fn test_stop_mode_deserialize() {
        let toml = r#"
            [lag]
            stop_mode = "percent"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.lag.stop_mode, StopMode::Percent);
        assert_eq!(LagConfig::default().stop_mode, StopMode::Stricter);
    }

    #[test]
    fn test_certainty_band_defaults() {
        let config = CertaintyConfig::default();
        assert_eq!(config.entry_min, dec!(0.80));
        assert_eq!(config.entry_max, dec!(0.82));
        assert_eq!(config.reentry_buffer, dec!(0.02));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }
}
