//! Run command implementation

use clap::Args;
use rust_decimal_macros::dec;
use std::sync::Arc;

use crate::book::FeeModel;
use crate::config::{Config, ExecutionMode, StrategyKind};
use crate::engine::{Orchestrator, SimMarketData};
use crate::execution::PaperEngine;
use crate::history::SignalHistory;
use crate::risk::EquityGuard;
use crate::strategy::{ArbitrageStrategy, CertaintyStrategy, LagStrategy, Strategy};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stop after this many seconds; runs until ctrl-c when absent
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Seed for the simulated feed in paper mode
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        if config.execution.mode == ExecutionMode::Live {
            anyhow::bail!("live mode requires venue connectivity; this build ships paper mode only");
        }

        let fees = FeeModel::from_config(&config.fees);
        let data = Arc::new(SimMarketData::new(self.seed, dec!(95000)));
        let exec = Arc::new(PaperEngine::new(
            fees.clone(),
            config.execution.gas_per_order,
            config.execution.initial_cash,
        ));

        let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();
        for kind in &config.engine.strategies {
            match kind {
                StrategyKind::Arbitrage => {
                    strategies.push(Box::new(ArbitrageStrategy::new(config.arbitrage.clone())));
                }
                StrategyKind::Lag => {
                    strategies.push(Box::new(LagStrategy::new(
                        config.lag.clone(),
                        fees.clone(),
                        &config.calibrator,
                        &config.model,
                    )));
                }
                StrategyKind::Certainty => {
                    strategies.push(Box::new(CertaintyStrategy::new(config.certainty.clone())));
                }
            }
        }

        let guard = EquityGuard::new(&config.risk, config.execution.initial_cash);
        let orchestrator = Orchestrator::new(
            config.engine.clone(),
            data,
            exec,
            strategies,
            guard,
            SignalHistory::from_config(&config.history),
        );

        match self.duration_secs {
            Some(secs) => {
                let deadline = tokio::time::Duration::from_secs(secs);
                match tokio::time::timeout(deadline, orchestrator.run()).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::info!(secs, "Run deadline reached");
                        Ok(())
                    }
                }
            }
            None => orchestrator.run().await,
        }
    }
}
