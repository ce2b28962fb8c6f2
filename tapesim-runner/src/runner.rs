//! Single- and multi-run orchestration.
//!
//! A [`RunSpec`] names a strategy, the tick files to replay, the YAML
//! config and the output directory; `run` wires those into an engine and
//! executes to completion, leaving `equity_curve.csv` and `trade_log.csv`
//! behind. `run_many` dispatches independent specs across the worker pool —
//! each run's state is confined to its own task, nothing is shared.

use anyhow::Context;
use serde::Serialize;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;
use tracing::{info, warn};

use tapesim_core::bars::router::StrategyHandle;
use tapesim_core::config::SimConfig;
use tapesim_core::data::{CsvSource, DataSource};
use tapesim_core::domain::UNKNOWN_SYMBOL;
use tapesim_core::engine::{Backtester, RunSummary};
use tapesim_core::oms::OrderManager;
use tapesim_core::strategy::{FillTracking, NullStrategy, SmaCrossover};

use crate::pool::ThreadPool;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("unknown strategy '{0}' (available: null, fill-tracking, sma-crossover)")]
    UnknownStrategy(String),
}

/// Everything needed to reproduce one backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSpec {
    /// Registry name of the strategy to drive.
    pub strategy: String,
    /// Optional YAML config (slippage table, initial cash).
    pub config: Option<PathBuf>,
    /// Tick CSV files; all are merged into one feed.
    pub data: Vec<PathBuf>,
    /// Primary symbol, also assigned to data rows without a symbol column.
    pub symbol: String,
    /// Directory receiving `equity_curve.csv` and `trade_log.csv`.
    pub out_dir: PathBuf,
    pub bar_interval_secs: i64,
}

impl RunSpec {
    pub fn new(strategy: impl Into<String>, data: Vec<PathBuf>, out_dir: PathBuf) -> Self {
        Self {
            strategy: strategy.into(),
            config: None,
            data,
            symbol: UNKNOWN_SYMBOL.to_string(),
            out_dir,
            bar_interval_secs: 60,
        }
    }

    /// Deterministic id of this spec, for labelling artifacts and logs.
    pub fn run_id(&self) -> String {
        let json = serde_json::to_string(self).expect("RunSpec serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

/// What a completed run left behind.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub summary: RunSummary,
    pub equity_curve: PathBuf,
    pub trade_log: PathBuf,
}

/// Instantiate a strategy from its registry name.
pub fn build_strategy(name: &str, symbol: &str) -> Result<StrategyHandle, RunnerError> {
    let strategy: StrategyHandle = match name {
        "null" | "do-nothing" => Rc::new(RefCell::new(NullStrategy::new())),
        "fill-tracking" => Rc::new(RefCell::new(FillTracking::new(100))),
        "sma-crossover" => Rc::new(RefCell::new(SmaCrossover::new(symbol, 5, 20, 100))),
        other => return Err(RunnerError::UnknownStrategy(other.to_string())),
    };
    Ok(strategy)
}

/// Execute one backtest to completion.
pub fn run(spec: &RunSpec) -> anyhow::Result<RunOutcome> {
    let config = match &spec.config {
        Some(path) => SimConfig::from_yaml_file(path)?,
        None => SimConfig::default(),
    };

    std::fs::create_dir_all(&spec.out_dir)
        .with_context(|| format!("failed to create output dir {}", spec.out_dir.display()))?;
    let equity_curve = spec.out_dir.join("equity_curve.csv");
    let trade_log = spec.out_dir.join("trade_log.csv");

    let order_manager = OrderManager::with_sinks(&config, &equity_curve, &trade_log)?;
    let strategy = build_strategy(&spec.strategy, &spec.symbol)?;

    let mut sources = Vec::with_capacity(spec.data.len());
    for path in &spec.data {
        sources.push(CsvSource::open_with_symbol(path, &spec.symbol)?);
    }
    let mut sources = sources.into_iter();
    let Some(first) = sources.next() else {
        anyhow::bail!("at least one data file is required");
    };
    let first: Box<dyn DataSource> = Box::new(first);

    let mut backtester = Backtester::new(
        spec.symbol.clone(),
        first,
        strategy,
        order_manager,
        chrono::Duration::seconds(spec.bar_interval_secs),
    );
    for source in sources {
        backtester.add_data_source(Box::new(source));
    }

    info!(run_id = %spec.run_id(), strategy = %spec.strategy, "running backtest");
    let summary = backtester.run();
    if let Some(err) = &summary.abort {
        warn!(%err, "strategy aborted the run");
    }
    backtester.order_manager_mut().flush_sinks()?;

    Ok(RunOutcome {
        run_id: spec.run_id(),
        summary,
        equity_curve,
        trade_log,
    })
}

/// Dispatch independent runs across `threads` workers. Results come back
/// in spec order.
pub fn run_many(specs: Vec<RunSpec>, threads: usize) -> Vec<anyhow::Result<RunOutcome>> {
    let mut pool = ThreadPool::new(threads);
    let mut handles = Vec::with_capacity(specs.len());
    for spec in specs {
        handles.push(pool.submit(move || run(&spec)));
    }

    let results = handles
        .into_iter()
        .map(|handle| match handle {
            Ok(handle) => match handle.join() {
                Ok(result) => result,
                Err(err) => Err(err.into()),
            },
            Err(err) => Err(err.into()),
        })
        .collect();
    pool.shutdown();
    results
}
