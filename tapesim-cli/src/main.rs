//! tapesim CLI.
//!
//! One subcommand:
//! - `run` — replay tick files through a named strategy and write the
//!   equity curve and trade log to the output directory.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tapesim_runner::RunSpec;

#[derive(Parser)]
#[command(name = "tapesim", about = "Event-driven tick-level backtester")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a backtest over one or more tick CSV files.
    Run {
        /// Strategy registry name (null, fill-tracking, sma-crossover).
        #[arg(long)]
        strategy: String,

        /// YAML config with the slippage table and initial cash.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Tick CSV file; repeat for multi-leg runs.
        #[arg(long = "data", required = true)]
        data: Vec<PathBuf>,

        /// Primary symbol; also assigned to rows without a symbol column.
        #[arg(long, default_value = "UNKNOWN")]
        symbol: String,

        /// Output directory for equity_curve.csv and trade_log.csv.
        #[arg(long, default_value = "results")]
        out: PathBuf,

        /// Bar interval in seconds.
        #[arg(long, default_value_t = 60)]
        bar_secs: i64,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run {
            strategy,
            config,
            data,
            symbol,
            out,
            bar_secs,
        } => {
            let mut spec = RunSpec::new(strategy, data, out);
            spec.config = config;
            spec.symbol = symbol;
            spec.bar_interval_secs = bar_secs;

            let outcome = tapesim_runner::run(&spec)?;
            if let Some(err) = &outcome.summary.abort {
                eprintln!("warning: strategy aborted the run: {err}");
            }
            println!("run {}", outcome.run_id);
            println!(
                "  ticks: {}  bars: {}",
                outcome.summary.ticks_processed, outcome.summary.bars_emitted
            );
            println!(
                "  final cash: {:.2}  position[{}]: {}",
                outcome.summary.final_cash, spec.symbol, outcome.summary.primary_position
            );
            println!("  equity curve: {}", outcome.equity_curve.display());
            println!("  trade log:    {}", outcome.trade_log.display());
            Ok(())
        }
    }
}
