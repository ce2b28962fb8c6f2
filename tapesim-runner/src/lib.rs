//! tapesim runner — wires configuration, data, strategies and the engine
//! into complete backtest runs, and dispatches independent runs across a
//! worker pool.

pub mod pool;
pub mod runner;

pub use pool::{PoolError, TaskHandle, ThreadPool};
pub use runner::{run, run_many, RunOutcome, RunSpec, RunnerError};
