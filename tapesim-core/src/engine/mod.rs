//! The simulation loop.

pub mod backtester;

pub use backtester::{Backtester, RunSummary};
