//! Strategy interface and bundled strategies.
//!
//! A strategy is a set of three callbacks, all defaulting to no-ops. The
//! simulation loop drives them in a fixed order per tick: `on_tick` with
//! the raw event, `on_bar` when the tick completes a bar for a subscribed
//! symbol, and `on_fill` once the tick's matching pass has produced
//! executions. Strategies place orders through the [`OrderApi`] handle they
//! receive in every callback and hold only order ids, never orders.

pub mod pairs;
pub mod sma_crossover;
pub mod stats;
pub mod tracking;

pub use pairs::PairsTrading;
pub use sma_crossover::SmaCrossover;
pub use tracking::FillTracking;

use crate::domain::{Bar, Fill, Tick};
use crate::oms::OrderApi;
use thiserror::Error;

/// A fault raised by a strategy callback. The simulation loop catches it,
/// stops consuming ticks and finishes the run with a bar flush.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StrategyError(pub String);

impl StrategyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Callback surface for trading logic.
pub trait Strategy {
    /// Called for every tick in the merged feed, before bar building and
    /// matching for that tick.
    fn on_tick(&mut self, _tick: &Tick, _orders: &mut dyn OrderApi) -> Result<(), StrategyError> {
        Ok(())
    }

    /// Called for every completed bar on a symbol this strategy is
    /// subscribed to, in completion order.
    fn on_bar(&mut self, _bar: &Bar, _orders: &mut dyn OrderApi) -> Result<(), StrategyError> {
        Ok(())
    }

    /// Called once per generated fill, after the matching pass that
    /// produced it. Submissions made here join the book immediately but are
    /// only matched from the next tick on.
    fn on_fill(&mut self, _fill: &Fill, _orders: &mut dyn OrderApi) -> Result<(), StrategyError> {
        Ok(())
    }
}

/// Trades nothing; counts the events it sees. Useful for smoke tests and
/// for exercising the pipeline without trading logic.
#[derive(Debug, Default)]
pub struct NullStrategy {
    ticks_seen: usize,
    bars_seen: usize,
    fills_seen: usize,
}

impl NullStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks_seen(&self) -> usize {
        self.ticks_seen
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn fills_seen(&self) -> usize {
        self.fills_seen
    }
}

impl Strategy for NullStrategy {
    fn on_tick(&mut self, _tick: &Tick, _orders: &mut dyn OrderApi) -> Result<(), StrategyError> {
        self.ticks_seen += 1;
        Ok(())
    }

    fn on_bar(&mut self, _bar: &Bar, _orders: &mut dyn OrderApi) -> Result<(), StrategyError> {
        self.bars_seen += 1;
        Ok(())
    }

    fn on_fill(&mut self, _fill: &Fill, _orders: &mut dyn OrderApi) -> Result<(), StrategyError> {
        self.fills_seen += 1;
        Ok(())
    }
}
