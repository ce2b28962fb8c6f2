//! Fill-tracking strategy: instrumentation for the fill-callback path.
//!
//! Submits a single market buy on the first tick it sees and records every
//! fill delivered back to it. Tests use it to verify the strategy → order
//! manager → book → fill pipeline end to end.

use super::{Strategy, StrategyError};
use crate::domain::{Fill, OrderId, Side, Tick};
use crate::oms::OrderApi;

#[derive(Debug, Default)]
pub struct FillTracking {
    quantity: u64,
    submitted: Option<OrderId>,
    fills: Vec<Fill>,
}

impl FillTracking {
    pub fn new(quantity: u64) -> Self {
        Self {
            quantity,
            submitted: None,
            fills: Vec::new(),
        }
    }

    /// The id of the order this strategy submitted, once it has.
    pub fn order_id(&self) -> Option<OrderId> {
        self.submitted
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }
}

impl Strategy for FillTracking {
    fn on_tick(&mut self, tick: &Tick, orders: &mut dyn OrderApi) -> Result<(), StrategyError> {
        if self.submitted.is_none() {
            self.submitted = orders.submit_market(&tick.symbol, Side::Buy, self.quantity);
        }
        Ok(())
    }

    fn on_fill(&mut self, fill: &Fill, _orders: &mut dyn OrderApi) -> Result<(), StrategyError> {
        self.fills.push(fill.clone());
        Ok(())
    }
}
