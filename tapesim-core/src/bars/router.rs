//! Symbol-keyed dispatch of completed bars to subscribed strategies.

use crate::domain::Bar;
use crate::oms::OrderApi;
use crate::strategy::{Strategy, StrategyError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared strategy handle. The simulation loop and the router both hold
/// clones; callbacks borrow the strategy only for the duration of a call.
pub type StrategyHandle = Rc<RefCell<dyn Strategy>>;

/// Routes each completed bar to every strategy registered for its symbol,
/// in registration order. No filtering, no transformation.
#[derive(Default)]
pub struct BarRouter {
    routes: HashMap<String, Vec<StrategyHandle>>,
}

impl BarRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a strategy to a symbol. Registering the same strategy
    /// twice for one symbol is a no-op.
    pub fn register(&mut self, symbol: &str, strategy: StrategyHandle) {
        let subscribers = self.routes.entry(symbol.to_string()).or_default();
        if !subscribers.iter().any(|s| Rc::ptr_eq(s, &strategy)) {
            subscribers.push(strategy);
        }
    }

    /// Deliver `bar` to every subscriber of `bar.symbol`. Stops at the
    /// first callback error.
    pub fn route_bar(&self, bar: &Bar, orders: &mut dyn OrderApi) -> Result<(), StrategyError> {
        if let Some(subscribers) = self.routes.get(&bar.symbol) {
            for strategy in subscribers {
                strategy.borrow_mut().on_bar(bar, orders)?;
            }
        }
        Ok(())
    }

    /// Number of subscribers for a symbol.
    pub fn subscriber_count(&self, symbol: &str) -> usize {
        self.routes.get(symbol).map_or(0, Vec::len)
    }
}
