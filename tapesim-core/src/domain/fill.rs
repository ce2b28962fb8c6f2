//! Fill — one execution event against an order.

use super::ids::OrderId;
use super::order::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of an order being (fully or partially) executed.
///
/// The matcher never produces a fill for zero quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub price: f64,
    pub ts: DateTime<Utc>,
}

impl Fill {
    /// Gross cash value of the execution.
    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}
