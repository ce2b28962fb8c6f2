//! Order types and the order lifecycle state machine.

use super::ids::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        })
    }
}

/// What kind of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fill at the quote midpoint on the next matching pass.
    Market,
    /// Fill at the limit price when the opposite quote crosses it.
    Limit,
    /// Limit order that expires on the tick that ingests it.
    Ioc,
}

/// How long an order rests in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Rests until the end of the session (the whole backtest, here).
    Day,
    /// Immediate-or-cancel: fill on the submission tick or die.
    Ioc,
    /// Good-till-cancelled: rests indefinitely within the backtest.
    Gtc,
}

/// Order lifecycle states.
///
/// `Filled`, `Cancelled` and `Rejected` are terminal; there are no
/// transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

/// A single order owned by the order manager.
///
/// Strategies only ever hold the [`OrderId`]; the order manager owns the
/// order table and is the only mutator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub kind: OrderKind,
    pub side: Side,
    pub tif: TimeInForce,
    /// Only meaningful for `Limit` / `Ioc` orders.
    pub limit_price: Option<f64>,
    pub quantity: u64,
    pub filled_quantity: u64,
    /// Quantity-weighted mean of fill prices; 0 until the first fill.
    pub avg_fill_price: f64,
    pub status: OrderStatus,
    /// Simulated time at submission.
    pub submitted_at: DateTime<Utc>,
}

impl Order {
    pub fn remaining_quantity(&self) -> u64 {
        self.quantity - self.filled_quantity
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Pending | OrderStatus::PartiallyFilled
        )
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}
