//! Domain types: market events, orders, fills and ledger records.

pub mod bar;
pub mod fill;
pub mod ids;
pub mod order;
pub mod tick;
pub mod trade;

pub use bar::Bar;
pub use fill::Fill;
pub use ids::{OrderId, OrderIdGen};
pub use order::{Order, OrderKind, OrderStatus, Side, TimeInForce};
pub use tick::Tick;
pub use trade::{EquityPoint, TradeRecord};

/// Symbol type alias
pub type Symbol = String;

/// Sentinel symbol assigned to data rows that carry no symbol column.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";
