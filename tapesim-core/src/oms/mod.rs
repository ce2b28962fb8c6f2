//! Order management: the matcher, its price-impact model and output sinks.

pub mod manager;
pub mod sinks;
pub mod slippage;

pub use manager::{FillCallback, OrderApi, OrderManager};
pub use sinks::{OutputSinks, SinkError};
pub use slippage::SlippageTable;
