//! Ledger output records: trade-log rows and equity-curve samples.

use super::order::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the trade log: a fill plus the cash balance it left behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub price: f64,
    /// Cash after the fill was applied.
    pub cash_after: f64,
}

/// One sample of the equity curve: cash plus mark-to-market of positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub ts: DateTime<Utc>,
    pub equity: f64,
}
