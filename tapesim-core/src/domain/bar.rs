//! Bar — a fixed-interval OHLCV aggregate of ticks for one symbol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar. `start` is aligned to the bar grid: the builder floors the
/// first constituent tick's timestamp to a whole number of intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    /// Start of the bar's time window.
    pub start: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Sum of constituent tick volumes.
    pub volume: u64,
}

impl Bar {
    /// OHLC sanity: low bounds open/close from below, high from above.
    pub fn is_sane(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.high
    }
}
