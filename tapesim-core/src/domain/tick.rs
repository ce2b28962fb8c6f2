//! Tick — a single market event with trade and quote fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One market event: last trade price/volume plus a top-of-book snapshot.
///
/// Timestamps are millisecond precision. A well-formed tick has
/// `bid <= ask`; sizes are unsigned so they cannot go negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    /// Last trade price.
    pub price: f64,
    /// Last trade volume.
    pub volume: u64,
    pub bid: f64,
    pub ask: f64,
    pub bid_size: u64,
    pub ask_size: u64,
}

impl Tick {
    /// Midpoint of the quoted spread.
    pub fn mid_price(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// Quote sanity: bid must not cross above ask.
    pub fn is_well_formed(&self) -> bool {
        self.bid <= self.ask
    }
}
