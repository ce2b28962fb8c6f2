//! Engine-assigned identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order identifier. Assigned by the order manager, strictly increasing
/// across the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ORD-{}", self.0)
    }
}

/// Monotonic [`OrderId`] generator. Ids start at 1.
#[derive(Debug, Default)]
pub struct OrderIdGen {
    last: u64,
}

impl OrderIdGen {
    pub fn next_id(&mut self) -> OrderId {
        self.last += 1;
        OrderId(self.last)
    }
}
