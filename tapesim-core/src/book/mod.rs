//! Simulated top-of-book state, one snapshot per symbol.
//!
//! This is not a depth ladder. It models the fiction that the most recent
//! tick's quote is the resting liquidity available to the strategy up to
//! that instant: every tick overwrites the snapshot, and fills consume
//! displayed size without moving the quoted price.

use crate::domain::{Side, Tick};
use std::collections::HashMap;

/// Best bid/ask and their displayed sizes for one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TopOfBook {
    pub bid: f64,
    pub bid_size: u64,
    pub ask: f64,
    pub ask_size: u64,
}

impl TopOfBook {
    pub fn has_bid(&self) -> bool {
        self.bid_size > 0
    }

    pub fn has_ask(&self) -> bool {
        self.ask_size > 0
    }

    pub fn mid_price(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

/// Per-symbol quote board. Symbols appear on first sight.
#[derive(Debug, Default)]
pub struct QuoteBook {
    books: HashMap<String, TopOfBook>,
}

impl QuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the snapshot for the tick's symbol with its quote fields.
    pub fn on_tick(&mut self, tick: &Tick) {
        let tob = self.books.entry(tick.symbol.clone()).or_default();
        tob.bid = tick.bid;
        tob.bid_size = tick.bid_size;
        tob.ask = tick.ask;
        tob.ask_size = tick.ask_size;
    }

    /// Current snapshot; zero-initialised for an unseen symbol.
    pub fn top_of_book(&self, symbol: &str) -> TopOfBook {
        self.books.get(symbol).copied().unwrap_or_default()
    }

    /// Consume displayed size on the side a fill executes against: buys eat
    /// ask size, sells eat bid size. Returns the amount actually consumed;
    /// sizes never go below zero and the quoted price is untouched.
    pub fn consume_liquidity(&mut self, symbol: &str, side: Side, quantity: u64) -> u64 {
        let Some(tob) = self.books.get_mut(symbol) else {
            return 0;
        };
        match side {
            Side::Buy => {
                let consumed = quantity.min(tob.ask_size);
                tob.ask_size -= consumed;
                consumed
            }
            Side::Sell => {
                let consumed = quantity.min(tob.bid_size);
                tob.bid_size -= consumed;
                consumed
            }
        }
    }
}
