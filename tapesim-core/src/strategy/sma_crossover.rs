//! Moving-average crossover strategy.
//!
//! Bar-driven: ticks are ignored, every completed bar on the configured
//! symbol updates a short and a long rolling mean of closes. A golden cross
//! (short crossing above long) buys, a death cross sells.

use super::stats::RollingMean;
use super::{Strategy, StrategyError};
use crate::domain::{Bar, Side};
use crate::oms::OrderApi;
use tracing::debug;

pub struct SmaCrossover {
    symbol: String,
    trade_size: u64,
    short_ma: RollingMean,
    long_ma: RollingMean,
}

impl SmaCrossover {
    pub fn new(symbol: impl Into<String>, short_window: usize, long_window: usize, trade_size: u64) -> Self {
        assert!(
            short_window < long_window,
            "short window must be shorter than long window"
        );
        Self {
            symbol: symbol.into(),
            trade_size,
            short_ma: RollingMean::new(short_window),
            long_ma: RollingMean::new(long_window),
        }
    }
}

impl Strategy for SmaCrossover {
    fn on_bar(&mut self, bar: &Bar, orders: &mut dyn OrderApi) -> Result<(), StrategyError> {
        if bar.symbol != self.symbol {
            return Ok(());
        }

        let prev_short = self.short_ma.value();
        let prev_long = self.long_ma.value();
        let was_ready = self.long_ma.is_full();

        self.short_ma.update(bar.close);
        self.long_ma.update(bar.close);

        if !was_ready || !self.long_ma.is_full() {
            return Ok(());
        }

        let short = self.short_ma.value();
        let long = self.long_ma.value();

        if prev_short < prev_long && short > long {
            debug!(symbol = %self.symbol, close = bar.close, "golden cross, buying");
            orders.submit_market(&self.symbol, Side::Buy, self.trade_size);
        } else if prev_short > prev_long && short < long {
            debug!(symbol = %self.symbol, close = bar.close, "death cross, selling");
            orders.submit_market(&self.symbol, Side::Sell, self.trade_size);
        }
        Ok(())
    }
}
