//! Two-leg pairs trading on aligned bars.
//!
//! Watches two symbols, computes the hedged spread
//! `close_a - hedge_ratio * close_b` whenever both legs have a bar from the
//! same time bucket, and mean-reverts on its z-score: short the spread when
//! it is rich, long when it is cheap, flat again once it normalises.
//! Statistics are read *before* the current spread is folded in, so a bar
//! never trades against itself.

use super::stats::{RollingMean, RollingStdDev};
use super::{Strategy, StrategyError};
use crate::domain::{Bar, Side};
use crate::oms::OrderApi;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpreadPosition {
    Flat,
    /// Long leg A, short leg B.
    LongSpread,
    /// Short leg A, long leg B.
    ShortSpread,
}

pub struct PairsTrading {
    symbol_a: String,
    symbol_b: String,
    hedge_ratio: f64,
    entry_z: f64,
    exit_z: f64,
    trade_size: u64,
    spread_mean: RollingMean,
    spread_std: RollingStdDev,
    latest_bars: HashMap<String, Bar>,
    position: SpreadPosition,
}

impl PairsTrading {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol_a: impl Into<String>,
        symbol_b: impl Into<String>,
        hedge_ratio: f64,
        spread_window: usize,
        entry_z: f64,
        exit_z: f64,
        trade_size: u64,
    ) -> Self {
        Self {
            symbol_a: symbol_a.into(),
            symbol_b: symbol_b.into(),
            hedge_ratio,
            entry_z,
            exit_z,
            trade_size,
            spread_mean: RollingMean::new(spread_window),
            spread_std: RollingStdDev::new(spread_window),
            latest_bars: HashMap::new(),
            position: SpreadPosition::Flat,
        }
    }

    fn hedge_size(&self) -> u64 {
        (self.hedge_ratio * self.trade_size as f64).round() as u64
    }

    fn enter_long_spread(&mut self, orders: &mut dyn OrderApi) {
        orders.submit_market(&self.symbol_a, Side::Buy, self.trade_size);
        orders.submit_market(&self.symbol_b, Side::Sell, self.hedge_size());
        self.position = SpreadPosition::LongSpread;
    }

    fn enter_short_spread(&mut self, orders: &mut dyn OrderApi) {
        orders.submit_market(&self.symbol_a, Side::Sell, self.trade_size);
        orders.submit_market(&self.symbol_b, Side::Buy, self.hedge_size());
        self.position = SpreadPosition::ShortSpread;
    }

    fn exit(&mut self, orders: &mut dyn OrderApi) {
        match self.position {
            SpreadPosition::LongSpread => {
                orders.submit_market(&self.symbol_a, Side::Sell, self.trade_size);
                orders.submit_market(&self.symbol_b, Side::Buy, self.hedge_size());
            }
            SpreadPosition::ShortSpread => {
                orders.submit_market(&self.symbol_a, Side::Buy, self.trade_size);
                orders.submit_market(&self.symbol_b, Side::Sell, self.hedge_size());
            }
            SpreadPosition::Flat => {}
        }
        self.position = SpreadPosition::Flat;
    }
}

impl Strategy for PairsTrading {
    fn on_bar(&mut self, bar: &Bar, orders: &mut dyn OrderApi) -> Result<(), StrategyError> {
        if bar.symbol != self.symbol_a && bar.symbol != self.symbol_b {
            return Ok(());
        }
        self.latest_bars.insert(bar.symbol.clone(), bar.clone());

        let (Some(bar_a), Some(bar_b)) = (
            self.latest_bars.get(&self.symbol_a),
            self.latest_bars.get(&self.symbol_b),
        ) else {
            return Ok(());
        };
        // Both legs must come from the same time bucket.
        if bar_a.start != bar_b.start {
            return Ok(());
        }

        let spread = bar_a.close - self.hedge_ratio * bar_b.close;

        if !self.spread_mean.is_full() {
            self.spread_mean.update(spread);
            self.spread_std.update(spread);
            return Ok(());
        }

        let mean = self.spread_mean.value();
        let std_dev = self.spread_std.value();
        self.spread_mean.update(spread);
        self.spread_std.update(spread);

        if std_dev <= f64::EPSILON {
            return Ok(());
        }
        let z = (spread - mean) / std_dev;
        debug!(spread, mean, std_dev, z, "pair spread updated");

        match self.position {
            SpreadPosition::Flat => {
                if z > self.entry_z {
                    self.enter_short_spread(orders);
                } else if z < -self.entry_z {
                    self.enter_long_spread(orders);
                }
            }
            SpreadPosition::LongSpread | SpreadPosition::ShortSpread => {
                if z.abs() < self.exit_z {
                    self.exit(orders);
                }
            }
        }
        Ok(())
    }
}
