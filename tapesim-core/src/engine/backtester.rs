//! The simulation loop: merges tick sources into one time-ordered feed and
//! drives the whole pipeline tick by tick.
//!
//! Per tick, in order: register the symbol with the bar router on first
//! sight, deliver the tick to the strategy, feed the symbol's bar builder
//! (routing any completed bar), let the order manager ingest the tick and
//! re-attempt fills, then replay generated fills to the strategy. After the
//! last tick every builder is flushed to exhaustion. Given identical
//! inputs, a run produces identical trade logs, equity curves and order
//! histories — nothing here reads the wall clock.

use crate::bars::router::StrategyHandle;
use crate::bars::{BarBuilder, BarRouter};
use crate::data::DataSource;
use crate::domain::{Fill, Tick};
use crate::oms::OrderApi;
use crate::strategy::StrategyError;
use chrono::Duration;
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use tracing::{info, warn};

/// End-of-run report: the final ledger queries plus what the loop saw.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub ticks_processed: usize,
    pub bars_emitted: usize,
    pub final_cash: f64,
    /// Final position in the primary symbol.
    pub primary_position: i64,
    /// Set when a strategy error stopped tick processing early.
    pub abort: Option<StrategyError>,
}

/// One backtest: a primary symbol, one or more tick sources, a strategy
/// and an order manager. Generic over the order manager so tests can
/// substitute a mock.
pub struct Backtester<M: OrderApi> {
    symbol: String,
    sources: Vec<Box<dyn DataSource>>,
    strategy: StrategyHandle,
    orders: M,
    router: BarRouter,
    builders: HashMap<String, BarBuilder>,
    /// Symbols in first-seen order; fixes the flush order.
    symbol_order: Vec<String>,
    registered: HashSet<String>,
    bar_interval: Duration,
    /// Last trade price per symbol, for mark-to-market.
    last_prices: BTreeMap<String, f64>,
    /// Fills queued by the order manager's callback, replayed to the
    /// strategy once the tick's matching pass is over.
    pending_fills: Rc<RefCell<VecDeque<Fill>>>,
}

impl<M: OrderApi> Backtester<M> {
    pub fn new(
        symbol: impl Into<String>,
        source: Box<dyn DataSource>,
        strategy: StrategyHandle,
        mut order_manager: M,
        bar_interval: Duration,
    ) -> Self {
        let pending_fills: Rc<RefCell<VecDeque<Fill>>> = Rc::default();
        let queue = Rc::clone(&pending_fills);
        order_manager.set_fill_callback(Box::new(move |fill| {
            queue.borrow_mut().push_back(fill.clone());
        }));

        Self {
            symbol: symbol.into(),
            sources: vec![source],
            strategy,
            orders: order_manager,
            router: BarRouter::new(),
            builders: HashMap::new(),
            symbol_order: Vec::new(),
            registered: HashSet::new(),
            bar_interval,
            last_prices: BTreeMap::new(),
            pending_fills,
        }
    }

    /// Attach another tick source, e.g. the second leg of a pair.
    pub fn add_data_source(&mut self, source: Box<dyn DataSource>) {
        self.sources.push(source);
    }

    pub fn order_manager(&self) -> &M {
        &self.orders
    }

    pub fn order_manager_mut(&mut self) -> &mut M {
        &mut self.orders
    }

    /// Run the backtest to completion of its input.
    pub fn run(&mut self) -> RunSummary {
        let mut feed: Vec<Tick> = Vec::new();
        for source in &self.sources {
            feed.extend_from_slice(source.ticks());
        }
        // Stable: ticks with equal timestamps keep source order.
        feed.sort_by_key(|t| t.ts);

        info!(symbol = %self.symbol, ticks = feed.len(), "starting backtest");

        let mut abort: Option<StrategyError> = None;
        let mut ticks_processed = 0;
        let mut bars_emitted = 0;

        for tick in &feed {
            ticks_processed += 1;

            if self.registered.insert(tick.symbol.clone()) {
                self.router.register(&tick.symbol, Rc::clone(&self.strategy));
            }

            let tick_result = self.strategy.borrow_mut().on_tick(tick, &mut self.orders);
            if let Err(err) = tick_result {
                warn!(%err, "strategy error, stopping tick processing");
                // The failing tick still reaches its bar builder so the
                // final flush stays meaningful.
                if let Some(bar) = self.builder_for(&tick.symbol).add_tick(tick) {
                    bars_emitted += 1;
                    if let Err(route_err) = self.router.route_bar(&bar, &mut self.orders) {
                        warn!(%route_err, "strategy error while aborting (ignored)");
                    }
                }
                abort = Some(err);
                break;
            }

            let completed = self.builder_for(&tick.symbol).add_tick(tick);
            if let Some(bar) = &completed {
                bars_emitted += 1;
                if let Err(err) = self.router.route_bar(bar, &mut self.orders) {
                    warn!(%err, "strategy error, stopping tick processing");
                    abort = Some(err);
                    break;
                }
            }

            self.last_prices.insert(tick.symbol.clone(), tick.price);
            self.orders.process_tick(tick);
            self.orders.attempt_fills();

            if let Err(err) = self.deliver_fills() {
                warn!(%err, "strategy error in fill callback, stopping tick processing");
                abort = Some(err);
                break;
            }

            if completed.is_some() {
                self.orders.record_equity(tick.ts, &self.last_prices);
            }
        }

        // Flush remaining bars, in first-seen symbol order. Strategy errors
        // here are logged but cannot stop the flush.
        for symbol in self.symbol_order.clone() {
            let Some(builder) = self.builders.get_mut(&symbol) else {
                continue;
            };
            while let Some(bar) = builder.flush() {
                bars_emitted += 1;
                if let Err(err) = self.router.route_bar(&bar, &mut self.orders) {
                    warn!(%err, "strategy error during flush (ignored)");
                }
            }
        }

        if let Some(last) = feed.last() {
            self.orders.record_equity(last.ts, &self.last_prices);
        }

        let summary = RunSummary {
            ticks_processed,
            bars_emitted,
            final_cash: self.orders.cash(),
            primary_position: self.orders.position(&self.symbol),
            abort,
        };
        info!(
            cash = summary.final_cash,
            position = summary.primary_position,
            bars = summary.bars_emitted,
            "backtest finished"
        );
        summary
    }

    fn builder_for(&mut self, symbol: &str) -> &mut BarBuilder {
        match self.builders.entry(symbol.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.symbol_order.push(symbol.to_string());
                entry.insert(BarBuilder::new(self.bar_interval))
            }
        }
    }

    fn deliver_fills(&mut self) -> Result<(), StrategyError> {
        loop {
            let next = self.pending_fills.borrow_mut().pop_front();
            let Some(fill) = next else {
                return Ok(());
            };
            self.strategy.borrow_mut().on_fill(&fill, &mut self.orders)?;
        }
    }
}
