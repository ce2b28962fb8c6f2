//! Property tests for engine invariants.
//!
//! Verifies, over randomised inputs:
//! 1. Bars are OHLC-sane and conserve tick volume, even for scrambled feeds
//! 2. Sorted feeds emit aligned, strictly increasing bar starts
//! 3. Order accounting — filled quantity and average price match the fills
//! 4. Cash and position identities over arbitrary fill sequences
//! 5. Order ids are strictly increasing
//! 6. Liquidity consumption never exceeds what is displayed

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

use tapesim_core::bars::BarBuilder;
use tapesim_core::book::QuoteBook;
use tapesim_core::config::SimConfig;
use tapesim_core::domain::{Fill, Side, Tick};
use tapesim_core::oms::{OrderApi, OrderManager};

fn tick_with_quote(ms: i64, price: f64, volume: u64, size: u64) -> Tick {
    Tick {
        symbol: "SPY".into(),
        ts: Utc.timestamp_millis_opt(ms).unwrap(),
        price,
        volume,
        bid: price - 0.5,
        ask: price + 0.5,
        bid_size: size,
        ask_size: size,
    }
}

fn arb_tick() -> impl Strategy<Value = (i64, f64, u64)> {
    (0i64..600_000, 1.0f64..1_000.0, 1u64..10_000)
}

proptest! {
    /// Every emitted bar is OHLC-sane and every tick's volume lands in
    /// exactly one bar, scrambled feed order included.
    #[test]
    fn bars_are_sane_and_conserve_volume(ticks in prop::collection::vec(arb_tick(), 1..200)) {
        let mut builder = BarBuilder::new(Duration::seconds(60));
        let mut bars = Vec::new();
        let mut total_volume: u64 = 0;

        for (ms, price, volume) in &ticks {
            total_volume += volume;
            if let Some(bar) = builder.add_tick(&tick_with_quote(*ms, *price, *volume, 100)) {
                bars.push(bar);
            }
        }
        while let Some(bar) = builder.flush() {
            bars.push(bar);
        }

        let emitted_volume: u64 = bars.iter().map(|b| b.volume).sum();
        prop_assert_eq!(emitted_volume, total_volume);
        for bar in &bars {
            prop_assert!(bar.is_sane());
            prop_assert_eq!(bar.start.timestamp_millis() % 60_000, 0);
        }
    }

    /// A time-sorted feed emits strictly increasing bar starts, each a
    /// whole number of intervals apart.
    #[test]
    fn sorted_feed_emits_monotonic_bar_starts(mut ticks in prop::collection::vec(arb_tick(), 2..200)) {
        ticks.sort_by_key(|(ms, _, _)| *ms);

        let mut builder = BarBuilder::new(Duration::seconds(60));
        let mut bars = Vec::new();
        for (ms, price, volume) in &ticks {
            if let Some(bar) = builder.add_tick(&tick_with_quote(*ms, *price, *volume, 100)) {
                bars.push(bar);
            }
        }
        while let Some(bar) = builder.flush() {
            bars.push(bar);
        }

        for pair in bars.windows(2) {
            let delta = pair[1].start.timestamp_millis() - pair[0].start.timestamp_millis();
            prop_assert!(delta > 0);
            prop_assert_eq!(delta % 60_000, 0);
        }
    }

    /// Filled quantity equals the sum of fill quantities and the average
    /// price equals the quantity-weighted mean of fill prices.
    #[test]
    fn order_accounting_matches_fills(
        quantity in 1u64..5_000,
        sizes in prop::collection::vec(1u64..500, 1..20),
    ) {
        let mut config = SimConfig::default();
        config.backtester.initial_cash = 1e12;
        let mut oms = OrderManager::new(&config);

        let fills: Rc<RefCell<Vec<Fill>>> = Rc::default();
        let sink = Rc::clone(&fills);
        oms.set_fill_callback(Box::new(move |fill| sink.borrow_mut().push(fill.clone())));

        // A market order fills at the mid, which moves tick to tick, so the
        // weighted mean is non-trivial.
        let id = oms.submit_market("SPY", Side::Buy, quantity).unwrap();
        for (i, size) in sizes.iter().enumerate() {
            let price = 100.0 + i as f64;
            oms.process_tick(&tick_with_quote(i as i64 * 1_000, price, *size, *size));
        }

        let fills = fills.borrow();
        let order = oms.order(id).unwrap();
        let total: u64 = fills.iter().map(|f| f.quantity).sum();
        prop_assert_eq!(order.filled_quantity, total);
        prop_assert!(order.filled_quantity <= order.quantity);
        prop_assert!(fills.iter().all(|f| f.quantity > 0));

        if total > 0 {
            let weighted: f64 = fills.iter().map(|f| f.price * f.quantity as f64).sum();
            let expected = weighted / total as f64;
            prop_assert!((order.avg_fill_price - expected).abs() < 1e-9);
        }
    }

    /// Cash and position identities hold over arbitrary buy/sell fills.
    #[test]
    fn ledger_identities_hold(
        trades in prop::collection::vec((prop::bool::ANY, 1u64..200, 10.0f64..200.0), 1..30),
    ) {
        let initial_cash = 1e9;
        let mut config = SimConfig::default();
        config.backtester.initial_cash = initial_cash;
        let mut oms = OrderManager::new(&config);

        let fills: Rc<RefCell<Vec<Fill>>> = Rc::default();
        let sink = Rc::clone(&fills);
        oms.set_fill_callback(Box::new(move |fill| sink.borrow_mut().push(fill.clone())));

        for (i, (is_buy, qty, price)) in trades.iter().enumerate() {
            let side = if *is_buy { Side::Buy } else { Side::Sell };
            oms.submit_market("SPY", side, *qty);
            let mut tick = tick_with_quote(i as i64 * 1_000, *price, *qty, *qty);
            tick.bid = *price;
            tick.ask = *price;
            oms.process_tick(&tick);
        }

        let fills = fills.borrow();
        let bought: f64 = fills.iter().filter(|f| f.side == Side::Buy).map(Fill::notional).sum();
        let sold: f64 = fills.iter().filter(|f| f.side == Side::Sell).map(Fill::notional).sum();
        let net_shares: i64 = fills
            .iter()
            .map(|f| match f.side {
                Side::Buy => f.quantity as i64,
                Side::Sell => -(f.quantity as i64),
            })
            .sum();

        prop_assert!((oms.cash() - (initial_cash - bought + sold)).abs() < 1e-3);
        prop_assert_eq!(oms.position("SPY"), net_shares);
    }

    /// Ids assigned to successive submissions are strictly increasing.
    #[test]
    fn order_ids_are_strictly_increasing(count in 1usize..100) {
        let mut oms = OrderManager::new(&SimConfig::default());
        let mut last = None;
        for i in 0..count {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            let id = oms.submit_market("SPY", side, 1).unwrap();
            if let Some(prev) = last {
                prop_assert!(id > prev);
            }
            last = Some(id);
        }
    }

    /// Consumption is capped by displayed size, only touches the matching
    /// side, and never moves the quoted price.
    #[test]
    fn liquidity_consumption_is_bounded(
        bid_size in 0u64..10_000,
        ask_size in 0u64..10_000,
        want in 1u64..20_000,
        is_buy in prop::bool::ANY,
    ) {
        let mut book = QuoteBook::new();
        let mut tick = tick_with_quote(0, 100.0, 10, 0);
        tick.bid_size = bid_size;
        tick.ask_size = ask_size;
        book.on_tick(&tick);

        let side = if is_buy { Side::Buy } else { Side::Sell };
        let consumed = book.consume_liquidity("SPY", side, want);
        let tob = book.top_of_book("SPY");

        match side {
            Side::Buy => {
                prop_assert_eq!(consumed, want.min(ask_size));
                prop_assert_eq!(tob.ask_size, ask_size - consumed);
                prop_assert_eq!(tob.bid_size, bid_size);
            }
            Side::Sell => {
                prop_assert_eq!(consumed, want.min(bid_size));
                prop_assert_eq!(tob.bid_size, bid_size - consumed);
                prop_assert_eq!(tob.ask_size, ask_size);
            }
        }
        prop_assert_eq!(tob.bid, tick.bid);
        prop_assert_eq!(tob.ask, tick.ask);
    }
}
