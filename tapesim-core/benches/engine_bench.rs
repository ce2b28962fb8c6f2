//! Criterion benchmarks for the engine hot paths.
//!
//! 1. Bar building over a long tick stream
//! 2. The matching pass with a populated book
//! 3. A full simulation-loop run

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::cell::RefCell;
use std::rc::Rc;

use tapesim_core::bars::BarBuilder;
use tapesim_core::config::SimConfig;
use tapesim_core::data::VecSource;
use tapesim_core::domain::{Side, Tick, TimeInForce};
use tapesim_core::engine::Backtester;
use tapesim_core::oms::{OrderApi, OrderManager};
use tapesim_core::strategy::NullStrategy;

fn make_ticks(n: usize) -> Vec<Tick> {
    (0..n)
        .map(|i| {
            let price = 100.0 + ((i as f64) * 0.1).sin() * 5.0;
            Tick {
                symbol: "SPY".into(),
                ts: Utc.timestamp_millis_opt(i as i64 * 250).unwrap(),
                price,
                volume: 50 + (i as u64 % 100),
                bid: price - 0.05,
                ask: price + 0.05,
                bid_size: 400,
                ask_size: 400,
            }
        })
        .collect()
}

fn bench_bar_builder(c: &mut Criterion) {
    let ticks = make_ticks(10_000);
    c.bench_function("bar_builder_10k_ticks", |b| {
        b.iter(|| {
            let mut builder = BarBuilder::new(Duration::seconds(60));
            let mut bars = 0usize;
            for tick in &ticks {
                if builder.add_tick(black_box(tick)).is_some() {
                    bars += 1;
                }
            }
            while builder.flush().is_some() {
                bars += 1;
            }
            black_box(bars)
        })
    });
}

fn bench_matching(c: &mut Criterion) {
    let ticks = make_ticks(1_000);
    c.bench_function("matching_100_orders_1k_ticks", |b| {
        b.iter(|| {
            let mut config = SimConfig::default();
            config.backtester.initial_cash = 1e12;
            let mut oms = OrderManager::new(&config);
            for i in 0..100u64 {
                let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                oms.submit_limit("SPY", side, 10_000, 100.0, TimeInForce::Gtc);
            }
            for tick in &ticks {
                oms.process_tick(black_box(tick));
            }
            black_box(oms.cash())
        })
    });
}

fn bench_full_run(c: &mut Criterion) {
    c.bench_function("backtest_10k_ticks", |b| {
        b.iter(|| {
            let strategy = Rc::new(RefCell::new(NullStrategy::new()));
            let mut backtester = Backtester::new(
                "SPY",
                Box::new(VecSource::from_ticks(make_ticks(10_000))),
                strategy,
                OrderManager::new(&SimConfig::default()),
                Duration::seconds(60),
            );
            black_box(backtester.run().bars_emitted)
        })
    });
}

criterion_group!(benches, bench_bar_builder, bench_matching, bench_full_run);
criterion_main!(benches);
