//! tapesim core — the tick-granular backtesting engine.
//!
//! This crate contains the engine proper:
//! - Domain types (ticks, bars, orders, fills, ledger records)
//! - Per-symbol top-of-book state with liquidity consumption
//! - Tick-to-bar aggregation tolerant of out-of-order feeds
//! - Symbol-keyed bar routing to subscribed strategies
//! - The order manager: matching, linear slippage, cash/position ledger,
//!   trade-log and equity-curve sinks
//! - The simulation loop that merges tick sources and drives it all
//! - A small set of bundled strategies and the `Strategy` trait they share
//!
//! Everything runs single-threaded inside one `run()` invocation; a
//! backtest is a fully encapsulated object graph with no global state, so
//! running many in parallel from separate threads is safe.

pub mod bars;
pub mod book;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod oms;
pub mod strategy;
