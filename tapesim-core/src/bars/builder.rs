//! Tick-to-bar aggregation for a single symbol.
//!
//! Ticks may arrive out of order. Every incoming tick is staged in a buffer
//! that is stably sorted by timestamp and drained oldest-first, so mild
//! reordering inside the buffer window is absorbed without damage. A tick
//! older than the in-progress bucket closes that bar and restarts on the
//! late tick's bucket; the earlier window's OHLC becomes approximate, but
//! every tick still lands in exactly one emitted bar.

use crate::domain::{Bar, Tick};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Builds time-aligned OHLCV bars from a tick stream. One instance per
/// symbol; mixing symbols in one builder corrupts OHLC.
#[derive(Debug)]
pub struct BarBuilder {
    interval_ms: i64,
    buffer: Vec<Tick>,
    current: Option<Bar>,
    current_start_ms: i64,
    ready: VecDeque<Bar>,
}

impl BarBuilder {
    /// `interval` must be a positive duration.
    pub fn new(interval: Duration) -> Self {
        let interval_ms = interval.num_milliseconds();
        assert!(interval_ms > 0, "bar interval must be positive");
        Self {
            interval_ms,
            buffer: Vec::new(),
            current: None,
            current_start_ms: 0,
            ready: VecDeque::new(),
        }
    }

    /// Feed one tick. If one or more bars have completed, returns the
    /// oldest; the rest stay queued for subsequent calls.
    pub fn add_tick(&mut self, tick: &Tick) -> Option<Bar> {
        self.buffer.push(tick.clone());
        self.buffer.sort_by_key(|t| t.ts);
        self.drain_buffer();
        self.ready.pop_front()
    }

    /// Emit whatever remains, one bar per call: queued completed bars
    /// first, then the in-progress bar. Call repeatedly until `None`.
    pub fn flush(&mut self) -> Option<Bar> {
        self.drain_buffer();
        if let Some(bar) = self.ready.pop_front() {
            return Some(bar);
        }
        self.current.take()
    }

    fn drain_buffer(&mut self) {
        for tick in std::mem::take(&mut self.buffer) {
            let ts_ms = tick.ts.timestamp_millis();
            if self.current.is_none() {
                self.start_bar(&tick);
            } else if ts_ms >= self.current_start_ms + self.interval_ms {
                // Tick belongs to a later bucket: emit and realign.
                self.close_current();
                self.start_bar(&tick);
            } else if ts_ms < self.current_start_ms {
                // Late tick predating the current bucket: close the
                // in-progress bar and restart on the late bucket.
                self.close_current();
                self.start_bar(&tick);
            } else if let Some(bar) = self.current.as_mut() {
                bar.high = bar.high.max(tick.price);
                bar.low = bar.low.min(tick.price);
                bar.close = tick.price;
                bar.volume += tick.volume;
            }
        }
    }

    fn close_current(&mut self) {
        if let Some(done) = self.current.take() {
            self.ready.push_back(done);
        }
    }

    /// Align down to the nearest interval boundary and open a new bar.
    fn start_bar(&mut self, tick: &Tick) {
        let ts_ms = tick.ts.timestamp_millis();
        let start_ms = ts_ms.div_euclid(self.interval_ms) * self.interval_ms;
        self.current_start_ms = start_ms;
        self.current = Some(Bar {
            symbol: tick.symbol.clone(),
            start: aligned_start(tick.ts, ts_ms - start_ms),
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: tick.volume,
        });
    }
}

fn aligned_start(ts: DateTime<Utc>, offset_ms: i64) -> DateTime<Utc> {
    ts - Duration::milliseconds(offset_ms)
}
