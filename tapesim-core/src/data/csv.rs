//! CSV data reader.
//!
//! One reader handles both layouts, sniffed from the header row: a header
//! containing `open` (any case) means bar data, anything else means ticks.
//!
//! Tick rows come in two shapes:
//! - full (8 columns): `timestamp_ms,symbol,price,volume,bid,ask,bid_size,ask_size`
//! - legacy (3 columns): `timestamp_ms,price,volume` — the symbol falls back
//!   to the override or the sentinel, and the quote is synthesised as
//!   bid=ask=price with sizes equal to the trade volume.
//!
//! Bar rows are `timestamp_s,open,high,low,close,volume`; the symbol comes
//! from the override (callers typically derive it from the file name) or
//! the sentinel. Rows that fail to parse are skipped with a warning; ticks
//! are sorted by timestamp after loading.

use super::{DataError, DataSource};
use crate::domain::{Bar, Tick, UNKNOWN_SYMBOL};
use chrono::DateTime;
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::warn;

pub struct CsvSource {
    ticks: Vec<Tick>,
    bars: Vec<Bar>,
}

impl CsvSource {
    /// Read a tick or bar CSV. Rows without a symbol column get the
    /// `UNKNOWN` sentinel.
    pub fn open(path: &Path) -> Result<Self, DataError> {
        Self::load(path, None)
    }

    /// Read a tick or bar CSV, assigning `symbol` to rows that carry no
    /// symbol column (bar rows and legacy tick rows).
    pub fn open_with_symbol(path: &Path, symbol: &str) -> Result<Self, DataError> {
        Self::load(path, Some(symbol))
    }

    fn load(path: &Path, symbol_override: Option<&str>) -> Result<Self, DataError> {
        let file = File::open(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => record.map_err(|source| DataError::Csv {
                path: path.to_path_buf(),
                source,
            })?,
            None => {
                return Err(DataError::MissingHeader {
                    path: path.to_path_buf(),
                })
            }
        };
        let is_bar_data = header
            .iter()
            .any(|field| field.to_ascii_lowercase().contains("open"));

        let fallback_symbol = symbol_override.unwrap_or(UNKNOWN_SYMBOL);
        let mut ticks = Vec::new();
        let mut bars = Vec::new();

        for (row, record) in records.enumerate() {
            let record = record.map_err(|source| DataError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let line = row + 2; // 1-based, after the header
            let parsed = if is_bar_data {
                parse_bar(&record, fallback_symbol).map(|bar| bars.push(bar))
            } else {
                parse_tick(&record, fallback_symbol).map(|tick| ticks.push(tick))
            };
            if parsed.is_none() {
                warn!(path = %path.display(), line, "skipping malformed row");
            }
        }

        ticks.sort_by_key(|t| t.ts);
        Ok(Self { ticks, bars })
    }
}

impl DataSource for CsvSource {
    fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    fn bars(&self) -> &[Bar] {
        &self.bars
    }
}

fn parse_tick(record: &csv::StringRecord, fallback_symbol: &str) -> Option<Tick> {
    if record.len() >= 8 {
        Some(Tick {
            ts: DateTime::from_timestamp_millis(field(record, 0)?.parse().ok()?)?,
            symbol: field(record, 1)?.to_string(),
            price: field(record, 2)?.parse().ok()?,
            volume: field(record, 3)?.parse().ok()?,
            bid: field(record, 4)?.parse().ok()?,
            ask: field(record, 5)?.parse().ok()?,
            bid_size: field(record, 6)?.parse().ok()?,
            ask_size: field(record, 7)?.parse().ok()?,
        })
    } else if record.len() >= 3 {
        let price: f64 = field(record, 1)?.parse().ok()?;
        let volume: u64 = field(record, 2)?.parse().ok()?;
        Some(Tick {
            ts: DateTime::from_timestamp_millis(field(record, 0)?.parse().ok()?)?,
            symbol: fallback_symbol.to_string(),
            price,
            volume,
            bid: price,
            ask: price,
            bid_size: volume,
            ask_size: volume,
        })
    } else {
        None
    }
}

fn parse_bar(record: &csv::StringRecord, fallback_symbol: &str) -> Option<Bar> {
    if record.len() < 6 {
        return None;
    }
    Some(Bar {
        symbol: fallback_symbol.to_string(),
        start: DateTime::from_timestamp(field(record, 0)?.parse().ok()?, 0)?,
        open: field(record, 1)?.parse().ok()?,
        high: field(record, 2)?.parse().ok()?,
        low: field(record, 3)?.parse().ok()?,
        close: field(record, 4)?.parse().ok()?,
        volume: field(record, 5)?.parse().ok()?,
    })
}

fn field<'r>(record: &'r csv::StringRecord, index: usize) -> Option<&'r str> {
    record.get(index).map(str::trim)
}
