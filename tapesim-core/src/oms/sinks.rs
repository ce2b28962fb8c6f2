//! CSV output sinks for the trade log and equity curve.
//!
//! Both files are opened (and their headers written) when the order manager
//! is constructed and receive one row per event thereafter. Row writes that
//! fail are logged and skipped so a full disk cannot corrupt the ledger
//! state mid-run; creation and the final flush are hard errors.

use crate::domain::{EquityPoint, TradeRecord};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to create output file {path}: {source}")]
    Create {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to flush output file: {0}")]
    Flush(#[from] io::Error),
}

/// The trade-log and equity-curve writers owned by an order manager.
pub struct OutputSinks {
    equity: BufWriter<File>,
    trades: BufWriter<File>,
}

impl OutputSinks {
    pub fn create(equity_path: &Path, trades_path: &Path) -> Result<Self, SinkError> {
        let mut equity = BufWriter::new(open(equity_path)?);
        let mut trades = BufWriter::new(open(trades_path)?);
        writeln!(equity, "timestamp,equity").map_err(SinkError::Flush)?;
        writeln!(trades, "timestamp,symbol,type,quantity,price,cash").map_err(SinkError::Flush)?;
        Ok(Self { equity, trades })
    }

    pub fn log_trade(&mut self, record: &TradeRecord) {
        if let Err(e) = writeln!(
            self.trades,
            "{},{},{},{},{:.4},{:.4}",
            record.ts.timestamp_millis(),
            record.symbol,
            record.side,
            record.quantity,
            record.price,
            record.cash_after
        ) {
            error!("trade log write failed: {e}");
        }
    }

    pub fn record_equity(&mut self, point: &EquityPoint) {
        if let Err(e) = writeln!(
            self.equity,
            "{},{:.4}",
            point.ts.timestamp_millis(),
            point.equity
        ) {
            error!("equity curve write failed: {e}");
        }
    }

    pub fn flush(&mut self) -> Result<(), SinkError> {
        self.equity.flush()?;
        self.trades.flush()?;
        Ok(())
    }
}

impl Drop for OutputSinks {
    fn drop(&mut self) {
        let _ = self.equity.flush();
        let _ = self.trades.flush();
    }
}

fn open(path: &Path) -> Result<File, SinkError> {
    File::create(path).map_err(|source| SinkError::Create {
        path: path.to_path_buf(),
        source,
    })
}
