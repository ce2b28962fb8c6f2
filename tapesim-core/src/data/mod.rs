//! Data sources: the supplier contract and concrete readers.

pub mod csv;

pub use csv::CsvSource;

use crate::domain::{Bar, Tick};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to open data file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        source: ::csv::Error,
    },

    #[error("{path} has no header row")]
    MissingHeader { path: PathBuf },
}

/// Supplier of ordered tick/bar sequences. Data is loaded eagerly at
/// construction (where errors surface); these accessors cannot fail.
/// Ticks from one source should be non-decreasing in timestamp — the
/// simulation loop re-sorts across sources anyway.
pub trait DataSource {
    fn ticks(&self) -> &[Tick];

    /// May be empty when the source only supplies ticks.
    fn bars(&self) -> &[Bar];
}

/// In-memory source, for tests and embedding.
#[derive(Debug, Default)]
pub struct VecSource {
    ticks: Vec<Tick>,
    bars: Vec<Bar>,
}

impl VecSource {
    pub fn new(ticks: Vec<Tick>, bars: Vec<Bar>) -> Self {
        Self { ticks, bars }
    }

    pub fn from_ticks(ticks: Vec<Tick>) -> Self {
        Self {
            ticks,
            bars: Vec::new(),
        }
    }
}

impl DataSource for VecSource {
    fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    fn bars(&self) -> &[Bar] {
        &self.bars
    }
}
