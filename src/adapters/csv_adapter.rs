//! CSV trade source adapter.
//!
//! Reads backtest detail exports: one CSV per batch, header row required.

use crate::domain::error::{RecordError, TradeAuditError};
use crate::domain::trade::{BatchSchema, RawTradeRow, TradeBatch, missing_required_column};
use crate::ports::trade_source_port::TradeSourcePort;
use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;

pub const DEFAULT_PATTERN: &str = "backtests_details_*.csv";

/// Every file in a results directory whose name matches a pattern.
pub struct CsvTradeSource {
    base_path: PathBuf,
    pattern: String,
}

impl CsvTradeSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            pattern: DEFAULT_PATTERN.to_string(),
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = pattern.to_string();
        self
    }

    fn matches(&self, file_name: &str) -> bool {
        match self.pattern.split_once('*') {
            Some((prefix, suffix)) => {
                file_name.len() >= prefix.len() + suffix.len()
                    && file_name.starts_with(prefix)
                    && file_name.ends_with(suffix)
            }
            None => file_name == self.pattern,
        }
    }
}

impl TradeSourcePort for CsvTradeSource {
    fn list_batches(&self) -> Result<Vec<String>, TradeAuditError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TradeAuditError::Source {
            source_name: self.base_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TradeAuditError::Source {
                source_name: self.base_path.display().to_string(),
                reason: format!("directory entry error: {}", e),
            })?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.matches(&name) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    fn load_batch(&self, name: &str) -> Result<TradeBatch, TradeAuditError> {
        let path = self.base_path.join(name);
        let file = File::open(&path).map_err(|e| TradeAuditError::Source {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        read_batch(name, file)
    }
}

/// An explicit list of CSV files.
pub struct CsvFileSource {
    files: Vec<PathBuf>,
}

impl CsvFileSource {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }
}

impl TradeSourcePort for CsvFileSource {
    fn list_batches(&self) -> Result<Vec<String>, TradeAuditError> {
        Ok(self.files.iter().map(|p| p.display().to_string()).collect())
    }

    fn load_batch(&self, name: &str) -> Result<TradeBatch, TradeAuditError> {
        let file = File::open(name).map_err(|e| TradeAuditError::Source {
            source_name: name.to_string(),
            reason: e.to_string(),
        })?;
        read_batch(name, file)
    }
}

/// Read one batch from CSV text.
///
/// A missing required column fails the whole batch. A row that cannot be
/// split into the header's columns is kept as a [`RecordError`].
pub fn read_batch<R: Read>(name: &str, reader: R) -> Result<TradeBatch, TradeAuditError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| TradeAuditError::Source {
            source_name: name.to_string(),
            reason: format!("CSV header error: {}", e),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if let Some(column) = missing_required_column(&headers) {
        return Err(TradeAuditError::MissingColumn {
            batch: name.to_string(),
            column: column.to_string(),
        });
    }
    let schema = BatchSchema::from_headers(&headers);

    let rows = rdr
        .deserialize::<RawTradeRow>()
        .map(|row| {
            row.map_err(|e| RecordError::Malformed {
                reason: e.to_string(),
            })
        })
        .collect();

    Ok(TradeBatch {
        name: name.to_string(),
        schema,
        rows,
    })
}
