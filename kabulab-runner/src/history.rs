//! Screening history — JSONL append-only persistence.
//!
//! Every run appends one JSON object per screening hit. Each line is an
//! independent record, so partial writes cost one line and the reader can
//! skip damage instead of losing the file. The accumulated history is what
//! the backtest evaluator replays: "how did the stocks we flagged as cheap
//! actually do?"

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use kabulab_core::backtest::ScreeningSnapshot;

/// One persisted screening hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    pub run_date: NaiveDate,
    /// Id of the [`RunConfig`](crate::config::RunConfig) that produced this hit.
    pub config_id: String,
    pub symbol: String,
    /// Price at screening time, in the symbol's trading currency.
    pub price: f64,
    pub score: f64,
    pub verdict: String,
}

impl ScreeningRecord {
    /// The backtest evaluator's view of this record.
    pub fn to_snapshot(&self) -> ScreeningSnapshot {
        ScreeningSnapshot {
            symbol: self.symbol.clone(),
            screened_date: self.run_date,
            screened_price: self.price,
            score: self.score,
            verdict: self.verdict.clone(),
        }
    }
}

/// JSONL history file manager.
pub struct ScreeningHistory {
    path: PathBuf,
}

impl ScreeningHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Appends records as one JSON line each. Returns how many were written.
    pub fn append(&self, records: &[ScreeningRecord]) -> io::Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        for record in records {
            let json = serde_json::to_string(record)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            writeln!(file, "{json}")?;
        }
        file.flush()?;

        Ok(records.len())
    }

    /// Reads every record. Malformed lines are skipped, not fatal.
    pub fn read_all(&self) -> io::Result<Vec<ScreeningRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path)?;
        let reader = io::BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ScreeningRecord>(&line) {
                Ok(record) => records.push(record),
                Err(_) => continue, // skip malformed lines
            }
        }

        Ok(records)
    }

    /// Reads the whole history as backtest snapshots.
    pub fn snapshots(&self) -> io::Result<Vec<ScreeningSnapshot>> {
        Ok(self
            .read_all()?
            .iter()
            .map(ScreeningRecord::to_snapshot)
            .collect())
    }

    /// Current file size in bytes (0 when the file does not exist).
    pub fn file_size_bytes(&self) -> io::Result<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
