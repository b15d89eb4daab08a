//! Fixture loading: positions, universe fundamentals, quotes, FX, price history.
//!
//! Two strictness levels, matching what each file represents:
//! - Position ledgers are authoritative — a malformed row is a hard error
//!   with its line number, never a silent skip.
//! - Price history arrives from providers and degrades constantly — bad
//!   rows are warned about and dropped, the rest of the series survives.
//!
//! Directory loading isolates per-symbol failures: one broken file costs
//! one symbol, not the batch.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use kabulab_core::domain::{DailyBar, FxRates, Position, PriceHistory, Quote, StockMetrics};

/// Errors from the fixture loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("positions row {line} in {path}: {source}")]
    PositionRow {
        path: String,
        line: usize,
        source: csv::Error,
    },

    #[error("failed to open CSV {path}: {source}")]
    Csv {
        path: String,
        source: csv::Error,
    },

    #[error("failed to parse JSON {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Loads a position ledger from CSV.
///
/// Expected header: `symbol,shares,cost_price,cost_currency,purchase_date,memo`
/// with dates in `YYYY-MM-DD`. Strict: the first malformed row fails the load.
pub fn load_positions(path: &Path) -> Result<Vec<Position>, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| LoadError::Csv {
        path: path.display().to_string(),
        source,
    })?;

    let mut positions = Vec::new();
    for (i, row) in reader.deserialize::<Position>().enumerate() {
        // Header is line 1.
        let position = row.map_err(|source| LoadError::PositionRow {
            path: path.display().to_string(),
            line: i + 2,
            source,
        })?;
        positions.push(position);
    }
    Ok(positions)
}

#[derive(Debug, Deserialize)]
struct BarRow {
    date: String,
    close: f64,
    #[serde(default)]
    volume: u64,
}

/// Loads one symbol's daily history from CSV (`date,close,volume`).
///
/// Tolerant: rows that fail to parse, carry an unparseable date, or have a
/// non-positive close are warned about and dropped. Bars come back sorted
/// oldest-first regardless of file order.
pub fn load_price_history(path: &Path, symbol: &str) -> Result<PriceHistory, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| LoadError::Csv {
        path: path.display().to_string(),
        source,
    })?;

    let mut bars = Vec::new();
    for (i, row) in reader.deserialize::<BarRow>().enumerate() {
        let line = i + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                eprintln!("WARNING: {}: dropping row {line}: {e}", path.display());
                continue;
            }
        };
        let Ok(date) = row.date.parse::<chrono::NaiveDate>() else {
            eprintln!(
                "WARNING: {}: dropping row {line}: bad date '{}'",
                path.display(),
                row.date
            );
            continue;
        };
        if !(row.close.is_finite() && row.close > 0.0) {
            eprintln!(
                "WARNING: {}: dropping row {line}: non-positive close {}",
                path.display(),
                row.close
            );
            continue;
        }
        bars.push(DailyBar {
            date,
            close: row.close,
            volume: row.volume,
        });
    }
    bars.sort_by_key(|b| b.date);
    Ok(PriceHistory::new(symbol, bars))
}

/// Histories loaded from a directory, with the files that failed.
#[derive(Debug)]
pub struct LoadedHistories {
    /// Sorted by symbol.
    pub histories: Vec<PriceHistory>,
    /// File stems that could not be loaded at all.
    pub skipped: Vec<String>,
}

impl LoadedHistories {
    pub fn get(&self, symbol: &str) -> Option<&PriceHistory> {
        self.histories.iter().find(|h| h.symbol == symbol)
    }
}

/// Loads every `*.csv` in a directory as one symbol's history (symbol =
/// file stem). A file that cannot be opened is reported and skipped; the
/// batch continues.
pub fn load_history_dir(dir: &Path) -> Result<LoadedHistories, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut histories = Vec::new();
    let mut skipped = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("csv") {
            continue;
        }
        let Some(symbol) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        match load_price_history(&path, &symbol) {
            Ok(history) => histories.push(history),
            Err(e) => {
                eprintln!("WARNING: skipping {symbol}: {e}");
                skipped.push(symbol);
            }
        }
    }
    histories.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    skipped.sort();
    Ok(LoadedHistories { histories, skipped })
}

/// Loads a fundamentals universe from a JSON array of records.
///
/// Every record is normalized on the way in, so percent-style yields from
/// mixed providers reach the scorers as fractions.
pub fn load_universe(path: &Path) -> Result<Vec<StockMetrics>, LoadError> {
    let text = read_file(path)?;
    let universe: Vec<StockMetrics> =
        serde_json::from_str(&text).map_err(|source| LoadError::Json {
            path: path.display().to_string(),
            source,
        })?;
    Ok(universe.into_iter().map(StockMetrics::normalized).collect())
}

/// Loads current quotes from a JSON object keyed by symbol.
pub fn load_quotes(path: &Path) -> Result<HashMap<String, Quote>, LoadError> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Loads an FX table from a JSON object of currency → JPY rate.
pub fn load_fx_rates(path: &Path) -> Result<FxRates, LoadError> {
    let text = read_file(path)?;
    let rates: HashMap<String, f64> =
        serde_json::from_str(&text).map_err(|source| LoadError::Json {
            path: path.display().to_string(),
            source,
        })?;
    Ok(FxRates::new(rates))
}
