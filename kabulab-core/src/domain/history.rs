//! Daily price history — the input of every technical computation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Close and volume for one trading day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
}

/// Ordered (oldest-first) daily series for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: String,
    pub bars: Vec<DailyBar>,
}

impl PriceHistory {
    pub fn new(symbol: impl Into<String>, bars: Vec<DailyBar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<u64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn latest_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn first_close(&self) -> Option<f64> {
        self.bars.first().map(|b| b.close)
    }

    /// Simple daily returns, dated by the later day of each pair.
    ///
    /// Days whose previous close is zero or non-finite are skipped — halted
    /// listings produce zero closes and would otherwise explode the series.
    pub fn daily_returns(&self) -> Vec<(NaiveDate, f64)> {
        let mut out = Vec::with_capacity(self.bars.len().saturating_sub(1));
        for pair in self.bars.windows(2) {
            let prev = pair[0].close;
            let curr = pair[1].close;
            if prev > 0.0 && prev.is_finite() && curr.is_finite() {
                out.push((pair[1].date, curr / prev - 1.0));
            }
        }
        out
    }
}

/// Build a synthetic history from closes for testing.
///
/// Dates advance one day at a time from 2024-01-02; volume is constant.
#[cfg(test)]
pub fn make_history(symbol: &str, closes: &[f64]) -> PriceHistory {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| DailyBar {
            date: base + chrono::Duration::days(i as i64),
            close,
            volume: 100_000,
        })
        .collect();
    PriceHistory::new(symbol, bars)
}
