//! Screening hindsight: how past picks actually performed.
//!
//! Each past screening snapshot pins a symbol to the price it was
//! screened at; only the earliest snapshot per symbol counts, so
//! re-screens do not reset the clock. Returns are measured against
//! today's price, and per-benchmark alpha compares each pick with the
//! benchmark over the same window (benchmark close on the first
//! session at or after the screening date, through the latest close).
//!
//! Symbols whose current price cannot be resolved are excluded from
//! every statistic and surface only in the skip count.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::PriceHistory;
use crate::risk::correlation::factor_label;

/// One past screening hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningSnapshot {
    pub symbol: String,
    pub screened_date: NaiveDate,
    pub screened_price: f64,
    pub score: f64,
    pub verdict: String,
}

/// Performance of one screened symbol since its screening date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolPerformance {
    pub symbol: String,
    pub screened_date: NaiveDate,
    pub screened_price: f64,
    pub current_price: f64,
    pub return_rate: f64,
}

/// Mean outperformance of the picks against one benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkAlpha {
    pub benchmark: String,
    pub label: String,
    pub mean_benchmark_return: f64,
    pub alpha: f64,
    /// Picks the benchmark history actually covered.
    pub covered: usize,
}

/// The full hindsight report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub evaluated: usize,
    pub skipped: usize,
    /// Zero when nothing was evaluated.
    pub mean_return: f64,
    pub median_return: f64,
    /// Fraction of evaluated picks with a positive return.
    pub win_rate: f64,
    /// Best performer first.
    pub performances: Vec<SymbolPerformance>,
    pub benchmarks: Vec<BenchmarkAlpha>,
}

/// Evaluates past screening snapshots against current prices.
pub fn run_backtest(
    snapshots: &[ScreeningSnapshot],
    current_prices: &HashMap<String, f64>,
    benchmarks: &[PriceHistory],
) -> BacktestReport {
    // Earliest snapshot per symbol wins.
    let mut earliest: HashMap<&str, &ScreeningSnapshot> = HashMap::new();
    for snap in snapshots {
        earliest
            .entry(snap.symbol.as_str())
            .and_modify(|held| {
                if snap.screened_date < held.screened_date {
                    *held = snap;
                }
            })
            .or_insert(snap);
    }

    let mut performances = Vec::new();
    let mut skipped = 0usize;
    for snap in earliest.values() {
        let current = current_prices
            .get(&snap.symbol)
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0);
        let Some(current_price) = current else {
            skipped += 1;
            continue;
        };
        if !(snap.screened_price.is_finite() && snap.screened_price > 0.0) {
            skipped += 1;
            continue;
        }
        performances.push(SymbolPerformance {
            symbol: snap.symbol.clone(),
            screened_date: snap.screened_date,
            screened_price: snap.screened_price,
            current_price,
            return_rate: current_price / snap.screened_price - 1.0,
        });
    }
    performances.sort_by(|a, b| b.return_rate.total_cmp(&a.return_rate));

    let evaluated = performances.len();
    let returns: Vec<f64> = performances.iter().map(|p| p.return_rate).collect();
    let mean_return = mean(&returns);
    let median_return = median(&returns);
    let win_rate = if evaluated > 0 {
        returns.iter().filter(|r| **r > 0.0).count() as f64 / evaluated as f64
    } else {
        0.0
    };

    let benchmark_alphas = benchmarks
        .iter()
        .filter_map(|bench| benchmark_alpha(bench, &performances))
        .collect();

    BacktestReport {
        evaluated,
        skipped,
        mean_return,
        median_return,
        win_rate,
        performances,
        benchmarks: benchmark_alphas,
    }
}

/// Paired pick-vs-benchmark comparison over the picks this benchmark
/// history covers. `None` when it covers none of them.
fn benchmark_alpha(bench: &PriceHistory, performances: &[SymbolPerformance]) -> Option<BenchmarkAlpha> {
    let latest = bench.latest_close().filter(|c| *c > 0.0)?;
    let mut stock_returns = Vec::new();
    let mut bench_returns = Vec::new();
    for perf in performances {
        let Some(window_open) = bench
            .bars
            .iter()
            .find(|bar| bar.date >= perf.screened_date)
            .map(|bar| bar.close)
            .filter(|c| *c > 0.0)
        else {
            continue;
        };
        stock_returns.push(perf.return_rate);
        bench_returns.push(latest / window_open - 1.0);
    }
    if stock_returns.is_empty() {
        return None;
    }
    let mean_benchmark_return = mean(&bench_returns);
    Some(BenchmarkAlpha {
        benchmark: bench.symbol.clone(),
        label: factor_label(&bench.symbol).to_string(),
        mean_benchmark_return,
        alpha: mean(&stock_returns) - mean_benchmark_return,
        covered: stock_returns.len(),
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
