//! Return-series statistics: pairwise correlation and factor regression.
//!
//! Everything aligns on common dates first — two symbols trading on
//! different calendars only compare where both have a return. Fewer
//! than 30 common observations is not a correlation, it is noise, and
//! reads as NaN in the matrix.
//!
//! The factor decomposition is a plain OLS against market factor
//! returns (USD/JPY, 日経225, S&P500, 原油, 米10年金利), solved via
//! normal equations with partial-pivot elimination. Factor betas are
//! reported with a volatility-scaled contribution so a small beta on a
//! wild factor still surfaces.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::PriceHistory;

/// Observations required before a pairwise correlation is reported.
const MIN_COMMON_OBS: usize = 30;
/// Default threshold for the highlighted-pairs list.
pub const HIGH_CORRELATION_THRESHOLD: f64 = 0.7;

/// Pairwise Pearson correlations, row-major, NaN where data is thin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub symbols: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

/// One highlighted pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedPair {
    pub a: String,
    pub b: String,
    pub rho: f64,
    pub label: String,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        Some(self.values[i][j])
    }

    /// Pairs at or above `threshold` in magnitude, strongest first.
    pub fn high_pairs(&self, threshold: f64) -> Vec<CorrelatedPair> {
        let mut pairs = Vec::new();
        for i in 0..self.symbols.len() {
            for j in (i + 1)..self.symbols.len() {
                let rho = self.values[i][j];
                if rho.is_finite() && rho.abs() >= threshold {
                    pairs.push(CorrelatedPair {
                        a: self.symbols[i].clone(),
                        b: self.symbols[j].clone(),
                        rho,
                        label: correlation_label(rho).to_string(),
                    });
                }
            }
        }
        pairs.sort_by(|x, y| y.rho.abs().total_cmp(&x.rho.abs()));
        pairs
    }
}

pub fn correlation_label(rho: f64) -> &'static str {
    if rho >= 0.85 {
        "非常に強い正の相関"
    } else if rho >= 0.7 {
        "強い正の相関"
    } else if rho <= -0.7 {
        "強い逆相関"
    } else {
        "逆相関"
    }
}

/// Builds the full matrix for a set of price histories.
pub fn correlation_matrix(histories: &[PriceHistory]) -> CorrelationMatrix {
    let maps: Vec<HashMap<NaiveDate, f64>> = histories
        .iter()
        .map(|h| h.daily_returns().into_iter().collect())
        .collect();
    let n = histories.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let rho = common_date_correlation(&maps[i], &maps[j]);
            values[i][j] = rho;
            values[j][i] = rho;
        }
    }
    CorrelationMatrix {
        symbols: histories.iter().map(|h| h.symbol.clone()).collect(),
        values,
    }
}

fn common_date_correlation(a: &HashMap<NaiveDate, f64>, b: &HashMap<NaiveDate, f64>) -> f64 {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (date, ra) in a {
        if let Some(rb) = b.get(date) {
            xs.push(*ra);
            ys.push(*rb);
        }
    }
    if xs.len() < MIN_COMMON_OBS {
        return f64::NAN;
    }
    pearson(&xs, &ys)
}

/// Pearson correlation; a flat series correlates with nothing and
/// reads as 0.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    let mx = xs[..n].iter().sum::<f64>() / n as f64;
    let my = ys[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for k in 0..n {
        let dx = xs[k] - mx;
        let dy = ys[k] - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx == 0.0 || vy == 0.0 {
        return 0.0;
    }
    cov / (vx.sqrt() * vy.sqrt())
}

/// Display label for the built-in market factors.
pub fn factor_label(symbol: &str) -> &str {
    match symbol {
        "USDJPY=X" => "USD/JPY",
        "^N225" => "日経225",
        "^GSPC" => "S&P500",
        "CL=F" => "原油",
        "^TNX" => "米10年金利",
        other => other,
    }
}

/// One factor's regression result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorExposure {
    pub factor: String,
    pub label: String,
    pub beta: f64,
    /// |beta| × factor volatility / stock volatility.
    pub contribution: f64,
}

/// Multi-factor OLS result for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorDecomposition {
    pub symbol: String,
    pub r_squared: f64,
    /// Exposures sorted by contribution, strongest first. Empty when
    /// the regression could not run.
    pub exposures: Vec<FactorExposure>,
    pub observations: usize,
}

impl FactorDecomposition {
    fn empty(symbol: &str, observations: usize) -> Self {
        Self {
            symbol: symbol.to_string(),
            r_squared: 0.0,
            exposures: Vec::new(),
            observations,
        }
    }
}

/// Regresses a stock's returns on the factor returns over common dates.
pub fn decompose_factors(stock: &PriceHistory, factors: &[PriceHistory]) -> FactorDecomposition {
    if factors.is_empty() {
        return FactorDecomposition::empty(&stock.symbol, 0);
    }
    let stock_map: HashMap<NaiveDate, f64> = stock.daily_returns().into_iter().collect();
    let factor_maps: Vec<HashMap<NaiveDate, f64>> = factors
        .iter()
        .map(|f| f.daily_returns().into_iter().collect())
        .collect();

    let mut dates: Vec<NaiveDate> = stock_map
        .keys()
        .filter(|d| factor_maps.iter().all(|m| m.contains_key(*d)))
        .copied()
        .collect();
    dates.sort();
    let n = dates.len();
    if n < MIN_COMMON_OBS {
        return FactorDecomposition::empty(&stock.symbol, n);
    }

    let y: Vec<f64> = dates.iter().map(|d| stock_map[d]).collect();
    let columns: Vec<Vec<f64>> = factor_maps
        .iter()
        .map(|m| dates.iter().map(|d| m[d]).collect())
        .collect();

    // Flat factor columns carry no information and break the solver.
    let kept: Vec<usize> = (0..columns.len())
        .filter(|&i| population_stddev(&columns[i]) > 0.0)
        .collect();
    if kept.is_empty() {
        return FactorDecomposition::empty(&stock.symbol, n);
    }

    // Normal equations with an intercept column.
    let k = kept.len() + 1;
    let row_at = |t: usize| -> Vec<f64> {
        let mut row = Vec::with_capacity(k);
        row.push(1.0);
        row.extend(kept.iter().map(|&i| columns[i][t]));
        row
    };
    let mut ata = vec![vec![0.0; k]; k];
    let mut aty = vec![0.0; k];
    for t in 0..n {
        let row = row_at(t);
        for i in 0..k {
            aty[i] += row[i] * y[t];
            for j in 0..k {
                ata[i][j] += row[i] * row[j];
            }
        }
    }
    let Some(coef) = solve_linear(ata, aty) else {
        return FactorDecomposition::empty(&stock.symbol, n);
    };

    let mut ss_res = 0.0;
    let mean_y = y.iter().sum::<f64>() / n as f64;
    let mut ss_tot = 0.0;
    for t in 0..n {
        let row = row_at(t);
        let predicted: f64 = row.iter().zip(&coef).map(|(a, b)| a * b).sum();
        ss_res += (y[t] - predicted).powi(2);
        ss_tot += (y[t] - mean_y).powi(2);
    }
    let r_squared = if ss_tot > 0.0 {
        (1.0 - ss_res / ss_tot).max(0.0)
    } else {
        0.0
    };

    let stock_vol = population_stddev(&y);
    let mut exposures: Vec<FactorExposure> = kept
        .iter()
        .enumerate()
        .map(|(slot, &i)| {
            let beta = coef[slot + 1];
            let factor_vol = population_stddev(&columns[i]);
            FactorExposure {
                factor: factors[i].symbol.clone(),
                label: factor_label(&factors[i].symbol).to_string(),
                beta,
                contribution: if stock_vol > 0.0 {
                    beta.abs() * factor_vol / stock_vol
                } else {
                    0.0
                },
            }
        })
        .collect();
    exposures.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));

    FactorDecomposition {
        symbol: stock.symbol.clone(),
        r_squared,
        exposures,
        observations: n,
    }
}

/// Gaussian elimination with partial pivoting. `None` when singular.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for c in col..n {
                a[row][c] -= factor * a[col][c];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for c in (row + 1)..n {
            sum -= a[row][c] * x[c];
        }
        x[row] = sum / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

fn population_stddev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::DailyBar;

    fn history(symbol: &str, closes: &[f64]) -> PriceHistory {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        PriceHistory {
            symbol: symbol.to_string(),
            bars: closes
                .iter()
                .enumerate()
                .map(|(i, c)| DailyBar {
                    date: start + chrono::Days::new(i as u64),
                    close: *c,
                    volume: 100_000,
                })
                .collect(),
        }
    }

    fn wavy(scale: f64, n: usize) -> Vec<f64> {
        // Deterministic non-trivial return pattern.
        let mut closes = vec![100.0];
        for i in 0..n {
            let r = match i % 4 {
                0 => 0.01,
                1 => -0.005,
                2 => 0.02,
                _ => -0.015,
            } * scale;
            let prev = *closes.last().unwrap();
            closes.push(prev * (1.0 + r));
        }
        closes
    }

    #[test]
    fn identical_series_correlate_perfectly() {
        let a = history("A", &wavy(1.0, 40));
        let b = history("B", &wavy(1.0, 40));
        let m = correlation_matrix(&[a, b]);
        assert!((m.get("A", "B").unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(m.get("A", "A"), Some(1.0));
    }

    #[test]
    fn scaled_series_still_correlate_perfectly() {
        // Same return signs, half the amplitude: Pearson is scale-free.
        let a = history("A", &wavy(1.0, 40));
        let b = history("B", &wavy(0.5, 40));
        let m = correlation_matrix(&[a, b]);
        assert!((m.get("A", "B").unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn thin_overlap_reads_nan() {
        let a = history("A", &wavy(1.0, 40));
        let b = history("B", &wavy(1.0, 10));
        let m = correlation_matrix(&[a, b]);
        assert!(m.get("A", "B").unwrap().is_nan());
    }

    #[test]
    fn flat_series_reads_zero() {
        let a = history("A", &wavy(1.0, 40));
        let b = history("B", &vec![100.0; 41]);
        let m = correlation_matrix(&[a, b]);
        assert_eq!(m.get("A", "B"), Some(0.0));
    }

    #[test]
    fn high_pairs_sorted_and_labelled() {
        let a = history("A", &wavy(1.0, 40));
        let b = history("B", &wavy(0.8, 40));
        let inverse: Vec<f64> = {
            let mut closes = vec![100.0];
            for i in 0..40 {
                let r = match i % 4 {
                    0 => -0.01,
                    1 => 0.005,
                    2 => -0.02,
                    _ => 0.015,
                };
                let prev = *closes.last().unwrap();
                closes.push(prev * (1.0 + r));
            }
            closes
        };
        let c = history("C", &inverse);
        let m = correlation_matrix(&[a, b, c]);
        let pairs = m.high_pairs(HIGH_CORRELATION_THRESHOLD);
        assert_eq!(pairs.len(), 3);
        assert!(pairs
            .iter()
            .any(|p| p.rho > 0.0 && p.label == "非常に強い正の相関"));
        assert!(pairs.iter().any(|p| p.rho < 0.0 && p.label == "強い逆相関"));
        // Strongest first.
        for w in pairs.windows(2) {
            assert!(w[0].rho.abs() >= w[1].rho.abs());
        }
    }

    #[test]
    fn factor_regression_recovers_beta() {
        let factor = history("^N225", &wavy(1.0, 60));
        // Stock moves 1.5x the factor, same dates.
        let stock_closes: Vec<f64> = {
            let mut closes = vec![100.0];
            for i in 0..60 {
                let r = match i % 4 {
                    0 => 0.01,
                    1 => -0.005,
                    2 => 0.02,
                    _ => -0.015,
                } * 1.5;
                let prev = *closes.last().unwrap();
                closes.push(prev * (1.0 + r));
            }
            closes
        };
        let stock = history("7203.T", &stock_closes);
        let d = decompose_factors(&stock, &[factor]);
        assert_eq!(d.exposures.len(), 1);
        assert_eq!(d.exposures[0].label, "日経225");
        assert!((d.exposures[0].beta - 1.5).abs() < 1e-6);
        assert!(d.r_squared > 0.999);
        // Contribution of the only driver is the whole volatility.
        assert!((d.exposures[0].contribution - 1.0).abs() < 1e-6);
    }

    #[test]
    fn flat_factor_is_skipped() {
        let flat = history("^TNX", &vec![100.0; 61]);
        let live = history("^GSPC", &wavy(1.0, 60));
        let stock = history("AAPL", &wavy(1.2, 60));
        let d = decompose_factors(&stock, &[flat, live]);
        assert_eq!(d.exposures.len(), 1);
        assert_eq!(d.exposures[0].factor, "^GSPC");
    }

    #[test]
    fn too_few_observations_yield_empty() {
        let factor = history("^GSPC", &wavy(1.0, 10));
        let stock = history("AAPL", &wavy(1.0, 10));
        let d = decompose_factors(&stock, &[factor]);
        assert!(d.exposures.is_empty());
        assert_eq!(d.r_squared, 0.0);
    }

    #[test]
    fn factor_labels_cover_the_builtin_set() {
        assert_eq!(factor_label("USDJPY=X"), "USD/JPY");
        assert_eq!(factor_label("CL=F"), "原油");
        assert_eq!(factor_label("^TNX"), "米10年金利");
        assert_eq!(factor_label("UNKNOWN"), "UNKNOWN");
    }

    #[test]
    fn solver_handles_a_known_system() {
        // 2x + y = 5, x + 3y = 10 → x = 1, y = 3
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve_linear(a, vec![5.0, 10.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
        // Singular system refuses.
        let singular = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve_linear(singular, vec![1.0, 2.0]).is_none());
    }
}
