//! Parametric value-at-risk over a daily return series.
//!
//! Normal-approximation VaR: the loss threshold at a confidence level
//! is `μ − z·σ` per day, scaled to a month by `μ·21 − z·σ·√21`. The
//! estimate carries the annualized volatility (`σ·√252`) alongside so
//! callers can show both. Thirty observations is the floor; below that
//! the answer is `None` rather than a false number.

use serde::{Deserialize, Serialize};

use crate::domain::PriceHistory;

/// Observations required before an estimate is produced.
const MIN_OBSERVATIONS: usize = 30;
const TRADING_DAYS_PER_MONTH: f64 = 21.0;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Confidence level for the loss threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarConfidence {
    P95,
    P99,
}

impl VarConfidence {
    /// One-sided normal quantile.
    pub fn z(self) -> f64 {
        match self {
            Self::P95 => 1.645,
            Self::P99 => 2.326,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::P95 => "95%",
            Self::P99 => "99%",
        }
    }
}

/// Parametric VaR for one return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarEstimate {
    pub confidence: VarConfidence,
    /// Return threshold per day; negative means a loss.
    pub daily_return_var: f64,
    pub monthly_return_var: f64,
    /// Loss amounts against the supplied portfolio value, floored at 0
    /// when drift pushes the threshold positive.
    pub daily_loss_jpy: f64,
    pub monthly_loss_jpy: f64,
    pub annualized_volatility: f64,
    pub mean_daily_return: f64,
    pub observation_days: usize,
}

/// Computes normal-approximation VaR from daily returns.
pub fn parametric_var(
    returns: &[f64],
    total_value_jpy: f64,
    confidence: VarConfidence,
) -> Option<VarEstimate> {
    if returns.len() < MIN_OBSERVATIONS {
        return None;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let z = confidence.z();

    let daily = mean - z * stddev;
    let monthly = mean * TRADING_DAYS_PER_MONTH - z * stddev * TRADING_DAYS_PER_MONTH.sqrt();

    Some(VarEstimate {
        confidence,
        daily_return_var: daily,
        monthly_return_var: monthly,
        daily_loss_jpy: (-daily).max(0.0) * total_value_jpy,
        monthly_loss_jpy: (-monthly).max(0.0) * total_value_jpy,
        annualized_volatility: stddev * TRADING_DAYS_PER_YEAR.sqrt(),
        mean_daily_return: mean,
        observation_days: returns.len(),
    })
}

/// Weighted portfolio daily returns over dates every history covers.
///
/// Histories without a date drop that date for everyone, so the series
/// only mixes returns from the same session.
pub fn weighted_portfolio_returns(histories: &[PriceHistory], weights: &[f64]) -> Vec<f64> {
    use std::collections::HashMap;

    use chrono::NaiveDate;

    if histories.is_empty() {
        return Vec::new();
    }
    let maps: Vec<HashMap<NaiveDate, f64>> = histories
        .iter()
        .map(|h| h.daily_returns().into_iter().collect())
        .collect();
    let mut dates: Vec<NaiveDate> = maps[0]
        .keys()
        .filter(|d| maps.iter().all(|m| m.contains_key(*d)))
        .copied()
        .collect();
    dates.sort();
    dates
        .iter()
        .map(|d| {
            maps.iter()
                .zip(weights)
                .map(|(m, w)| m[d] * w)
                .sum::<f64>()
        })
        .collect()
}
