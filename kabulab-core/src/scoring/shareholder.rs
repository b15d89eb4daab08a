//! Shareholder-return stability: is the payout level sustainable?
//!
//! Classifies the per-period total-return yield history (dividends plus
//! buybacks over market cap, latest first) into a trend label. A spike to
//! 1.5x the prior average without a sustained run-up reads as a one-off
//! special return, not a raise — high trailing yield right before a cut is
//! the classic value-trap shape, so the health machine treats `Temporary`
//! and `Decreasing` as warning inputs.

use serde::{Deserialize, Serialize};

use crate::domain::StockMetrics;

/// Latest yield at or above 1.5x the prior average looks like a one-off.
const TEMPORARY_SPIKE_RATIO: f64 = 1.5;
/// Latest yield at or below two thirds of the prior average is a cut.
const DECREASE_RATIO: f64 = 0.67;
/// Latest yield 15% above the prior average counts as a raise.
const INCREASE_RATIO: f64 = 1.15;

/// Payout-trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnStability {
    #[serde(rename = "不明")]
    Unknown,
    #[serde(rename = "単年のみ")]
    SinglePeriod,
    #[serde(rename = "安定")]
    Stable,
    #[serde(rename = "増加傾向")]
    Increasing,
    #[serde(rename = "減少傾向")]
    Decreasing,
    #[serde(rename = "一時的高還元")]
    Temporary,
}

impl ReturnStability {
    pub fn label(self) -> &'static str {
        match self {
            ReturnStability::Unknown => "不明",
            ReturnStability::SinglePeriod => "単年のみ",
            ReturnStability::Stable => "安定",
            ReturnStability::Increasing => "増加傾向",
            ReturnStability::Decreasing => "減少傾向",
            ReturnStability::Temporary => "一時的高還元",
        }
    }
}

impl std::fmt::Display for ReturnStability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Stability assessment for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    pub symbol: String,
    pub stability: ReturnStability,
    /// Latest-period total return yield, when any history exists.
    pub latest: Option<f64>,
    /// Mean of the prior periods, when at least two periods exist.
    pub prior_average: Option<f64>,
    /// Periods of history behind the classification.
    pub periods: usize,
}

impl StabilityReport {
    pub fn from_metrics(metrics: &StockMetrics) -> Self {
        let history = metrics.shareholder_yield_history();
        let latest = history.first().copied();
        let prior_average = (history.len() >= 2)
            .then(|| history[1..].iter().sum::<f64>() / (history.len() - 1) as f64);
        Self {
            symbol: metrics.symbol.clone(),
            stability: classify_stability(&history),
            latest,
            prior_average,
            periods: history.len(),
        }
    }
}

/// Classifies a latest-first yield history.
///
/// Rule order matters: a no-payout past promotes any new payout to
/// `Temporary` (a first-ever return is unproven), spikes beat trends,
/// cuts beat raises.
pub fn classify_stability(history: &[f64]) -> ReturnStability {
    match history.len() {
        0 => return ReturnStability::Unknown,
        1 => return ReturnStability::SinglePeriod,
        _ => {}
    }
    let latest = history[0];
    let prior = &history[1..];
    let prior_avg = prior.iter().sum::<f64>() / prior.len() as f64;

    if prior_avg <= 0.0 {
        return if latest > 0.0 {
            ReturnStability::Temporary
        } else {
            ReturnStability::Stable
        };
    }
    if latest >= prior_avg * TEMPORARY_SPIKE_RATIO && !monotonic_rising(prior) {
        return ReturnStability::Temporary;
    }
    if monotonic_falling(history) || latest <= prior_avg * DECREASE_RATIO {
        return ReturnStability::Decreasing;
    }
    if monotonic_rising(history) || latest >= prior_avg * INCREASE_RATIO {
        return ReturnStability::Increasing;
    }
    ReturnStability::Stable
}

/// Every period at or above the next-older one, strictly above overall.
/// Slices are latest-first.
fn monotonic_rising(h: &[f64]) -> bool {
    h.len() >= 2 && h.windows(2).all(|w| w[0] >= w[1]) && h[0] > h[h.len() - 1]
}

fn monotonic_falling(h: &[f64]) -> bool {
    h.len() >= 2 && h.windows(2).all(|w| w[0] <= w[1]) && h[0] < h[h.len() - 1]
}
