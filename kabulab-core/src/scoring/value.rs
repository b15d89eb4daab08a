//! Composite value score (0–100) over five fundamental axes.
//!
//! Each axis maps its raw metric through a piecewise-linear curve to a
//! 0–100 sub-score, then the sub-scores combine under fixed weights:
//!
//! - PER (weight 0.25): cheap below 8x, worthless above 40x
//! - PBR (weight 0.25): cheap below 0.5x, worthless above 3x
//! - dividend yield (weight 0.20): full marks at 5%
//! - ROE (weight 0.15): full marks at 20%
//! - total shareholder yield (weight 0.15): dividends plus buybacks,
//!   full marks at 8%
//!
//! Missing or unusable metrics drop their axis and the remaining weights
//! renormalize, so a stock with no dividend is still scoreable. Fewer
//! than two usable axes is indeterminate and yields no score at all —
//! a single metric is not a valuation.
//!
//! Inputs are expected in ratio form (`StockMetrics::normalized`).

use serde::{Deserialize, Serialize};

use crate::domain::StockMetrics;

const PER_KNOTS: [(f64, f64); 4] = [(8.0, 100.0), (15.0, 60.0), (25.0, 30.0), (40.0, 0.0)];
const PBR_KNOTS: [(f64, f64); 4] = [(0.5, 100.0), (1.0, 70.0), (2.0, 35.0), (3.0, 0.0)];
const DIVIDEND_KNOTS: [(f64, f64); 4] = [(0.0, 0.0), (0.01, 25.0), (0.03, 75.0), (0.05, 100.0)];
const ROE_KNOTS: [(f64, f64); 4] = [(0.0, 0.0), (0.08, 60.0), (0.15, 90.0), (0.20, 100.0)];
const SHAREHOLDER_KNOTS: [(f64, f64); 4] = [(0.0, 0.0), (0.02, 40.0), (0.05, 80.0), (0.08, 100.0)];

/// Minimum usable axes before a composite score is meaningful.
const MIN_USABLE_AXES: usize = 2;

/// One of the five valuation axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueAxis {
    #[serde(rename = "PER")]
    Per,
    #[serde(rename = "PBR")]
    Pbr,
    #[serde(rename = "配当利回り")]
    DividendYield,
    #[serde(rename = "ROE")]
    Roe,
    #[serde(rename = "総還元利回り")]
    ShareholderYield,
}

impl ValueAxis {
    pub const ALL: [ValueAxis; 5] = [
        ValueAxis::Per,
        ValueAxis::Pbr,
        ValueAxis::DividendYield,
        ValueAxis::Roe,
        ValueAxis::ShareholderYield,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ValueAxis::Per => "PER",
            ValueAxis::Pbr => "PBR",
            ValueAxis::DividendYield => "配当利回り",
            ValueAxis::Roe => "ROE",
            ValueAxis::ShareholderYield => "総還元利回り",
        }
    }

    fn weight(self) -> f64 {
        match self {
            ValueAxis::Per => 0.25,
            ValueAxis::Pbr => 0.25,
            ValueAxis::DividendYield => 0.20,
            ValueAxis::Roe => 0.15,
            ValueAxis::ShareholderYield => 0.15,
        }
    }

    fn knots(self) -> &'static [(f64, f64)] {
        match self {
            ValueAxis::Per => &PER_KNOTS,
            ValueAxis::Pbr => &PBR_KNOTS,
            ValueAxis::DividendYield => &DIVIDEND_KNOTS,
            ValueAxis::Roe => &ROE_KNOTS,
            ValueAxis::ShareholderYield => &SHAREHOLDER_KNOTS,
        }
    }

    /// Pulls this axis' input out of the metrics, or `None` when the
    /// metric is absent or unusable (non-positive PER/PBR, NaN).
    fn extract(self, m: &StockMetrics) -> Option<f64> {
        let value = match self {
            ValueAxis::Per => m.per.filter(|p| *p > 0.0),
            ValueAxis::Pbr => m.pbr.filter(|p| *p > 0.0),
            ValueAxis::DividendYield => m.dividend_yield,
            ValueAxis::Roe => m.roe,
            ValueAxis::ShareholderYield => m.shareholder_yield(),
        };
        value.filter(|v| v.is_finite())
    }
}

/// Valuation verdict derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "深割安")]
    DeepValue,
    #[serde(rename = "割安")]
    Undervalued,
    #[serde(rename = "やや割安")]
    SlightlyUndervalued,
    #[serde(rename = "適正")]
    Fair,
    #[serde(rename = "割高")]
    Overvalued,
}

impl Verdict {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Verdict::DeepValue
        } else if score >= 65.0 {
            Verdict::Undervalued
        } else if score >= 50.0 {
            Verdict::SlightlyUndervalued
        } else if score >= 35.0 {
            Verdict::Fair
        } else {
            Verdict::Overvalued
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::DeepValue => "深割安",
            Verdict::Undervalued => "割安",
            Verdict::SlightlyUndervalued => "やや割安",
            Verdict::Fair => "適正",
            Verdict::Overvalued => "割高",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-axis breakdown kept for display and debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisScore {
    pub axis: ValueAxis,
    /// Raw metric value fed to the curve.
    pub input: f64,
    /// Curve output, 0–100.
    pub score: f64,
    /// Nominal weight before renormalization.
    pub weight: f64,
}

/// Composite valuation of a single stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueScore {
    pub symbol: String,
    /// Weighted composite, 0–100, one decimal.
    pub score: f64,
    pub verdict: Verdict,
    pub axes: Vec<AxisScore>,
}

/// Scores stocks on the five-axis value model.
#[derive(Debug, Clone)]
pub struct ValueScorer {
    /// Axes required before a score is emitted.
    pub min_axes: usize,
}

impl Default for ValueScorer {
    fn default() -> Self {
        Self {
            min_axes: MIN_USABLE_AXES,
        }
    }
}

impl ValueScorer {
    /// Scores `metrics`, or `None` when too few axes are usable.
    pub fn score(&self, metrics: &StockMetrics) -> Option<ValueScore> {
        let mut axes = Vec::new();
        let mut weighted = 0.0;
        let mut weight_sum = 0.0;

        for axis in ValueAxis::ALL {
            let Some(input) = axis.extract(metrics) else {
                continue;
            };
            let score = piecewise(axis.knots(), input);
            let weight = axis.weight();
            weighted += score * weight;
            weight_sum += weight;
            axes.push(AxisScore {
                axis,
                input,
                score,
                weight,
            });
        }

        if axes.len() < self.min_axes || weight_sum <= 0.0 {
            return None;
        }

        let score = super::round1(weighted / weight_sum);
        Some(ValueScore {
            symbol: metrics.symbol.clone(),
            score,
            verdict: Verdict::from_score(score),
            axes,
        })
    }
}

/// Linear interpolation over `(input, score)` knots sorted by input.
/// Inputs beyond either end clamp to the terminal knot's score.
fn piecewise(knots: &[(f64, f64)], x: f64) -> f64 {
    let (first_x, first_y) = knots[0];
    if x <= first_x {
        return first_y;
    }
    for pair in knots.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            return y0 + (x - x0) / (x1 - x0) * (y1 - y0);
        }
    }
    knots[knots.len() - 1].1
}
