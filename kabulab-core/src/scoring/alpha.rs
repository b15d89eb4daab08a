//! Change-quality ("alpha") score: is the business improving, and is the
//! reported profit real?
//!
//! Four sub-signals, each mapped to a 0–1 unit score:
//!
//! - accruals: (net income − operating cash flow) / total assets, negative
//!   means cash-backed earnings
//! - revenue acceleration: growth of growth over the last three periods
//! - FCF trend: free-cash-flow-to-income ratio, current vs prior period
//! - ROE trend: least-squares slope of ROE over ≥3 periods
//!
//! The composite is the mean of the computable units on a 0–100 scale,
//! minus a 20-point penalty when EPS collapsed more than 20%. A signal
//! that cannot be computed counts as not passed when labelling quality,
//! so thin data reads as deterioration rather than health.

use serde::{Deserialize, Serialize};

use crate::domain::StockMetrics;

const ACCRUAL_SLOPE: f64 = 2.5;
const ACCEL_SLOPE: f64 = 2.5;
const ROE_SLOPE_GAIN: f64 = 10.0;
const EPS_COLLAPSE_THRESHOLD: f64 = -0.20;
const EPS_COLLAPSE_PENALTY: f64 = 20.0;
const MIN_HISTORY_PERIODS: usize = 3;

/// The four change-quality sub-signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphaSignal {
    #[serde(rename = "アクルーアル")]
    Accruals,
    #[serde(rename = "売上成長の加速")]
    RevenueAcceleration,
    #[serde(rename = "FCF比率トレンド")]
    FcfTrend,
    #[serde(rename = "ROEトレンド")]
    RoeTrend,
}

impl AlphaSignal {
    pub fn label(self) -> &'static str {
        match self {
            AlphaSignal::Accruals => "アクルーアル",
            AlphaSignal::RevenueAcceleration => "売上成長の加速",
            AlphaSignal::FcfTrend => "FCF比率トレンド",
            AlphaSignal::RoeTrend => "ROEトレンド",
        }
    }
}

/// Overall quality label, the input the health machine keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityLabel {
    #[serde(rename = "良好")]
    Good,
    #[serde(rename = "1指標↓")]
    OneDown,
    #[serde(rename = "複数悪化")]
    MultipleDown,
    #[serde(rename = "対象外")]
    NotApplicable,
}

impl QualityLabel {
    pub fn label(self) -> &'static str {
        match self {
            QualityLabel::Good => "良好",
            QualityLabel::OneDown => "1指標↓",
            QualityLabel::MultipleDown => "複数悪化",
            QualityLabel::NotApplicable => "対象外",
        }
    }
}

impl std::fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One computed sub-signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSignal {
    pub signal: AlphaSignal,
    /// The measured quantity (accrual ratio, acceleration, delta, slope).
    pub measure: f64,
    /// Unit score, 0–1.
    pub score: f64,
    pub passed: bool,
}

/// Change-quality assessment of a single stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaScore {
    pub symbol: String,
    /// Composite, 0–100, one decimal.
    pub score: f64,
    pub label: QualityLabel,
    pub signals: Vec<SubSignal>,
    /// True when the EPS-collapse penalty was applied.
    pub penalized: bool,
}

/// Scores stocks on the four change-quality signals.
#[derive(Debug, Clone, Default)]
pub struct AlphaScorer;

impl AlphaScorer {
    /// Scores `metrics`. ETFs get a `NotApplicable` placeholder; a stock
    /// with no computable signal at all is indeterminate.
    pub fn score(&self, metrics: &StockMetrics) -> Option<AlphaScore> {
        if metrics.is_etf {
            return Some(AlphaScore {
                symbol: metrics.symbol.clone(),
                score: 0.0,
                label: QualityLabel::NotApplicable,
                signals: Vec::new(),
                penalized: false,
            });
        }

        let signals: Vec<SubSignal> = [
            accrual_signal(metrics),
            revenue_acceleration(metrics),
            fcf_trend(metrics),
            roe_trend(metrics),
        ]
        .into_iter()
        .flatten()
        .collect();

        if signals.is_empty() {
            return None;
        }

        let mean = signals.iter().map(|s| s.score).sum::<f64>() / signals.len() as f64;
        let penalized = metrics
            .eps_growth
            .is_some_and(|g| g < EPS_COLLAPSE_THRESHOLD);
        let penalty = if penalized { EPS_COLLAPSE_PENALTY } else { 0.0 };
        let score = (mean * 100.0 - penalty).clamp(0.0, 100.0);

        // Uncomputable signals count as not passed: four slots, not
        // signals.len().
        let passed = signals.iter().filter(|s| s.passed).count();
        let label = if passed >= 3 {
            QualityLabel::Good
        } else if passed == 2 {
            QualityLabel::OneDown
        } else {
            QualityLabel::MultipleDown
        };

        Some(AlphaScore {
            symbol: metrics.symbol.clone(),
            score: super::round1(score),
            label,
            signals,
            penalized,
        })
    }
}

fn accrual_signal(m: &StockMetrics) -> Option<SubSignal> {
    let ni = m.net_income?;
    let ocf = m.operating_cash_flow?;
    let assets = m.total_assets.filter(|t| *t > 0.0)?;
    let ratio = (ni - ocf) / assets;
    if !ratio.is_finite() {
        return None;
    }
    Some(SubSignal {
        signal: AlphaSignal::Accruals,
        measure: ratio,
        score: clamp_unit(0.5 - ratio * ACCRUAL_SLOPE),
        passed: ratio < 0.0,
    })
}

fn revenue_acceleration(m: &StockMetrics) -> Option<SubSignal> {
    let h = &m.revenue_history;
    if h.len() < MIN_HISTORY_PERIODS {
        return None;
    }
    let (r0, r1, r2) = (h[0], h[1], h[2]);
    if r1 == 0.0 || r2 == 0.0 {
        return None;
    }
    let g_latest = (r0 - r1) / r1.abs();
    let g_prior = (r1 - r2) / r2.abs();
    let accel = g_latest - g_prior;
    if !accel.is_finite() {
        return None;
    }
    Some(SubSignal {
        signal: AlphaSignal::RevenueAcceleration,
        measure: accel,
        score: clamp_unit(0.5 + accel * ACCEL_SLOPE),
        passed: g_latest > 0.0 || accel > 0.0,
    })
}

fn fcf_trend(m: &StockMetrics) -> Option<SubSignal> {
    let fcf = m.free_cash_flow?;
    let fcf_prior = m.free_cash_flow_prior?;
    let ni = m.net_income.filter(|n| *n != 0.0)?;
    let ni_prior = m.net_income_prior.filter(|n| *n != 0.0)?;
    let delta = fcf / ni.abs() - fcf_prior / ni_prior.abs();
    if !delta.is_finite() {
        return None;
    }
    Some(SubSignal {
        signal: AlphaSignal::FcfTrend,
        measure: delta,
        score: clamp_unit(0.5 + delta),
        passed: fcf > 0.0 && delta >= 0.0,
    })
}

fn roe_trend(m: &StockMetrics) -> Option<SubSignal> {
    let n = m.net_income_history.len().min(m.equity_history.len());
    if n < MIN_HISTORY_PERIODS {
        return None;
    }
    // Histories arrive latest-first; the regression runs chronologically.
    let roes: Vec<f64> = (0..n)
        .rev()
        .filter_map(|i| {
            let equity = m.equity_history[i];
            (equity > 0.0).then(|| m.net_income_history[i] / equity)
        })
        .collect();
    if roes.len() < MIN_HISTORY_PERIODS {
        return None;
    }
    let slope = least_squares_slope(&roes)?;
    Some(SubSignal {
        signal: AlphaSignal::RoeTrend,
        measure: slope,
        score: clamp_unit(0.5 + slope * ROE_SLOPE_GAIN),
        passed: slope > 0.0,
    })
}

/// Ordinary least-squares slope of `values` against 0,1,2,...
fn least_squares_slope(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    let x_mean = (values.len() - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    let slope = num / den;
    slope.is_finite().then_some(slope)
}

fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn improving() -> StockMetrics {
        StockMetrics {
            symbol: "6758.T".into(),
            net_income: Some(100.0),
            net_income_prior: Some(95.0),
            operating_cash_flow: Some(150.0),
            total_assets: Some(1_000.0),
            free_cash_flow: Some(120.0),
            free_cash_flow_prior: Some(90.0),
            revenue_history: vec![130.0, 110.0, 100.0],
            net_income_history: vec![100.0, 90.0, 80.0],
            equity_history: vec![1_000.0, 950.0, 900.0],
            ..Default::default()
        }
    }

    #[test]
    fn cash_backed_improvement_scores_good() {
        let score = AlphaScorer.score(&improving()).unwrap();
        assert_eq!(score.signals.len(), 4);
        assert!(score.signals.iter().all(|s| s.passed));
        assert_eq!(score.label, QualityLabel::Good);
        // units: accrual 0.625, accel 0.70455, fcf 0.75263, roe 0.55556
        assert!((score.score - 65.9).abs() < 1e-10);
        assert!(!score.penalized);
    }

    #[test]
    fn eps_collapse_costs_twenty_points() {
        let mut m = improving();
        m.eps_growth = Some(-0.30);
        let score = AlphaScorer.score(&m).unwrap();
        assert!(score.penalized);
        assert!((score.score - 45.9).abs() < 1e-10);
        // The penalty hits the score, not the pass count.
        assert_eq!(score.label, QualityLabel::Good);
    }

    #[test]
    fn deteriorating_company_flags_multiple_signals() {
        let m = StockMetrics {
            symbol: "9999.T".into(),
            net_income: Some(100.0),
            net_income_prior: Some(100.0),
            operating_cash_flow: Some(40.0),
            total_assets: Some(1_000.0),
            free_cash_flow: Some(-10.0),
            free_cash_flow_prior: Some(50.0),
            revenue_history: vec![95.0, 100.0, 98.0],
            net_income_history: vec![50.0, 76.0, 90.0],
            equity_history: vec![1_000.0, 950.0, 900.0],
            ..Default::default()
        };
        let score = AlphaScorer.score(&m).unwrap();
        assert_eq!(score.label, QualityLabel::MultipleDown);
        assert!(score.signals.iter().all(|s| !s.passed));
        assert!(score.score < 30.0);
    }

    #[test]
    fn missing_signals_count_against_quality() {
        // Only accruals and ROE trend are computable; both pass, but two
        // passes out of four slots is still a warning.
        let m = StockMetrics {
            symbol: "7011.T".into(),
            net_income: Some(100.0),
            operating_cash_flow: Some(150.0),
            total_assets: Some(1_000.0),
            net_income_history: vec![100.0, 90.0, 80.0],
            equity_history: vec![1_000.0, 950.0, 900.0],
            ..Default::default()
        };
        let score = AlphaScorer.score(&m).unwrap();
        assert_eq!(score.signals.len(), 2);
        assert!(score.signals.iter().all(|s| s.passed));
        assert_eq!(score.label, QualityLabel::OneDown);
    }

    #[test]
    fn etf_is_not_applicable() {
        let m = StockMetrics {
            symbol: "1306.T".into(),
            is_etf: true,
            ..Default::default()
        };
        let score = AlphaScorer.score(&m).unwrap();
        assert_eq!(score.label, QualityLabel::NotApplicable);
        assert_eq!(score.score, 0.0);
        assert!(score.signals.is_empty());
    }

    #[test]
    fn no_computable_signal_is_indeterminate() {
        let m = StockMetrics {
            symbol: "THIN".into(),
            ..Default::default()
        };
        assert!(AlphaScorer.score(&m).is_none());
    }

    #[test]
    fn slope_fits_a_clean_line() {
        // y = 0.02x + 0.05
        let slope = least_squares_slope(&[0.05, 0.07, 0.09, 0.11]).unwrap();
        assert!((slope - 0.02).abs() < 1e-12);
    }

    #[test]
    fn quality_labels_serialize_as_japanese() {
        let json = serde_json::to_string(&QualityLabel::OneDown).unwrap();
        assert_eq!(json, "\"1指標↓\"");
        let back: QualityLabel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, QualityLabel::OneDown);
    }
}
