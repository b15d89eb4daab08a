//! Fundamental scoring: valuation, change quality, shareholder returns.

pub mod alpha;
pub mod shareholder;
pub mod value;

pub use alpha::{AlphaScore, AlphaScorer, AlphaSignal, QualityLabel, SubSignal};
pub use shareholder::{classify_stability, ReturnStability, StabilityReport};
pub use value::{AxisScore, ValueAxis, ValueScore, ValueScorer, Verdict};

use serde::{Deserialize, Serialize};

use crate::domain::StockMetrics;

/// Hard screening criteria applied before scoring.
///
/// Every bound is optional; a missing metric skips its criterion rather
/// than failing it — screening narrows on what is known, scoring handles
/// the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreeningCriteria {
    pub max_per: Option<f64>,
    pub max_pbr: Option<f64>,
    pub min_dividend_yield: Option<f64>,
    pub min_roe: Option<f64>,
    pub min_revenue_growth: Option<f64>,
    pub min_earnings_growth: Option<f64>,
    pub min_market_cap: Option<f64>,
    pub min_shareholder_yield: Option<f64>,
}

/// Scores are displayed to one decimal; round once, at the source.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl ScreeningCriteria {
    pub fn passes(&self, m: &StockMetrics) -> bool {
        fn below(limit: Option<f64>, value: Option<f64>) -> bool {
            match (limit, value) {
                (Some(max), Some(v)) => v <= max,
                _ => true,
            }
        }
        fn above(limit: Option<f64>, value: Option<f64>) -> bool {
            match (limit, value) {
                (Some(min), Some(v)) => v >= min,
                _ => true,
            }
        }

        below(self.max_per, m.per.filter(|p| *p > 0.0))
            && below(self.max_pbr, m.pbr.filter(|p| *p > 0.0))
            && above(self.min_dividend_yield, m.dividend_yield)
            && above(self.min_roe, m.roe)
            && above(self.min_revenue_growth, m.revenue_growth)
            && above(self.min_earnings_growth, m.eps_growth)
            && above(self.min_market_cap, m.market_cap)
            && above(self.min_shareholder_yield, m.shareholder_yield())
    }
}
