//! Expected annual return per scenario.
//!
//! Analyst price targets are the preferred basis: each target over the
//! current price plus the shareholder yield gives one scenario. When
//! targets are missing the price trend stands in — CAGR over the
//! history, spread by one annualized standard deviation either way.
//!
//! An optional [`CatalystSource`] nudges the tails: each known growth
//! catalyst adds 2 points to the optimistic case, each risk catalyst
//! subtracts 2 from the pessimistic case, both capped at 10 points.

use serde::{Deserialize, Serialize};

use crate::domain::{PortfolioSnapshot, PriceHistory, StockMetrics};

use super::PerScenario;

/// Bars required before the price trend is trusted as a basis.
const MIN_HISTORY_BARS: usize = 30;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Per-catalyst adjustment and its cap.
const CATALYST_STEP: f64 = 0.02;
const CATALYST_CAP: f64 = 0.10;

/// Read-only catalyst lookup. Counts, not stories: the estimator only
/// needs how many distinct catalysts are on file for a symbol.
pub trait CatalystSource {
    fn growth_catalysts(&self, symbol: &str) -> usize;
    fn risk_catalysts(&self, symbol: &str) -> usize;
}

/// What the estimate was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateBasis {
    #[serde(rename = "アナリスト目標株価")]
    AnalystTargets,
    #[serde(rename = "株価トレンド")]
    PriceTrend,
}

impl EstimateBasis {
    pub fn label(self) -> &'static str {
        match self {
            EstimateBasis::AnalystTargets => "アナリスト目標株価",
            EstimateBasis::PriceTrend => "株価トレンド",
        }
    }
}

impl std::fmt::Display for EstimateBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Expected annual return for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnEstimate {
    pub symbol: String,
    pub annual_return: PerScenario<f64>,
    pub basis: EstimateBasis,
    /// Shareholder yield folded into every scenario.
    pub shareholder_yield: f64,
    pub growth_catalysts: usize,
    pub risk_catalysts: usize,
}

/// Derives per-scenario annual returns from metrics and history.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnEstimator;

impl ReturnEstimator {
    /// `None` when neither analyst targets nor a usable price history
    /// exist.
    pub fn estimate(
        &self,
        metrics: &StockMetrics,
        history: Option<&PriceHistory>,
        catalysts: Option<&dyn CatalystSource>,
    ) -> Option<ReturnEstimate> {
        let m = metrics.clone().normalized();
        let shareholder_yield = m.shareholder_yield().unwrap_or(0.0);

        let (mut annual_return, basis) = match target_based(&m, shareholder_yield) {
            Some(scenarios) => (scenarios, EstimateBasis::AnalystTargets),
            None => (
                trend_based(history?, shareholder_yield)?,
                EstimateBasis::PriceTrend,
            ),
        };

        let mut growth = 0;
        let mut risk = 0;
        if let Some(source) = catalysts {
            growth = source.growth_catalysts(&m.symbol);
            risk = source.risk_catalysts(&m.symbol);
            annual_return.optimistic += (growth as f64 * CATALYST_STEP).min(CATALYST_CAP);
            annual_return.pessimistic -= (risk as f64 * CATALYST_STEP).min(CATALYST_CAP);
        }

        Some(ReturnEstimate {
            symbol: m.symbol,
            annual_return,
            basis,
            shareholder_yield,
            growth_catalysts: growth,
            risk_catalysts: risk,
        })
    }
}

fn target_based(m: &StockMetrics, shareholder_yield: f64) -> Option<PerScenario<f64>> {
    let price = m.price.filter(|p| p.is_finite() && *p > 0.0)?;
    let usable = |t: Option<f64>| t.filter(|v| v.is_finite() && *v > 0.0);
    let high = usable(m.target_high)?;
    let median = usable(m.target_median)?;
    let low = usable(m.target_low)?;
    Some(PerScenario::new(
        high / price - 1.0 + shareholder_yield,
        median / price - 1.0 + shareholder_yield,
        low / price - 1.0 + shareholder_yield,
    ))
}

fn trend_based(history: &PriceHistory, shareholder_yield: f64) -> Option<PerScenario<f64>> {
    let closes = history.closes();
    if closes.len() < MIN_HISTORY_BARS {
        return None;
    }
    let first = *closes.first()?;
    let last = *closes.last()?;
    if first <= 0.0 || last <= 0.0 {
        return None;
    }
    let years = closes.len() as f64 / TRADING_DAYS_PER_YEAR;
    let cagr = (last / first).powf(1.0 / years) - 1.0;

    let returns: Vec<f64> = history.daily_returns().into_iter().map(|(_, r)| r).collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let annual_vol = variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt();

    Some(PerScenario::new(
        cagr + annual_vol + shareholder_yield,
        cagr + shareholder_yield,
        cagr - annual_vol + shareholder_yield,
    ))
}

/// Value-weighted blend over held equities with an estimate. `None`
/// when no held symbol has one.
pub fn portfolio_estimate(
    estimates: &[ReturnEstimate],
    snapshot: &PortfolioSnapshot,
) -> Option<PerScenario<f64>> {
    let mut acc = PerScenario::splat(0.0);
    let mut weight = 0.0;
    for pos in snapshot.equities() {
        let Some(est) = estimates.iter().find(|e| e.symbol == pos.symbol) else {
            continue;
        };
        acc.optimistic += est.annual_return.optimistic * pos.value_jpy;
        acc.base += est.annual_return.base * pos.value_jpy;
        acc.pessimistic += est.annual_return.pessimistic * pos.value_jpy;
        weight += pos.value_jpy;
    }
    (weight > 0.0).then(|| acc.map(|v| v / weight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::{DailyBar, ValuedPosition};

    fn history(closes: &[f64]) -> PriceHistory {
        let start = NaiveDate::from_ymd_opt(2023, 1, 4).unwrap();
        PriceHistory {
            symbol: "7203.T".to_string(),
            bars: closes
                .iter()
                .enumerate()
                .map(|(i, c)| DailyBar {
                    date: start + chrono::Days::new(i as u64),
                    close: *c,
                    volume: 10_000,
                })
                .collect(),
        }
    }

    fn with_targets() -> StockMetrics {
        StockMetrics {
            symbol: "7203.T".to_string(),
            price: Some(1000.0),
            target_high: Some(1300.0),
            target_median: Some(1100.0),
            target_low: Some(900.0),
            dividend_yield: Some(0.02),
            buyback_yield: Some(0.01),
            ..Default::default()
        }
    }

    struct StaticCatalysts {
        growth: usize,
        risk: usize,
    }

    impl CatalystSource for StaticCatalysts {
        fn growth_catalysts(&self, _symbol: &str) -> usize {
            self.growth
        }

        fn risk_catalysts(&self, _symbol: &str) -> usize {
            self.risk
        }
    }

    #[test]
    fn analyst_targets_drive_the_scenarios() {
        let est = ReturnEstimator
            .estimate(&with_targets(), None, None)
            .unwrap();
        assert_eq!(est.basis, EstimateBasis::AnalystTargets);
        // Target return plus the 3% shareholder yield.
        assert!((est.annual_return.optimistic - 0.33).abs() < 1e-9);
        assert!((est.annual_return.base - 0.13).abs() < 1e-9);
        assert!((est.annual_return.pessimistic - (-0.07)).abs() < 1e-9);
        assert!((est.shareholder_yield - 0.03).abs() < 1e-12);
    }

    #[test]
    fn steady_trend_collapses_the_spread() {
        // Two years of perfectly geometric growth from 100 to 121:
        // CAGR is exactly 10% and the volatility spread vanishes.
        let closes: Vec<f64> = (0..504)
            .map(|i| 100.0 * 1.21_f64.powf(i as f64 / 503.0))
            .collect();
        let metrics = StockMetrics {
            symbol: "7203.T".to_string(),
            ..Default::default()
        };
        let est = ReturnEstimator
            .estimate(&metrics, Some(&history(&closes)), None)
            .unwrap();
        assert_eq!(est.basis, EstimateBasis::PriceTrend);
        assert!((est.annual_return.base - 0.10).abs() < 1e-9);
        assert!((est.annual_return.optimistic - est.annual_return.base).abs() < 1e-9);
        assert!((est.annual_return.pessimistic - est.annual_return.base).abs() < 1e-9);
    }

    #[test]
    fn choppy_trend_spreads_the_scenarios() {
        let mut closes = vec![100.0];
        for i in 0..59 {
            let r = if i % 2 == 0 { 0.02 } else { -0.01 };
            closes.push(closes.last().unwrap() * (1.0 + r));
        }
        let metrics = StockMetrics {
            symbol: "7203.T".to_string(),
            ..Default::default()
        };
        let est = ReturnEstimator
            .estimate(&metrics, Some(&history(&closes)), None)
            .unwrap();
        assert!(est.annual_return.optimistic > est.annual_return.base);
        assert!(est.annual_return.base > est.annual_return.pessimistic);
    }

    #[test]
    fn catalysts_nudge_the_tails_with_a_cap() {
        let source = StaticCatalysts { growth: 10, risk: 2 };
        let est = ReturnEstimator
            .estimate(&with_targets(), None, Some(&source))
            .unwrap();
        // Ten growth catalysts cap at +10 points; two risks take -4.
        assert!((est.annual_return.optimistic - 0.43).abs() < 1e-9);
        assert!((est.annual_return.base - 0.13).abs() < 1e-9);
        assert!((est.annual_return.pessimistic - (-0.11)).abs() < 1e-9);
        assert_eq!(est.growth_catalysts, 10);
        assert_eq!(est.risk_catalysts, 2);
    }

    #[test]
    fn no_basis_no_estimate() {
        let bare = StockMetrics {
            symbol: "X".to_string(),
            ..Default::default()
        };
        assert!(ReturnEstimator.estimate(&bare, None, None).is_none());
        // A ten-bar history is not a trend.
        let short = history(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 106.0, 107.0, 108.0, 109.0]);
        assert!(ReturnEstimator.estimate(&bare, Some(&short), None).is_none());
    }

    fn valued(symbol: &str, value_jpy: f64) -> ValuedPosition {
        ValuedPosition {
            symbol: symbol.to_string(),
            name: None,
            sector: None,
            region: None,
            currency: "JPY".to_string(),
            shares: 100,
            cost_price: 0.0,
            current_price: 0.0,
            value_jpy,
            cost_jpy: value_jpy,
            unrealized_pnl_jpy: 0.0,
            pnl_rate: 0.0,
            weight: 0.0,
            is_cash: false,
            priced: true,
        }
    }

    fn estimate_of(symbol: &str, scenarios: PerScenario<f64>) -> ReturnEstimate {
        ReturnEstimate {
            symbol: symbol.to_string(),
            annual_return: scenarios,
            basis: EstimateBasis::AnalystTargets,
            shareholder_yield: 0.0,
            growth_catalysts: 0,
            risk_catalysts: 0,
        }
    }

    #[test]
    fn portfolio_estimate_blends_by_value() {
        let snapshot = PortfolioSnapshot {
            positions: vec![valued("7203.T", 3_000_000.0), valued("AAPL", 1_000_000.0)],
            total_value_jpy: 4_000_000.0,
            total_cost_jpy: 4_000_000.0,
            total_pnl_jpy: 0.0,
        };
        let estimates = vec![
            estimate_of("7203.T", PerScenario::new(0.2, 0.1, 0.0)),
            estimate_of("AAPL", PerScenario::new(0.3, 0.2, 0.1)),
        ];
        let blended = portfolio_estimate(&estimates, &snapshot).unwrap();
        assert!((blended.optimistic - 0.225).abs() < 1e-9);
        assert!((blended.base - 0.125).abs() < 1e-9);
        assert!((blended.pessimistic - 0.025).abs() < 1e-9);
    }

    #[test]
    fn portfolio_estimate_needs_at_least_one_match() {
        let snapshot = PortfolioSnapshot {
            positions: vec![valued("7203.T", 3_000_000.0)],
            total_value_jpy: 3_000_000.0,
            total_cost_jpy: 3_000_000.0,
            total_pnl_jpy: 0.0,
        };
        let estimates = vec![estimate_of("MSFT", PerScenario::splat(0.1))];
        assert!(portfolio_estimate(&estimates, &snapshot).is_none());
    }
}
