//! StockMetrics — the per-symbol fundamental snapshot every scorer consumes.
//!
//! All yield/ratio fields are stored as fractions (0.04 = 4%). Upstream
//! providers disagree on units, so `normalized()` is the single place where
//! percent-style inputs get folded back into fractions. History vectors are
//! ordered latest-first, matching how financial statements arrive.

use serde::{Deserialize, Serialize};

/// Revenue-growth values beyond this magnitude are assumed to be percentages.
const GROWTH_PERCENT_CUTOFF: f64 = 5.0;

/// Point-in-time fundamentals for one symbol.
///
/// Every field except `symbol` is optional: providers return partial data
/// constantly, and the scorers degrade per-axis rather than reject the whole
/// record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockMetrics {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    /// Region label ("Japan", "US", ...). Inferred from the ticker suffix
    /// when absent.
    #[serde(default)]
    pub region: Option<String>,
    /// Trading currency ("JPY", "USD", ...).
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    /// Trailing price-to-earnings ratio.
    #[serde(default)]
    pub per: Option<f64>,
    /// Price-to-book ratio.
    #[serde(default)]
    pub pbr: Option<f64>,
    /// Dividend yield as a fraction.
    #[serde(default)]
    pub dividend_yield: Option<f64>,
    /// Buyback yield as a fraction.
    #[serde(default)]
    pub buyback_yield: Option<f64>,
    /// Return on equity as a fraction.
    #[serde(default)]
    pub roe: Option<f64>,
    /// Return on assets as a fraction.
    #[serde(default)]
    pub roa: Option<f64>,
    /// Year-over-year revenue growth as a fraction.
    #[serde(default)]
    pub revenue_growth: Option<f64>,
    /// Year-over-year EPS growth as a fraction.
    #[serde(default)]
    pub eps_growth: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    /// Analyst price targets.
    #[serde(default)]
    pub target_high: Option<f64>,
    #[serde(default)]
    pub target_median: Option<f64>,
    #[serde(default)]
    pub target_low: Option<f64>,
    /// Free cash flow, current and prior period.
    #[serde(default)]
    pub free_cash_flow: Option<f64>,
    #[serde(default)]
    pub free_cash_flow_prior: Option<f64>,
    /// Net income, current and prior period.
    #[serde(default)]
    pub net_income: Option<f64>,
    #[serde(default)]
    pub net_income_prior: Option<f64>,
    #[serde(default)]
    pub operating_cash_flow: Option<f64>,
    #[serde(default)]
    pub total_assets: Option<f64>,
    /// Annual revenue history, latest first.
    #[serde(default)]
    pub revenue_history: Vec<f64>,
    /// Annual net-income history, latest first.
    #[serde(default)]
    pub net_income_history: Vec<f64>,
    /// Shareholder-equity history, latest first.
    #[serde(default)]
    pub equity_history: Vec<f64>,
    /// Cash paid out as dividends per period, latest first.
    #[serde(default)]
    pub dividend_paid_history: Vec<f64>,
    /// Cash spent on buybacks per period, latest first.
    #[serde(default)]
    pub buyback_history: Vec<f64>,
    #[serde(default)]
    pub is_etf: bool,
}

impl StockMetrics {
    /// Fold percent-style inputs back into fractions.
    ///
    /// Yields and ROE/ROA above 1.0 are unambiguously percentages (a 150%
    /// dividend yield does not exist; 1.5 meaning 1.5% does). Growth rates get
    /// a wider cutoff because +300% earnings recoveries are real.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.dividend_yield,
            &mut self.buyback_yield,
            &mut self.roe,
            &mut self.roa,
        ] {
            if let Some(v) = field {
                if *v > 1.0 {
                    *v /= 100.0;
                }
            }
        }
        for field in [&mut self.revenue_growth, &mut self.eps_growth] {
            if let Some(v) = field {
                if v.abs() > GROWTH_PERCENT_CUTOFF {
                    *v /= 100.0;
                }
            }
        }
        self
    }

    /// Combined dividend + buyback yield, as a fraction.
    ///
    /// Buyback data is sparse; a missing buyback yield degrades to dividend
    /// alone rather than dropping the whole figure. Returns `None` only when
    /// neither component is known.
    pub fn shareholder_yield(&self) -> Option<f64> {
        match (self.dividend_yield, self.buyback_yield) {
            (None, None) => None,
            (d, b) => Some(d.unwrap_or(0.0) + b.unwrap_or(0.0)),
        }
    }

    /// Per-period shareholder-return yield history, latest first.
    ///
    /// (|dividends paid| + |buybacks|) / market cap for each period both
    /// histories cover. Statement cash flows are reported as negative
    /// outflows, hence the absolute values. Empty when market cap is missing.
    pub fn shareholder_yield_history(&self) -> Vec<f64> {
        let Some(cap) = self.market_cap.filter(|c| *c > 0.0) else {
            return Vec::new();
        };
        let periods = self.dividend_paid_history.len().max(self.buyback_history.len());
        (0..periods)
            .map(|i| {
                let div = self.dividend_paid_history.get(i).copied().unwrap_or(0.0);
                let bb = self.buyback_history.get(i).copied().unwrap_or(0.0);
                (div.abs() + bb.abs()) / cap
            })
            .collect()
    }
}

/// Cash rows travel through position files as pseudo-symbols ("JPY.CASH").
/// They are valued at cost and skipped by every analytic.
pub fn is_cash_symbol(symbol: &str) -> bool {
    symbol.ends_with(".CASH")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> StockMetrics {
        StockMetrics {
            symbol: "7203.T".into(),
            ..Default::default()
        }
    }

    #[test]
    fn normalizes_percent_style_yields() {
        let mut m = base();
        m.dividend_yield = Some(3.2);
        m.roe = Some(12.0);
        let m = m.normalized();
        assert!((m.dividend_yield.unwrap() - 0.032).abs() < 1e-12);
        assert!((m.roe.unwrap() - 0.12).abs() < 1e-12);
    }

    #[test]
    fn fraction_inputs_pass_through() {
        let mut m = base();
        m.dividend_yield = Some(0.032);
        m.revenue_growth = Some(0.08);
        let m = m.normalized();
        assert!((m.dividend_yield.unwrap() - 0.032).abs() < 1e-12);
        assert!((m.revenue_growth.unwrap() - 0.08).abs() < 1e-12);
    }

    #[test]
    fn growth_cutoff_tolerates_large_recoveries() {
        let mut m = base();
        // +300% recovery stays a fraction; 42 is clearly a percent input.
        m.eps_growth = Some(3.0);
        m.revenue_growth = Some(42.0);
        let m = m.normalized();
        assert!((m.eps_growth.unwrap() - 3.0).abs() < 1e-12);
        assert!((m.revenue_growth.unwrap() - 0.42).abs() < 1e-12);
    }

    #[test]
    fn shareholder_yield_degrades_to_dividend() {
        let mut m = base();
        m.dividend_yield = Some(0.03);
        assert!((m.shareholder_yield().unwrap() - 0.03).abs() < 1e-12);
        m.buyback_yield = Some(0.01);
        assert!((m.shareholder_yield().unwrap() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn shareholder_yield_none_when_both_missing() {
        assert!(base().shareholder_yield().is_none());
    }

    #[test]
    fn yield_history_combines_dividends_and_buybacks() {
        let mut m = base();
        m.market_cap = Some(1_000_000.0);
        m.dividend_paid_history = vec![-30_000.0, -28_000.0];
        m.buyback_history = vec![-10_000.0];
        let h = m.shareholder_yield_history();
        assert_eq!(h.len(), 2);
        assert!((h[0] - 0.04).abs() < 1e-12);
        assert!((h[1] - 0.028).abs() < 1e-12);
    }

    #[test]
    fn yield_history_empty_without_market_cap() {
        let mut m = base();
        m.dividend_paid_history = vec![-30_000.0];
        assert!(m.shareholder_yield_history().is_empty());
    }

    #[test]
    fn cash_symbols_detected() {
        assert!(is_cash_symbol("JPY.CASH"));
        assert!(is_cash_symbol("USD.CASH"));
        assert!(!is_cash_symbol("7203.T"));
    }

    #[test]
    fn metrics_serialization_roundtrip() {
        let mut m = base();
        m.per = Some(12.5);
        m.revenue_history = vec![120.0, 110.0, 100.0];
        let json = serde_json::to_string(&m).unwrap();
        let back: StockMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.symbol, "7203.T");
        assert_eq!(back.per, Some(12.5));
        assert_eq!(back.revenue_history.len(), 3);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let back: StockMetrics = serde_json::from_str(r#"{"symbol":"AAPL"}"#).unwrap();
        assert_eq!(back.symbol, "AAPL");
        assert!(back.per.is_none());
        assert!(back.revenue_history.is_empty());
        assert!(!back.is_etf);
    }
}
