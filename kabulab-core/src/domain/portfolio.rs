//! Portfolio valuation: positions × quotes × FX → a base-currency snapshot.
//!
//! The snapshot is the shared input of the risk and rebalance analytics.
//! It is built once from its ingredients and never mutated; what-if analysis
//! builds a second snapshot from a merged position list instead.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::position::Position;

/// One market quote as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// Currency → JPY conversion table. JPY itself always converts at 1.0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FxRates {
    rates: HashMap<String, f64>,
}

impl FxRates {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        Self { rates }
    }

    /// JPY per unit of `currency`. Unknown currencies convert at 1.0 so a
    /// missing rate degrades the valuation instead of sinking it; callers
    /// that care can pre-validate.
    pub fn to_jpy(&self, currency: &str) -> f64 {
        if currency == "JPY" {
            return 1.0;
        }
        self.rates.get(currency).copied().unwrap_or(1.0)
    }
}

/// A position enriched with market data and base-currency valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuedPosition {
    pub symbol: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub region: Option<String>,
    /// Market currency (quote currency, or cost currency when unquoted).
    pub currency: String,
    pub shares: u64,
    pub cost_price: f64,
    pub current_price: f64,
    pub value_jpy: f64,
    pub cost_jpy: f64,
    pub unrealized_pnl_jpy: f64,
    /// Unrealized return relative to cost.
    pub pnl_rate: f64,
    /// Share of total portfolio value, 0..=1.
    pub weight: f64,
    pub is_cash: bool,
    /// False when no quote was available and cost was used as the price.
    pub priced: bool,
}

/// Immutable base-currency view of the whole portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub positions: Vec<ValuedPosition>,
    pub total_value_jpy: f64,
    pub total_cost_jpy: f64,
    pub total_pnl_jpy: f64,
}

impl PortfolioSnapshot {
    /// Value `positions` against `quotes` and `fx`.
    ///
    /// Cash rows are valued at cost. Equity rows without a quote fall back to
    /// their cost price and are flagged `priced: false` — a stale-but-usable
    /// valuation beats a hole in the portfolio.
    pub fn build(
        positions: &[Position],
        quotes: &HashMap<String, Quote>,
        fx: &FxRates,
    ) -> Self {
        let mut valued: Vec<ValuedPosition> = positions
            .iter()
            .map(|pos| {
                let quote = quotes.get(&pos.symbol);
                let is_cash = pos.is_cash();

                let (current_price, currency, priced) = if is_cash {
                    (pos.cost_price, pos.cost_currency.clone(), true)
                } else {
                    match quote {
                        Some(q) => (q.price, q.currency.clone(), true),
                        None => (pos.cost_price, pos.cost_currency.clone(), false),
                    }
                };

                let rate = fx.to_jpy(&currency);
                let cost_rate = fx.to_jpy(&pos.cost_currency);
                let value_jpy = pos.shares as f64 * current_price * rate;
                let cost_jpy = pos.shares as f64 * pos.cost_price * cost_rate;
                let unrealized = value_jpy - cost_jpy;

                ValuedPosition {
                    symbol: pos.symbol.clone(),
                    name: quote.and_then(|q| q.name.clone()),
                    sector: quote.and_then(|q| q.sector.clone()),
                    region: quote.and_then(|q| q.region.clone()),
                    currency,
                    shares: pos.shares,
                    cost_price: pos.cost_price,
                    current_price,
                    value_jpy,
                    cost_jpy,
                    unrealized_pnl_jpy: unrealized,
                    pnl_rate: if cost_jpy > 0.0 { unrealized / cost_jpy } else { 0.0 },
                    weight: 0.0,
                    is_cash,
                    priced,
                }
            })
            .collect();

        let total_value: f64 = valued.iter().map(|v| v.value_jpy).sum();
        let total_cost: f64 = valued.iter().map(|v| v.cost_jpy).sum();
        if total_value > 0.0 {
            for v in &mut valued {
                v.weight = v.value_jpy / total_value;
            }
        }

        Self {
            positions: valued,
            total_value_jpy: total_value,
            total_cost_jpy: total_cost,
            total_pnl_jpy: total_value - total_cost,
        }
    }

    /// Non-cash holdings, the analytics universe.
    pub fn equities(&self) -> impl Iterator<Item = &ValuedPosition> {
        self.positions.iter().filter(|p| !p.is_cash)
    }

    /// Total cash value in JPY.
    pub fn cash_jpy(&self) -> f64 {
        self.positions
            .iter()
            .filter(|p| p.is_cash)
            .map(|p| p.value_jpy)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, symbol: &str) -> Option<&ValuedPosition> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn pos(symbol: &str, shares: u64, cost: f64, currency: &str) -> Position {
        Position {
            symbol: symbol.into(),
            shares,
            cost_price: cost,
            cost_currency: currency.into(),
            purchase_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            memo: None,
        }
    }

    fn quote(price: f64, currency: &str, sector: &str) -> Quote {
        Quote {
            price,
            currency: currency.into(),
            name: None,
            sector: Some(sector.into()),
            region: None,
        }
    }

    fn fx_usd(rate: f64) -> FxRates {
        FxRates::new(HashMap::from([("USD".to_string(), rate)]))
    }

    #[test]
    fn weights_sum_to_one() {
        let positions = vec![pos("7203.T", 100, 2000.0, "JPY"), pos("9984.T", 100, 7000.0, "JPY")];
        let quotes = HashMap::from([
            ("7203.T".to_string(), quote(3000.0, "JPY", "Consumer Cyclical")),
            ("9984.T".to_string(), quote(7000.0, "JPY", "Communication Services")),
        ]);
        let snap = PortfolioSnapshot::build(&positions, &quotes, &FxRates::default());
        let sum: f64 = snap.positions.iter().map(|p| p.weight).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((snap.total_value_jpy - 1_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn fx_converts_foreign_positions() {
        let positions = vec![pos("AAPL", 10, 150.0, "USD")];
        let quotes = HashMap::from([("AAPL".to_string(), quote(200.0, "USD", "Technology"))]);
        let snap = PortfolioSnapshot::build(&positions, &quotes, &fx_usd(150.0));
        let p = &snap.positions[0];
        assert!((p.value_jpy - 300_000.0).abs() < 1e-6);
        assert!((p.cost_jpy - 225_000.0).abs() < 1e-6);
        assert!((p.pnl_rate - 75_000.0 / 225_000.0).abs() < 1e-9);
    }

    #[test]
    fn cash_rows_valued_at_cost() {
        let positions = vec![pos("JPY.CASH", 500_000, 1.0, "JPY")];
        let snap = PortfolioSnapshot::build(&positions, &HashMap::new(), &FxRates::default());
        assert!(snap.positions[0].is_cash);
        assert!((snap.cash_jpy() - 500_000.0).abs() < 1e-6);
        assert_eq!(snap.equities().count(), 0);
    }

    #[test]
    fn missing_quote_falls_back_to_cost() {
        let positions = vec![pos("7203.T", 100, 2000.0, "JPY")];
        let snap = PortfolioSnapshot::build(&positions, &HashMap::new(), &FxRates::default());
        let p = &snap.positions[0];
        assert!(!p.priced);
        assert!((p.current_price - 2000.0).abs() < 1e-12);
        assert!((p.unrealized_pnl_jpy).abs() < 1e-9);
    }

    #[test]
    fn empty_portfolio_snapshot() {
        let snap = PortfolioSnapshot::build(&[], &HashMap::new(), &FxRates::default());
        assert!(snap.is_empty());
        assert_eq!(snap.total_value_jpy, 0.0);
    }

    #[test]
    fn snapshot_serialization_roundtrip() {
        let positions = vec![pos("7203.T", 100, 2000.0, "JPY")];
        let quotes =
            HashMap::from([("7203.T".to_string(), quote(2500.0, "JPY", "Consumer Cyclical"))]);
        let snap = PortfolioSnapshot::build(&positions, &quotes, &FxRates::default());
        let json = serde_json::to_string(&snap).unwrap();
        let back: PortfolioSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.positions.len(), 1);
        assert!((back.total_value_jpy - 250_000.0).abs() < 1e-6);
    }
}
