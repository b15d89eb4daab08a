//! Position ledger: holdings, cost-basis maintenance, realized P&L.
//!
//! Buys re-average the cost basis. Partial sells deliberately do NOT: the
//! remaining lot keeps its original average cost, so unrealized P&L on what
//! is still held stays comparable across trims. A position disappears only
//! when its share count reaches zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::metrics::is_cash_symbol;

/// Errors from ledger mutations.
#[derive(Debug, Error)]
pub enum PositionError {
    #[error("no position found for '{symbol}'")]
    NotFound { symbol: String },

    #[error("cannot sell {requested} shares of '{symbol}': only {held} held")]
    Oversell {
        symbol: String,
        held: u64,
        requested: u64,
    },

    #[error("share count must be at least 1")]
    ZeroShares,

    #[error("price must be positive, got {0}")]
    NonPositivePrice(f64),
}

/// One holding in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub shares: u64,
    /// Average acquisition price in `cost_currency`.
    pub cost_price: f64,
    pub cost_currency: String,
    /// Date of the most recent buy.
    pub purchase_date: NaiveDate,
    #[serde(default)]
    pub memo: Option<String>,
}

impl Position {
    /// Cash rows ("JPY.CASH") are valued at cost and skipped by analytics.
    pub fn is_cash(&self) -> bool {
        is_cash_symbol(&self.symbol)
    }

    pub fn cost_value(&self) -> f64 {
        self.shares as f64 * self.cost_price
    }
}

/// Trading lot for a symbol: Tokyo listings trade in 100-share units.
pub fn lot_size(symbol: &str) -> u64 {
    if symbol.ends_with(".T") {
        100
    } else {
        1
    }
}

/// Outcome of a (full or partial) sell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealizedSale {
    pub symbol: String,
    pub shares: u64,
    pub sell_price: f64,
    pub cost_price: f64,
    pub realized_pnl: f64,
    /// Realized return relative to cost.
    pub pnl_rate: f64,
    /// Calendar days between the last buy and the sell.
    pub hold_days: i64,
    /// True when the position was closed entirely.
    pub closed: bool,
}

/// The position ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionBook {
    positions: Vec<Position>,
}

impl PositionBook {
    pub fn new(positions: Vec<Position>) -> Self {
        Self { positions }
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Record a buy. An existing position re-averages its cost basis
    /// (rounded to 4 decimals) and moves its purchase date forward.
    pub fn add(
        &mut self,
        symbol: &str,
        shares: u64,
        price: f64,
        currency: &str,
        date: NaiveDate,
        memo: Option<String>,
    ) -> Result<&Position, PositionError> {
        if shares == 0 {
            return Err(PositionError::ZeroShares);
        }
        if !(price > 0.0) {
            return Err(PositionError::NonPositivePrice(price));
        }

        if let Some(idx) = self.positions.iter().position(|p| p.symbol == symbol) {
            let pos = &mut self.positions[idx];
            let total = pos.shares + shares;
            let blended = (pos.shares as f64 * pos.cost_price + shares as f64 * price)
                / total as f64;
            pos.shares = total;
            pos.cost_price = round4(blended);
            pos.purchase_date = date;
            if memo.is_some() {
                pos.memo = memo;
            }
            Ok(&self.positions[idx])
        } else {
            self.positions.push(Position {
                symbol: symbol.to_string(),
                shares,
                cost_price: price,
                cost_currency: currency.to_string(),
                purchase_date: date,
                memo,
            });
            Ok(self.positions.last().unwrap())
        }
    }

    /// Record a sell. The remaining lot keeps its original cost basis; the
    /// position is removed when its share count reaches zero.
    pub fn sell(
        &mut self,
        symbol: &str,
        shares: u64,
        price: f64,
        date: NaiveDate,
    ) -> Result<RealizedSale, PositionError> {
        if shares == 0 {
            return Err(PositionError::ZeroShares);
        }
        if !(price > 0.0) {
            return Err(PositionError::NonPositivePrice(price));
        }
        let idx = self
            .positions
            .iter()
            .position(|p| p.symbol == symbol)
            .ok_or_else(|| PositionError::NotFound {
                symbol: symbol.to_string(),
            })?;

        let pos = &self.positions[idx];
        if shares > pos.shares {
            return Err(PositionError::Oversell {
                symbol: symbol.to_string(),
                held: pos.shares,
                requested: shares,
            });
        }

        let cost_price = pos.cost_price;
        let realized_pnl = (price - cost_price) * shares as f64;
        let pnl_rate = if cost_price > 0.0 {
            (price - cost_price) / cost_price
        } else {
            0.0
        };
        let hold_days = (date - pos.purchase_date).num_days();

        let remaining = pos.shares - shares;
        let closed = remaining == 0;
        if closed {
            self.positions.remove(idx);
        } else {
            self.positions[idx].shares = remaining;
        }

        Ok(RealizedSale {
            symbol: symbol.to_string(),
            shares,
            sell_price: price,
            cost_price,
            realized_pnl,
            pnl_rate,
            hold_days,
            closed,
        })
    }
}

/// Merge hypothetical additions into an existing position list without
/// touching the original. Colliding symbols get a weighted-average cost.
/// This backs what-if simulations ("what does the portfolio look like if I
/// also buy these").
pub fn merge_positions(existing: &[Position], additions: &[Position]) -> Vec<Position> {
    let mut merged: Vec<Position> = existing.to_vec();
    for add in additions {
        if let Some(pos) = merged.iter_mut().find(|p| p.symbol == add.symbol) {
            let total = pos.shares + add.shares;
            if total > 0 {
                let blended = (pos.shares as f64 * pos.cost_price
                    + add.shares as f64 * add.cost_price)
                    / total as f64;
                pos.cost_price = round4(blended);
            }
            pos.shares = total;
        } else {
            merged.push(add.clone());
        }
    }
    merged
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
