//! Constraint-driven rebalancing proposals.
//!
//! Sells run in strict priority order and each symbol acts at most
//! once: exit alerts first, then deeply negative expected returns,
//! weight-limit trims, correlation-pair trims, and watch-list trims.
//! Buys spend whatever the sells freed plus any fresh cash, ranked by
//! expected return and capped so no position crosses the single-name
//! limit. Amounts respect trading lots; proposals that round to dust
//! are dropped.
//!
//! The plan never spends more than it freed: total buys stay within
//! sell proceeds plus the additional cash.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::{lot_size, PortfolioSnapshot, ValuedPosition};
use crate::error::ConfigError;
use crate::health::{HealthLevel, HealthReport};
use crate::risk::CorrelationMatrix;

use super::profile::RebalanceProfile;

/// Full-sell threshold on the expected return.
const MIN_EXPECTED_RETURN: f64 = -0.10;
/// Trim applied to the weaker member of an over-correlated pair.
const CORRELATION_TRIM_RATIO: f64 = 0.30;
/// Trim applied to watch-listed sectors and currencies.
const WATCHLIST_TRIM_RATIO: f64 = 0.30;
/// Orders below this notional are dropped.
const MIN_ORDER_JPY: f64 = 10_000.0;
const UNKNOWN_GROUP: &str = "不明";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    #[serde(rename = "売り")]
    Sell,
    #[serde(rename = "買い")]
    Buy,
}

impl TradeSide {
    pub fn label(self) -> &'static str {
        match self {
            TradeSide::Sell => "売り",
            TradeSide::Buy => "買い",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One proposed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTrade {
    pub symbol: String,
    pub side: TradeSide,
    pub shares: u64,
    pub amount_jpy: f64,
    /// 1 = exit alert … 5 = watch list; 6 = buy.
    pub priority: u8,
    pub reason: String,
}

/// A stock the holder would buy if the plan frees cash for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyCandidate {
    pub symbol: String,
    /// Per-share price already converted to JPY.
    pub price_jpy: f64,
    pub expected_return: f64,
    pub dividend_yield: Option<f64>,
    pub sector: Option<String>,
    pub currency: Option<String>,
}

/// Everything a planning run reads.
#[derive(Debug, Clone, Copy)]
pub struct RebalanceInputs<'a> {
    pub snapshot: &'a PortfolioSnapshot,
    pub health: &'a [HealthReport],
    /// Expected return per held symbol; missing entries skip the
    /// expected-return sell rule.
    pub expected_returns: &'a HashMap<String, f64>,
    pub correlations: Option<&'a CorrelationMatrix>,
    /// Case-insensitive sector names to reduce.
    pub flagged_sectors: &'a [String],
    /// Case-insensitive currency codes to reduce.
    pub flagged_currencies: &'a [String],
    pub candidates: &'a [BuyCandidate],
    pub additional_cash_jpy: f64,
}

/// The proposal, with enough before/after context to judge it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancePlan {
    pub actions: Vec<PlannedTrade>,
    pub freed_cash_jpy: f64,
    pub invested_jpy: f64,
    pub sector_hhi_before: f64,
    pub sector_hhi_after: f64,
    pub currency_hhi_before: f64,
    pub currency_hhi_after: f64,
    /// Limits the plan could not satisfy with the allowed actions.
    pub unmet_constraints: Vec<String>,
    pub notes: Vec<String>,
}

impl RebalancePlan {
    fn empty() -> Self {
        Self {
            actions: Vec::new(),
            freed_cash_jpy: 0.0,
            invested_jpy: 0.0,
            sector_hhi_before: 0.0,
            sector_hhi_after: 0.0,
            currency_hhi_before: 0.0,
            currency_hhi_after: 0.0,
            unmet_constraints: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Builds plans against a validated profile.
#[derive(Debug, Clone)]
pub struct RebalancePlanner {
    profile: RebalanceProfile,
}

struct AfterRow {
    value: f64,
    sector: Option<String>,
    currency: String,
}

impl RebalancePlanner {
    pub fn new(profile: RebalanceProfile) -> Result<Self, ConfigError> {
        profile.validate()?;
        Ok(Self { profile })
    }

    pub fn profile(&self) -> &RebalanceProfile {
        &self.profile
    }

    pub fn plan(&self, inputs: &RebalanceInputs) -> RebalancePlan {
        let snapshot = inputs.snapshot;
        if snapshot.is_empty() {
            let mut plan = RebalancePlan::empty();
            plan.notes.push("ポートフォリオが空のため計画なし".to_string());
            return plan;
        }

        let mut actions: Vec<PlannedTrade> = Vec::new();
        let mut acted: HashSet<String> = HashSet::new();
        let mut sold_jpy: HashMap<String, f64> = HashMap::new();

        let push_sell =
            |actions: &mut Vec<PlannedTrade>,
             acted: &mut HashSet<String>,
             sold_jpy: &mut HashMap<String, f64>,
             pos: &ValuedPosition,
             shares: u64,
             priority: u8,
             reason: String| {
                if shares == 0 || pos.shares == 0 {
                    return;
                }
                let amount = shares as f64 * (pos.value_jpy / pos.shares as f64);
                actions.push(PlannedTrade {
                    symbol: pos.symbol.clone(),
                    side: TradeSide::Sell,
                    shares,
                    amount_jpy: amount,
                    priority,
                    reason,
                });
                acted.insert(pos.symbol.clone());
                *sold_jpy.entry(pos.symbol.clone()).or_default() += amount;
            };

        // 1. Exit alerts close the whole position.
        for report in inputs.health {
            if report.level != HealthLevel::Exit {
                continue;
            }
            let Some(pos) = snapshot.position(&report.symbol).filter(|p| !p.is_cash) else {
                continue;
            };
            if acted.contains(&pos.symbol) {
                continue;
            }
            push_sell(
                &mut actions,
                &mut acted,
                &mut sold_jpy,
                pos,
                pos.shares,
                1,
                "撤退アラート".to_string(),
            );
        }

        // 2. Deeply negative expected return closes the position too.
        for pos in snapshot.equities() {
            if acted.contains(&pos.symbol) {
                continue;
            }
            let Some(&er) = inputs.expected_returns.get(&pos.symbol) else {
                continue;
            };
            if er < MIN_EXPECTED_RETURN {
                push_sell(
                    &mut actions,
                    &mut acted,
                    &mut sold_jpy,
                    pos,
                    pos.shares,
                    2,
                    format!(
                        "期待リターン {:+.1}% が下限 {:+.0}% を下回り",
                        er * 100.0,
                        MIN_EXPECTED_RETURN * 100.0
                    ),
                );
            }
        }

        // 3. Trim overweight names back to the single-position limit.
        let max_weight = self.profile.max_single_weight;
        for pos in snapshot.equities() {
            if acted.contains(&pos.symbol) || pos.weight <= max_weight {
                continue;
            }
            let ratio = 1.0 - max_weight / pos.weight;
            let shares = trim_shares(pos.shares, ratio, lot_size(&pos.symbol));
            push_sell(
                &mut actions,
                &mut acted,
                &mut sold_jpy,
                pos,
                shares,
                3,
                format!(
                    "組入比率 {:.1}% が上限 {:.1}% を超過",
                    pos.weight * 100.0,
                    max_weight * 100.0
                ),
            );
        }

        // 4. Over-correlated pairs: trim the member with the weaker
        //    expected return. No estimate counts as weaker.
        if let Some(matrix) = inputs.correlations {
            let threshold = self.profile.max_pair_correlation;
            for pair in matrix.high_pairs(threshold) {
                if pair.rho.abs() <= threshold {
                    continue;
                }
                let (Some(a), Some(b)) = (
                    snapshot.position(&pair.a).filter(|p| !p.is_cash),
                    snapshot.position(&pair.b).filter(|p| !p.is_cash),
                ) else {
                    continue;
                };
                let er = |s: &str| {
                    inputs
                        .expected_returns
                        .get(s)
                        .copied()
                        .unwrap_or(f64::NEG_INFINITY)
                };
                let weaker = if er(&a.symbol) <= er(&b.symbol) { a } else { b };
                let other = if weaker.symbol == a.symbol { b } else { a };
                if acted.contains(&weaker.symbol) {
                    continue;
                }
                let shares = trim_shares(
                    weaker.shares,
                    CORRELATION_TRIM_RATIO,
                    lot_size(&weaker.symbol),
                );
                push_sell(
                    &mut actions,
                    &mut acted,
                    &mut sold_jpy,
                    weaker,
                    shares,
                    4,
                    format!(
                        "{} との相関 {:.2} が上限 {:.2} を超過",
                        other.symbol, pair.rho, threshold
                    ),
                );
            }
        }

        // 5. Watch-listed sectors and currencies.
        for pos in snapshot.equities() {
            if acted.contains(&pos.symbol) {
                continue;
            }
            let sector_hit = pos.sector.as_deref().and_then(|s| {
                inputs
                    .flagged_sectors
                    .iter()
                    .find(|f| f.eq_ignore_ascii_case(s))
                    .map(|_| s.to_string())
            });
            let currency_hit = inputs
                .flagged_currencies
                .iter()
                .any(|f| f.eq_ignore_ascii_case(&pos.currency));
            let reason = if let Some(sector) = sector_hit {
                format!("警戒セクター: {}", sector)
            } else if currency_hit {
                format!("警戒通貨: {}", pos.currency)
            } else {
                continue;
            };
            let shares = trim_shares(pos.shares, WATCHLIST_TRIM_RATIO, lot_size(&pos.symbol));
            push_sell(&mut actions, &mut acted, &mut sold_jpy, pos, shares, 5, reason);
        }

        let freed_cash_jpy: f64 = sold_jpy.values().sum();

        // Buys: freed cash plus fresh cash, best expected return first.
        let future_total = snapshot.total_value_jpy + inputs.additional_cash_jpy;
        let mut available = freed_cash_jpy + inputs.additional_cash_jpy;
        let mut bought_candidates: HashMap<String, &BuyCandidate> = HashMap::new();
        let mut bought_amounts: HashMap<String, f64> = HashMap::new();

        let mut candidates: Vec<&BuyCandidate> = inputs
            .candidates
            .iter()
            .filter(|c| c.price_jpy > 0.0 && !acted.contains(&c.symbol))
            .filter(|c| match self.profile.min_dividend_yield {
                Some(floor) => c.dividend_yield.is_some_and(|y| y >= floor),
                None => true,
            })
            .collect();
        candidates.sort_by(|a, b| b.expected_return.total_cmp(&a.expected_return));

        for candidate in candidates {
            if available < MIN_ORDER_JPY {
                break;
            }
            let held_value = snapshot
                .position(&candidate.symbol)
                .map(|p| p.value_jpy - sold_jpy.get(&p.symbol).copied().unwrap_or(0.0))
                .unwrap_or(0.0);
            let headroom = max_weight * future_total - held_value;
            let budget = available.min(headroom);
            if budget < MIN_ORDER_JPY {
                continue;
            }
            let lot = lot_size(&candidate.symbol);
            let shares = (budget / candidate.price_jpy) as u64 / lot * lot;
            let amount = shares as f64 * candidate.price_jpy;
            if shares == 0 || amount < MIN_ORDER_JPY {
                continue;
            }
            actions.push(PlannedTrade {
                symbol: candidate.symbol.clone(),
                side: TradeSide::Buy,
                shares,
                amount_jpy: amount,
                priority: 6,
                reason: format!("期待リターン {:+.1}% 上位", candidate.expected_return * 100.0),
            });
            available -= amount;
            bought_candidates.insert(candidate.symbol.clone(), candidate);
            *bought_amounts.entry(candidate.symbol.clone()).or_default() += amount;
        }
        let invested_jpy: f64 = bought_amounts.values().sum();

        // Project the post-trade book for the before/after comparison.
        let mut after: HashMap<String, AfterRow> = snapshot
            .equities()
            .map(|p| {
                (
                    p.symbol.clone(),
                    AfterRow {
                        value: p.value_jpy - sold_jpy.get(&p.symbol).copied().unwrap_or(0.0),
                        sector: p.sector.clone(),
                        currency: p.currency.clone(),
                    },
                )
            })
            .collect();
        for (symbol, amount) in &bought_amounts {
            if let Some(row) = after.get_mut(symbol) {
                row.value += amount;
            } else if let Some(candidate) = bought_candidates.get(symbol) {
                after.insert(
                    symbol.clone(),
                    AfterRow {
                        value: *amount,
                        sector: candidate.sector.clone(),
                        currency: candidate
                            .currency
                            .clone()
                            .unwrap_or_else(|| UNKNOWN_GROUP.to_string()),
                    },
                );
            }
        }

        let sector_hhi_before = axis_hhi(
            snapshot
                .equities()
                .map(|p| (sector_label(p.sector.as_deref()), p.value_jpy)),
        );
        let currency_hhi_before =
            axis_hhi(snapshot.equities().map(|p| (p.currency.clone(), p.value_jpy)));
        let sector_hhi_after = axis_hhi(
            after
                .values()
                .map(|r| (sector_label(r.sector.as_deref()), r.value)),
        );
        let currency_hhi_after = axis_hhi(after.values().map(|r| (r.currency.clone(), r.value)));

        // Flag whatever the allowed actions could not fix.
        let mut unmet_constraints = Vec::new();
        if future_total > 0.0 {
            let mut overweight: Vec<(String, f64)> = after
                .iter()
                .map(|(s, r)| (s.clone(), r.value / future_total))
                .filter(|(_, w)| *w > max_weight + 1e-9)
                .collect();
            overweight.sort_by(|a, b| a.0.cmp(&b.0));
            for (symbol, weight) in overweight {
                unmet_constraints.push(format!(
                    "{} の組入比率 {:.1}% が上限 {:.1}% を上回ったまま",
                    symbol,
                    weight * 100.0,
                    max_weight * 100.0
                ));
            }
        }
        if sector_hhi_after > self.profile.max_axis_hhi {
            unmet_constraints.push(format!(
                "セクターHHI {:.3} が上限 {:.2} を超過",
                sector_hhi_after, self.profile.max_axis_hhi
            ));
        }
        if currency_hhi_after > self.profile.max_axis_hhi {
            unmet_constraints.push(format!(
                "通貨HHI {:.3} が上限 {:.2} を超過",
                currency_hhi_after, self.profile.max_axis_hhi
            ));
        }

        RebalancePlan {
            actions,
            freed_cash_jpy,
            invested_jpy,
            sector_hhi_before,
            sector_hhi_after,
            currency_hhi_before,
            currency_hhi_after,
            unmet_constraints,
            notes: Vec::new(),
        }
    }
}

/// Lot-floored share count for a fractional trim.
fn trim_shares(shares: u64, ratio: f64, lot: u64) -> u64 {
    let target = (shares as f64 * ratio) as u64;
    target / lot * lot
}

fn sector_label(sector: Option<&str>) -> String {
    sector.unwrap_or(UNKNOWN_GROUP).to_string()
}

/// Herfindahl index over (group, value) rows; zero rows are ignored.
fn axis_hhi(rows: impl Iterator<Item = (String, f64)>) -> f64 {
    let mut groups: HashMap<String, f64> = HashMap::new();
    let mut total = 0.0;
    for (label, value) in rows {
        if value > 0.0 {
            *groups.entry(label).or_default() += value;
            total += value;
        }
    }
    if total <= 0.0 {
        return 0.0;
    }
    groups.values().map(|v| (v / total).powi(2)).sum()
}
