//! Value-trap detection: cheap on multiples, deteriorating underneath.
//!
//! Three patterns, each with its own reason string. A flagged stock is not
//! automatically un-buyable — the health machine raises it to early
//! warning so the deterioration gets looked at before the discount does.

use serde::{Deserialize, Serialize};

use crate::domain::StockMetrics;

const TRAP_PER_EARNINGS: f64 = 8.0;
const TRAP_PER_REVENUE: f64 = 10.0;
const TRAP_REVENUE_DECLINE: f64 = -0.05;
const TRAP_PBR: f64 = 0.8;
const TRAP_ROE: f64 = 0.05;

/// Value-trap flags for one symbol. Empty `reasons` means no trap pattern
/// matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueTrapReport {
    pub symbol: String,
    pub reasons: Vec<String>,
}

impl ValueTrapReport {
    pub fn is_trap(&self) -> bool {
        !self.reasons.is_empty()
    }
}

/// Checks the three trap patterns. Missing metrics skip their pattern;
/// non-positive PER never counts as "low" (loss-makers are a different
/// problem than traps).
pub fn detect_value_trap(metrics: &StockMetrics) -> ValueTrapReport {
    let mut reasons = Vec::new();
    let per = metrics.per.filter(|p| *p > 0.0);

    if let (Some(per), Some(eps)) = (per, metrics.eps_growth) {
        if per < TRAP_PER_EARNINGS && eps < 0.0 {
            reasons.push("低PERだが利益減少中".to_string());
        }
    }
    if let (Some(per), Some(rev)) = (per, metrics.revenue_growth) {
        if per < TRAP_PER_REVENUE && rev <= TRAP_REVENUE_DECLINE {
            reasons.push("低PER+売上減少トレンド".to_string());
        }
    }
    if let (Some(pbr), Some(roe), Some(eps)) = (metrics.pbr, metrics.roe, metrics.eps_growth) {
        if pbr < TRAP_PBR && roe < TRAP_ROE && eps < 0.0 {
            reasons.push("低PBRだがROE低下・利益減少".to_string());
        }
    }

    ValueTrapReport {
        symbol: metrics.symbol.clone(),
        reasons,
    }
}
