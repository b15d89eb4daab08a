//! Batch health assessment over a whole book of holdings.
//!
//! Joins each holding's fundamentals with its price history, feeds the
//! core state machine, and tallies alert levels. Cash rows are skipped —
//! yen does not have a chart. Holdings with no computable quality signal
//! fall back to the technicals-only path inside the engine.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use kabulab_core::domain::{is_cash_symbol, PriceHistory, StockMetrics};
use kabulab_core::health::{detect_value_trap, HealthEngine, HealthInput, HealthLevel, HealthReport};
use kabulab_core::scoring::{AlphaScorer, StabilityReport};
use kabulab_core::signals::evaluate_trend;

/// One holding's inputs for the health pass.
#[derive(Debug, Clone)]
pub struct HoldingData {
    pub metrics: StockMetrics,
    pub history: PriceHistory,
}

/// Every holding's verdict, worst first, plus the level tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub reports: Vec<HealthReport>,
    pub healthy: usize,
    pub early_warning: usize,
    pub caution: usize,
    pub exit: usize,
}

impl HealthSummary {
    /// The most severe report, if any holdings were assessed.
    pub fn worst(&self) -> Option<&HealthReport> {
        self.reports.first()
    }

    /// True when no holding is above `Healthy`.
    pub fn all_clear(&self) -> bool {
        self.early_warning == 0 && self.caution == 0 && self.exit == 0
    }
}

/// Assesses every non-cash holding and tallies the verdicts.
pub fn assess_holdings(holdings: &[HoldingData]) -> HealthSummary {
    let engine = HealthEngine;
    let alpha = AlphaScorer;

    let mut reports: Vec<HealthReport> = holdings
        .par_iter()
        .filter(|h| !is_cash_symbol(&h.metrics.symbol))
        .map(|holding| {
            let technical = evaluate_trend(&holding.history);
            let quality = alpha.score(&holding.metrics).map(|a| a.label);
            let trap = detect_value_trap(&holding.metrics);
            let stability = StabilityReport::from_metrics(&holding.metrics).stability;
            engine.assess(HealthInput {
                technical: &technical,
                quality,
                value_trap: Some(&trap),
                stability: Some(stability),
                is_etf: holding.metrics.is_etf,
            })
        })
        .collect();

    reports.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.symbol.cmp(&b.symbol)));

    let mut summary = HealthSummary {
        reports: Vec::new(),
        healthy: 0,
        early_warning: 0,
        caution: 0,
        exit: 0,
    };
    for report in &reports {
        match report.level {
            HealthLevel::Healthy => summary.healthy += 1,
            HealthLevel::EarlyWarning => summary.early_warning += 1,
            HealthLevel::Caution => summary.caution += 1,
            HealthLevel::Exit => summary.exit += 1,
        }
    }
    summary.reports = reports;
    summary
}
