//! Holding-style suitability: is this a stock to hold for years, or one
//! to trade and leave?
//!
//! Four fundamentals are bucketed (ROE, EPS growth, dividend yield, PER)
//! and the buckets drive both a categorical verdict and a small ranking
//! score. Unknown inputs never count for or against — they show up in the
//! summary as データ不足 instead.

use serde::{Deserialize, Serialize};

use crate::domain::{is_cash_symbol, StockMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    High,
    Medium,
    Low,
    Unknown,
}

/// Verdict on holding style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuitabilityVerdict {
    #[serde(rename = "長期向き")]
    LongTerm,
    #[serde(rename = "短期向き")]
    ShortTerm,
    #[serde(rename = "要検討")]
    NeedsReview,
    #[serde(rename = "対象外")]
    NotApplicable,
}

impl SuitabilityVerdict {
    pub fn label(self) -> &'static str {
        match self {
            SuitabilityVerdict::LongTerm => "長期向き",
            SuitabilityVerdict::ShortTerm => "短期向き",
            SuitabilityVerdict::NeedsReview => "要検討",
            SuitabilityVerdict::NotApplicable => "対象外",
        }
    }
}

impl std::fmt::Display for SuitabilityVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Suitability assessment for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityReport {
    pub symbol: String,
    pub verdict: SuitabilityVerdict,
    /// Ranking score, -1..6. Higher reads more long-term-holdable.
    pub score: f64,
    /// Joined trait summary ("高ROE・EPS成長・高配当").
    pub summary: String,
}

/// Buckets the fundamentals and derives the verdict. ETFs and cash rows
/// are out of scope.
pub fn assess_suitability(metrics: &StockMetrics) -> SuitabilityReport {
    if metrics.is_etf || is_cash_symbol(&metrics.symbol) {
        return SuitabilityReport {
            symbol: metrics.symbol.clone(),
            verdict: SuitabilityVerdict::NotApplicable,
            score: 0.0,
            summary: String::new(),
        };
    }

    let roe = match metrics.roe {
        Some(r) if r >= 0.15 => Bucket::High,
        Some(r) if r >= 0.10 => Bucket::Medium,
        Some(_) => Bucket::Low,
        None => Bucket::Unknown,
    };
    let eps = match metrics.eps_growth {
        Some(g) if g >= 0.10 => Bucket::High,
        Some(g) if g >= 0.0 => Bucket::Medium,
        Some(_) => Bucket::Low,
        None => Bucket::Unknown,
    };
    let dividend = match metrics.dividend_yield {
        Some(d) if d >= 0.02 => Bucket::High,
        Some(d) if d > 0.0 => Bucket::Medium,
        Some(_) => Bucket::Low,
        None => Bucket::Unknown,
    };
    // Low here means the dangerous end: PER above 40 is the overvalued
    // bucket.
    let per = match metrics.per.filter(|p| *p > 0.0) {
        Some(p) if p > 40.0 => Bucket::Low,
        Some(p) if p <= 25.0 => Bucket::High,
        Some(_) => Bucket::Medium,
        None => Bucket::Unknown,
    };

    let score = bucket_points(roe, 2.0, 1.0)
        + bucket_points(eps, 2.0, 1.0)
        + bucket_points(dividend, 1.0, 0.5)
        + match per {
            Bucket::High => 1.0,
            Bucket::Low => -1.0,
            _ => 0.0,
        };

    let overvalued = per == Bucket::Low;
    let verdict = if roe == Bucket::High
        && eps == Bucket::High
        && dividend == Bucket::High
        && per == Bucket::High
    {
        SuitabilityVerdict::LongTerm
    } else if overvalued || roe == Bucket::Low {
        SuitabilityVerdict::ShortTerm
    } else {
        SuitabilityVerdict::NeedsReview
    };

    let mut parts = Vec::new();
    match roe {
        Bucket::High => parts.push("高ROE".to_string()),
        Bucket::Low => parts.push("低ROE".to_string()),
        _ => {}
    }
    match eps {
        Bucket::High => parts.push("EPS成長".to_string()),
        Bucket::Low => parts.push("EPS減少".to_string()),
        _ => {}
    }
    if dividend == Bucket::High {
        parts.push("高配当".to_string());
    }
    if overvalued {
        parts.push("割高PER".to_string());
    }
    let missing = [roe, eps, dividend, per]
        .iter()
        .filter(|b| **b == Bucket::Unknown)
        .count();
    if missing > 0 {
        parts.push(format!("データ不足({missing}項目)"));
    }

    SuitabilityReport {
        symbol: metrics.symbol.clone(),
        verdict,
        score,
        summary: parts.join("・"),
    }
}

fn bucket_points(bucket: Bucket, high: f64, medium: f64) -> f64 {
    match bucket {
        Bucket::High => high,
        Bucket::Medium => medium,
        _ => 0.0,
    }
}
