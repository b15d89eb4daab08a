//! Concentration analysis: Herfindahl-Hirschman index per grouping axis.
//!
//! Cash rows are excluded and the remaining weights renormalized — a
//! portfolio that is 60% cash and 40% one stock is still fully
//! concentrated in that stock. The worst axis supplies a shock
//! multiplier for the scenario engine: 1.0 below HHI 0.25, rising
//! linearly to a 1.6x cap.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::PortfolioSnapshot;
use crate::error::ConfigError;

/// Group label when a position carries no sector/region metadata.
const UNKNOWN_GROUP: &str = "不明";

/// Grouping axes, one HHI each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcentrationAxis {
    #[serde(rename = "セクター")]
    Sector,
    #[serde(rename = "地域")]
    Region,
    #[serde(rename = "通貨")]
    Currency,
}

impl ConcentrationAxis {
    pub fn label(self) -> &'static str {
        match self {
            ConcentrationAxis::Sector => "セクター",
            ConcentrationAxis::Region => "地域",
            ConcentrationAxis::Currency => "通貨",
        }
    }
}

/// HHI bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConcentrationLevel {
    #[serde(rename = "分散")]
    Low,
    #[serde(rename = "やや集中")]
    Moderate,
    #[serde(rename = "集中")]
    High,
    #[serde(rename = "過度集中")]
    Concentrated,
}

/// HHI bands separating the four levels. The defaults match common
/// antitrust practice scaled to portfolio weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationThresholds {
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
}

impl Default for ConcentrationThresholds {
    fn default() -> Self {
        Self { low: 0.15, moderate: 0.25, high: 0.40 }
    }
}

impl ConcentrationThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for bound in [self.low, self.moderate, self.high] {
            if !(bound > 0.0 && bound <= 1.0) {
                return Err(ConfigError::InvalidHhiLimit(bound));
            }
        }
        if !(self.low < self.moderate && self.moderate < self.high) {
            return Err(ConfigError::UnorderedThresholds {
                low: self.low,
                moderate: self.moderate,
                high: self.high,
            });
        }
        Ok(())
    }

    /// Band boundaries are inclusive: an equal-weight 4-position book
    /// (HHI exactly 0.25) is Moderate, not High.
    pub fn level_for(&self, hhi: f64) -> ConcentrationLevel {
        if hhi <= self.low {
            ConcentrationLevel::Low
        } else if hhi <= self.moderate {
            ConcentrationLevel::Moderate
        } else if hhi <= self.high {
            ConcentrationLevel::High
        } else {
            ConcentrationLevel::Concentrated
        }
    }
}

impl ConcentrationLevel {
    pub fn from_hhi(hhi: f64) -> Self {
        ConcentrationThresholds::default().level_for(hhi)
    }

    pub fn label(self) -> &'static str {
        match self {
            ConcentrationLevel::Low => "分散",
            ConcentrationLevel::Moderate => "やや集中",
            ConcentrationLevel::High => "集中",
            ConcentrationLevel::Concentrated => "過度集中",
        }
    }
}

/// One group's share of the (cash-excluded) portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupWeight {
    pub label: String,
    pub weight: f64,
}

/// HHI result for a single axis, groups sorted heaviest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConcentration {
    pub axis: ConcentrationAxis,
    pub hhi: f64,
    pub level: ConcentrationLevel,
    pub groups: Vec<GroupWeight>,
}

/// Concentration across all three axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationReport {
    pub sector: AxisConcentration,
    pub region: AxisConcentration,
    pub currency: AxisConcentration,
}

impl ConcentrationReport {
    pub fn axes(&self) -> [&AxisConcentration; 3] {
        [&self.sector, &self.region, &self.currency]
    }

    /// The axis with the highest HHI.
    pub fn worst_axis(&self) -> &AxisConcentration {
        self.axes()
            .into_iter()
            .max_by(|a, b| a.hhi.total_cmp(&b.hhi))
            .unwrap_or(&self.sector)
    }

    /// Shock multiplier from the worst axis.
    pub fn shock_multiplier(&self) -> f64 {
        hhi_multiplier(self.worst_axis().hhi)
    }
}

/// Computes all three axes for a snapshot. Empty (or all-cash)
/// portfolios report HHI 0 on every axis.
pub fn analyze_concentration(snapshot: &PortfolioSnapshot) -> ConcentrationReport {
    analyze_concentration_with(snapshot, &ConcentrationThresholds::default())
}

/// Same analysis with caller-supplied level bands.
pub fn analyze_concentration_with(
    snapshot: &PortfolioSnapshot,
    thresholds: &ConcentrationThresholds,
) -> ConcentrationReport {
    ConcentrationReport {
        sector: analyze_axis(snapshot, ConcentrationAxis::Sector, thresholds),
        region: analyze_axis(snapshot, ConcentrationAxis::Region, thresholds),
        currency: analyze_axis(snapshot, ConcentrationAxis::Currency, thresholds),
    }
}

fn analyze_axis(
    snapshot: &PortfolioSnapshot,
    axis: ConcentrationAxis,
    thresholds: &ConcentrationThresholds,
) -> AxisConcentration {
    let mut values: HashMap<String, f64> = HashMap::new();
    let mut total = 0.0;
    for p in snapshot.equities() {
        let label = match axis {
            ConcentrationAxis::Sector => p.sector.clone(),
            ConcentrationAxis::Region => p.region.clone(),
            ConcentrationAxis::Currency => Some(p.currency.clone()),
        }
        .unwrap_or_else(|| UNKNOWN_GROUP.to_string());
        *values.entry(label).or_insert(0.0) += p.value_jpy;
        total += p.value_jpy;
    }

    let mut groups: Vec<GroupWeight> = if total > 0.0 {
        values
            .into_iter()
            .map(|(label, v)| GroupWeight {
                label,
                weight: v / total,
            })
            .collect()
    } else {
        Vec::new()
    };
    groups.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.label.cmp(&b.label)));

    let hhi = groups.iter().map(|g| g.weight * g.weight).sum();
    AxisConcentration {
        axis,
        hhi,
        level: thresholds.level_for(hhi),
        groups,
    }
}

/// HHI → scenario shock multiplier. Flat at 1.0 until 0.25, then two
/// linear ramps to the 1.6 cap.
pub fn hhi_multiplier(hhi: f64) -> f64 {
    if hhi < 0.25 {
        1.0
    } else if hhi < 0.50 {
        1.0 + (hhi - 0.25) / 0.25 * 0.3
    } else {
        (1.3 + (hhi - 0.50) / 0.50 * 0.3).min(1.6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValuedPosition;

    fn position(symbol: &str, sector: Option<&str>, currency: &str, value: f64) -> ValuedPosition {
        ValuedPosition {
            symbol: symbol.into(),
            name: None,
            sector: sector.map(Into::into),
            region: Some(if currency == "JPY" { "Japan" } else { "US" }.into()),
            currency: currency.into(),
            shares: 100,
            cost_price: 1.0,
            current_price: 1.0,
            value_jpy: value,
            cost_jpy: value,
            unrealized_pnl_jpy: 0.0,
            pnl_rate: 0.0,
            weight: 0.0,
            is_cash: false,
            priced: true,
        }
    }

    fn snapshot(positions: Vec<ValuedPosition>) -> PortfolioSnapshot {
        let total = positions.iter().map(|p| p.value_jpy).sum();
        PortfolioSnapshot {
            positions,
            total_value_jpy: total,
            total_cost_jpy: total,
            total_pnl_jpy: 0.0,
        }
    }

    #[test]
    fn equal_weights_give_one_over_n() {
        let snap = snapshot(vec![
            position("A", Some("Technology"), "JPY", 100.0),
            position("B", Some("Financial Services"), "JPY", 100.0),
            position("C", Some("Energy"), "JPY", 100.0),
            position("D", Some("Utilities"), "JPY", 100.0),
        ]);
        let report = analyze_concentration(&snap);
        assert!((report.sector.hhi - 0.25).abs() < 1e-12);
        assert_eq!(report.sector.level, ConcentrationLevel::Moderate);
        // All JPY: single currency group, HHI 1.
        assert!((report.currency.hhi - 1.0).abs() < 1e-12);
        assert_eq!(report.currency.level, ConcentrationLevel::Concentrated);
    }

    #[test]
    fn cash_is_excluded_and_weights_renormalized() {
        let mut cash = position("JPY.CASH", None, "JPY", 600.0);
        cash.is_cash = true;
        let snap = snapshot(vec![
            cash,
            position("A", Some("Technology"), "JPY", 400.0),
        ]);
        let report = analyze_concentration(&snap);
        // The one equity is 100% of the analyzed book.
        assert!((report.sector.hhi - 1.0).abs() < 1e-12);
        assert_eq!(report.sector.groups.len(), 1);
        assert!((report.sector.groups[0].weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_sector_buckets_as_unknown() {
        let snap = snapshot(vec![
            position("A", None, "JPY", 100.0),
            position("B", Some("Energy"), "JPY", 100.0),
        ]);
        let report = analyze_concentration(&snap);
        assert!(report.sector.groups.iter().any(|g| g.label == "不明"));
    }

    #[test]
    fn empty_portfolio_is_low() {
        let report = analyze_concentration(&snapshot(Vec::new()));
        assert_eq!(report.sector.hhi, 0.0);
        assert_eq!(report.sector.level, ConcentrationLevel::Low);
        assert_eq!(report.shock_multiplier(), 1.0);
    }

    #[test]
    fn groups_sorted_heaviest_first() {
        let snap = snapshot(vec![
            position("A", Some("Technology"), "JPY", 100.0),
            position("B", Some("Energy"), "JPY", 300.0),
        ]);
        let report = analyze_concentration(&snap);
        assert_eq!(report.sector.groups[0].label, "Energy");
        assert!((report.sector.groups[0].weight - 0.75).abs() < 1e-12);
    }

    #[test]
    fn multiplier_ramps_and_caps() {
        assert_eq!(hhi_multiplier(0.10), 1.0);
        assert_eq!(hhi_multiplier(0.24), 1.0);
        assert!((hhi_multiplier(0.375) - 1.15).abs() < 1e-12);
        assert!((hhi_multiplier(0.50) - 1.3).abs() < 1e-12);
        assert!((hhi_multiplier(0.75) - 1.45).abs() < 1e-12);
        assert!((hhi_multiplier(1.0) - 1.6).abs() < 1e-12);
    }

    #[test]
    fn worst_axis_drives_the_multiplier() {
        // Sector diversified, currency fully JPY → currency is worst.
        let snap = snapshot(vec![
            position("A", Some("Technology"), "JPY", 100.0),
            position("B", Some("Energy"), "JPY", 100.0),
            position("C", Some("Utilities"), "JPY", 100.0),
            position("D", Some("Healthcare"), "JPY", 100.0),
            position("E", Some("Industrials"), "JPY", 100.0),
        ]);
        let report = analyze_concentration(&snap);
        assert_eq!(report.worst_axis().axis, ConcentrationAxis::Currency);
        assert!((report.shock_multiplier() - 1.6).abs() < 1e-12);
    }

    #[test]
    fn levels_band_correctly() {
        assert_eq!(ConcentrationLevel::from_hhi(0.10), ConcentrationLevel::Low);
        // Boundaries belong to the band below them.
        assert_eq!(ConcentrationLevel::from_hhi(0.15), ConcentrationLevel::Low);
        assert_eq!(ConcentrationLevel::from_hhi(0.20), ConcentrationLevel::Moderate);
        assert_eq!(ConcentrationLevel::from_hhi(0.25), ConcentrationLevel::Moderate);
        assert_eq!(ConcentrationLevel::from_hhi(0.30), ConcentrationLevel::High);
        assert_eq!(ConcentrationLevel::from_hhi(0.40), ConcentrationLevel::High);
        assert_eq!(ConcentrationLevel::from_hhi(0.41), ConcentrationLevel::Concentrated);
    }

    #[test]
    fn custom_thresholds_validate_and_apply() {
        let strict = ConcentrationThresholds { low: 0.05, moderate: 0.10, high: 0.20 };
        assert!(strict.validate().is_ok());
        assert_eq!(strict.level_for(0.12), ConcentrationLevel::High);

        let unordered = ConcentrationThresholds { low: 0.25, moderate: 0.15, high: 0.40 };
        assert!(matches!(
            unordered.validate(),
            Err(ConfigError::UnorderedThresholds { .. })
        ));

        let out_of_range = ConcentrationThresholds { low: 0.0, moderate: 0.25, high: 0.40 };
        assert!(matches!(
            out_of_range.validate(),
            Err(ConfigError::InvalidHhiLimit(_))
        ));
    }
}
