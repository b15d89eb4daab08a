//! Risk-tolerance profiles: the constraint set a plan is built against.
//!
//! Each tolerance ships defaults; builder-style overrides replace
//! individual limits. Validation happens once when the planner is
//! constructed, so a plan never runs against nonsensical limits.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How much concentration and drawdown the holder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTolerance {
    #[serde(rename = "守備型")]
    Defensive,
    #[serde(rename = "バランス型")]
    Balanced,
    #[serde(rename = "積極型")]
    Aggressive,
}

impl RiskTolerance {
    pub fn label(self) -> &'static str {
        match self {
            RiskTolerance::Defensive => "守備型",
            RiskTolerance::Balanced => "バランス型",
            RiskTolerance::Aggressive => "積極型",
        }
    }
}

impl std::fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Constraint set for one rebalancing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceProfile {
    pub tolerance: RiskTolerance,
    /// Ceiling on any single position's share of total value.
    pub max_single_weight: f64,
    /// Ceiling on sector and currency HHI.
    pub max_axis_hhi: f64,
    /// Buy candidates below this dividend yield are skipped.
    pub min_dividend_yield: Option<f64>,
    /// Pairs correlated above this get one member trimmed.
    pub max_pair_correlation: f64,
}

impl RebalanceProfile {
    /// Default limits for a tolerance.
    pub fn for_tolerance(tolerance: RiskTolerance) -> Self {
        match tolerance {
            RiskTolerance::Defensive => Self {
                tolerance,
                max_single_weight: 0.10,
                max_axis_hhi: 0.20,
                min_dividend_yield: Some(0.02),
                max_pair_correlation: 0.60,
            },
            RiskTolerance::Balanced => Self {
                tolerance,
                max_single_weight: 0.15,
                max_axis_hhi: 0.25,
                min_dividend_yield: None,
                max_pair_correlation: 0.70,
            },
            RiskTolerance::Aggressive => Self {
                tolerance,
                max_single_weight: 0.25,
                max_axis_hhi: 0.40,
                min_dividend_yield: None,
                max_pair_correlation: 0.85,
            },
        }
    }

    pub fn with_max_single_weight(mut self, limit: f64) -> Self {
        self.max_single_weight = limit;
        self
    }

    pub fn with_max_axis_hhi(mut self, limit: f64) -> Self {
        self.max_axis_hhi = limit;
        self
    }

    pub fn with_min_dividend_yield(mut self, floor: Option<f64>) -> Self {
        self.min_dividend_yield = floor;
        self
    }

    pub fn with_max_pair_correlation(mut self, threshold: f64) -> Self {
        self.max_pair_correlation = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_single_weight > 0.0 && self.max_single_weight <= 1.0) {
            return Err(ConfigError::InvalidWeightLimit(self.max_single_weight));
        }
        if !(self.max_axis_hhi > 0.0 && self.max_axis_hhi <= 1.0) {
            return Err(ConfigError::InvalidHhiLimit(self.max_axis_hhi));
        }
        if !(self.max_pair_correlation > 0.0 && self.max_pair_correlation <= 1.0) {
            return Err(ConfigError::InvalidCorrelationThreshold(
                self.max_pair_correlation,
            ));
        }
        if let Some(floor) = self.min_dividend_yield {
            if floor < 0.0 {
                return Err(ConfigError::NegativeDividendFloor(floor));
            }
        }
        Ok(())
    }
}

impl Default for RebalanceProfile {
    fn default() -> Self {
        Self::for_tolerance(RiskTolerance::Balanced)
    }
}
