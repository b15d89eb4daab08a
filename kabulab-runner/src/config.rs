//! Serializable run configuration (TOML) with a content-addressed id.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use kabulab_core::forecast::GrowthPlan;
use kabulab_core::rebalance::{RebalanceProfile, RiskTolerance};
use kabulab_core::risk::ScenarioCatalog;
use kabulab_core::scoring::ScreeningCriteria;

/// Unique identifier for a run configuration (content-addressable hash).
pub type ConfigId = String;

/// Errors from loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("screening bound '{name}' must be positive, got {value}")]
    NonPositiveBound { name: &'static str, value: f64 },

    #[error("screening floor '{name}' must be non-negative, got {value}")]
    NegativeFloor { name: &'static str, value: f64 },

    #[error("unknown scenario query '{0}'")]
    UnknownScenario(String),

    #[error("simulation horizon must be at least 1 year")]
    ZeroSimulationYears,

    #[error("simulation opening value must be non-negative, got {0}")]
    NegativeSimulationValue(f64),

    #[error("profile: {0}")]
    Profile(#[from] kabulab_core::error::ConfigError),
}

/// Everything one screening/rebalance run is parameterized by.
///
/// Two runs with identical configs share a [`ConfigId`]; the id is written
/// onto every screening history record so past hits can be traced back to
/// the criteria that produced them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default)]
    pub profile: ProfileConfig,

    #[serde(default)]
    pub screening: ScreeningConfig,

    /// Scenario queries to assess each run ("円安", "日銀", "tech", ...).
    #[serde(default)]
    pub scenarios: Vec<String>,

    #[serde(default)]
    pub simulation: Option<SimulationConfig>,
}

impl RunConfig {
    /// Parses and validates a TOML config string.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Computes a deterministic hash id for this configuration.
    ///
    /// Screening history records carry this id, so hits produced under
    /// different criteria never get conflated during backtesting.
    pub fn config_id(&self) -> ConfigId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        let hash = blake3::hash(json.as_bytes());
        format!("{}", hash.to_hex())
    }

    /// Checks every field against its domain before any computation runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.screening.validate()?;
        self.profile.to_profile().validate()?;
        if let Some(sim) = &self.simulation {
            sim.validate()?;
        }
        let catalog = ScenarioCatalog::default();
        for query in &self.scenarios {
            if catalog.resolve(query).is_none() {
                return Err(ConfigError::UnknownScenario(query.clone()));
            }
        }
        Ok(())
    }
}

/// Risk-profile selection with optional per-field overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileConfig {
    #[serde(default)]
    pub tolerance: ToleranceChoice,

    /// Overrides the tolerance preset's single-position weight ceiling.
    #[serde(default)]
    pub max_single_weight: Option<f64>,

    /// Overrides the tolerance preset's sector/currency HHI ceiling.
    #[serde(default)]
    pub max_axis_hhi: Option<f64>,
}

impl ProfileConfig {
    /// Resolves to a concrete rebalance profile (unvalidated).
    pub fn to_profile(&self) -> RebalanceProfile {
        let mut profile = RebalanceProfile::for_tolerance(self.tolerance.to_tolerance());
        if let Some(limit) = self.max_single_weight {
            profile = profile.with_max_single_weight(limit);
        }
        if let Some(limit) = self.max_axis_hhi {
            profile = profile.with_max_axis_hhi(limit);
        }
        profile
    }
}

/// Serializable tolerance selector (ASCII-friendly for TOML files).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToleranceChoice {
    Defensive,
    #[default]
    Balanced,
    Aggressive,
}

impl ToleranceChoice {
    pub fn to_tolerance(self) -> RiskTolerance {
        match self {
            ToleranceChoice::Defensive => RiskTolerance::Defensive,
            ToleranceChoice::Balanced => RiskTolerance::Balanced,
            ToleranceChoice::Aggressive => RiskTolerance::Aggressive,
        }
    }
}

/// Screening bounds; absent fields leave the criterion unconstrained.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScreeningConfig {
    #[serde(default)]
    pub max_per: Option<f64>,
    #[serde(default)]
    pub max_pbr: Option<f64>,
    #[serde(default)]
    pub min_dividend_yield: Option<f64>,
    #[serde(default)]
    pub min_roe: Option<f64>,
    #[serde(default)]
    pub min_revenue_growth: Option<f64>,
    #[serde(default)]
    pub min_earnings_growth: Option<f64>,
    #[serde(default)]
    pub min_market_cap: Option<f64>,
    #[serde(default)]
    pub min_shareholder_yield: Option<f64>,
}

impl ScreeningConfig {
    pub fn to_criteria(&self) -> ScreeningCriteria {
        ScreeningCriteria {
            max_per: self.max_per,
            max_pbr: self.max_pbr,
            min_dividend_yield: self.min_dividend_yield,
            min_roe: self.min_roe,
            min_revenue_growth: self.min_revenue_growth,
            min_earnings_growth: self.min_earnings_growth,
            min_market_cap: self.min_market_cap,
            min_shareholder_yield: self.min_shareholder_yield,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("max_per", self.max_per), ("max_pbr", self.max_pbr)] {
            if let Some(v) = value {
                if v <= 0.0 {
                    return Err(ConfigError::NonPositiveBound { name, value: v });
                }
            }
        }
        for (name, value) in [
            ("min_dividend_yield", self.min_dividend_yield),
            ("min_roe", self.min_roe),
            ("min_market_cap", self.min_market_cap),
            ("min_shareholder_yield", self.min_shareholder_yield),
        ] {
            if let Some(v) = value {
                if v < 0.0 {
                    return Err(ConfigError::NegativeFloor { name, value: v });
                }
            }
        }
        Ok(())
    }
}

/// Multi-year growth simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub initial_value_jpy: f64,
    #[serde(default)]
    pub annual_contribution_jpy: f64,
    #[serde(default)]
    pub dividend_yield: f64,
    #[serde(default)]
    pub reinvest_dividends: bool,
    pub years: usize,
    #[serde(default)]
    pub target_amount_jpy: Option<f64>,
}

impl SimulationConfig {
    pub fn to_plan(&self) -> GrowthPlan {
        GrowthPlan {
            initial_value_jpy: self.initial_value_jpy,
            annual_contribution_jpy: self.annual_contribution_jpy,
            dividend_yield: self.dividend_yield,
            reinvest_dividends: self.reinvest_dividends,
            years: self.years,
            target_amount_jpy: self.target_amount_jpy,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.years == 0 {
            return Err(ConfigError::ZeroSimulationYears);
        }
        if self.initial_value_jpy < 0.0 {
            return Err(ConfigError::NegativeSimulationValue(self.initial_value_jpy));
        }
        Ok(())
    }
}
