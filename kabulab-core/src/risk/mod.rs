//! Portfolio risk analytics.
//!
//! - [`concentration`] — HHI by sector / region / currency
//! - [`sensitivity`] — per-stock shock sensitivity and quadrant map
//! - [`catalog`] / [`scenario`] — named stress scenarios and their
//!   portfolio assessment with causal chains
//! - [`correlation`] — pairwise correlation and factor regression
//! - [`var`] — parametric value-at-risk

pub mod catalog;
pub mod concentration;
pub mod correlation;
pub mod scenario;
pub mod sensitivity;
pub mod var;

pub use catalog::{ScenarioCatalog, ScenarioDefinition, ScenarioImpact};
pub use concentration::{
    analyze_concentration, analyze_concentration_with, AxisConcentration, ConcentrationAxis,
    ConcentrationLevel, ConcentrationReport, ConcentrationThresholds, GroupWeight,
};
pub use correlation::{
    correlation_matrix, decompose_factors, factor_label, CorrelatedPair, CorrelationMatrix,
    FactorDecomposition, FactorExposure, HIGH_CORRELATION_THRESHOLD,
};
pub use scenario::{
    ScenarioAssessment, ScenarioEngine, ScenarioJudgment, StockImpact,
};
pub use sensitivity::{Quadrant, SensitivityAnalyzer, ShockSensitivity, DEFAULT_BASE_SHOCK};
pub use var::{parametric_var, weighted_portfolio_returns, VarConfidence, VarEstimate};
