//! Rebalancing: risk-tolerance profiles and the trade planner.

pub mod planner;
pub mod profile;

pub use planner::{
    BuyCandidate, PlannedTrade, RebalanceInputs, RebalancePlan, RebalancePlanner, TradeSide,
};
pub use profile::{RebalanceProfile, RiskTolerance};
