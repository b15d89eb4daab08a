//! Forward-looking analytics: expected returns and growth simulation.
//!
//! Both halves speak in three scenarios — optimistic, base,
//! pessimistic — carried together by [`PerScenario`] so they cannot
//! drift apart on the way from the estimator into the simulator.

use serde::{Deserialize, Serialize};

pub mod estimate;
pub mod simulate;

pub use estimate::{
    portfolio_estimate, CatalystSource, EstimateBasis, ReturnEstimate, ReturnEstimator,
};
pub use simulate::{GrowthPlan, GrowthSimulator, SimulationResult, YearPoint};

/// One value per scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerScenario<T> {
    #[serde(rename = "楽観")]
    pub optimistic: T,
    #[serde(rename = "基本")]
    pub base: T,
    #[serde(rename = "悲観")]
    pub pessimistic: T,
}

impl<T> PerScenario<T> {
    pub fn new(optimistic: T, base: T, pessimistic: T) -> Self {
        Self { optimistic, base, pessimistic }
    }

    /// Applies `f` to each scenario, optimistic first.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> PerScenario<U> {
        PerScenario {
            optimistic: f(self.optimistic),
            base: f(self.base),
            pessimistic: f(self.pessimistic),
        }
    }

    pub fn as_ref(&self) -> PerScenario<&T> {
        PerScenario {
            optimistic: &self.optimistic,
            base: &self.base,
            pessimistic: &self.pessimistic,
        }
    }
}

impl PerScenario<f64> {
    /// Uniform value across all three scenarios.
    pub fn splat(value: f64) -> Self {
        Self::new(value, value, value)
    }
}
