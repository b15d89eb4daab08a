//! Multi-year asset growth simulation.
//!
//! Annual steps: the year's dividend is paid on the opening value,
//! then the value compounds at the scenario return, optionally
//! reinvesting that dividend, plus the annual contribution. With a
//! zero return and no flows the value holds still, which anchors the
//! math.

use serde::{Deserialize, Serialize};

use super::PerScenario;

/// Inputs to one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthPlan {
    pub initial_value_jpy: f64,
    #[serde(default)]
    pub annual_contribution_jpy: f64,
    /// Dividend yield on the opening value of each year.
    #[serde(default)]
    pub dividend_yield: f64,
    #[serde(default)]
    pub reinvest_dividends: bool,
    pub years: usize,
    /// First year the value reaches this is reported per scenario.
    #[serde(default)]
    pub target_amount_jpy: Option<f64>,
}

/// Value and cumulative dividends at the end of one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearPoint {
    pub year: usize,
    pub value_jpy: f64,
    pub cumulative_dividends_jpy: f64,
}

/// All three scenario paths of one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub years: usize,
    /// Year-by-year points including year 0.
    pub paths: PerScenario<Vec<YearPoint>>,
    pub final_value_jpy: PerScenario<f64>,
    pub cumulative_dividends_jpy: PerScenario<f64>,
    /// First year the target was reached, if one was set and reached.
    pub target_reached_year: PerScenario<Option<usize>>,
}

/// Runs a [`GrowthPlan`] against per-scenario annual returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrowthSimulator;

struct ScenarioPath {
    points: Vec<YearPoint>,
    final_value: f64,
    dividends: f64,
    target_year: Option<usize>,
}

impl GrowthSimulator {
    pub fn simulate(
        &self,
        plan: &GrowthPlan,
        annual_return: PerScenario<f64>,
    ) -> SimulationResult {
        let run = |rate: f64| run_scenario(plan, rate);
        let paths = PerScenario::new(
            run(annual_return.optimistic),
            run(annual_return.base),
            run(annual_return.pessimistic),
        );
        SimulationResult {
            years: plan.years,
            final_value_jpy: PerScenario::new(
                paths.optimistic.final_value,
                paths.base.final_value,
                paths.pessimistic.final_value,
            ),
            cumulative_dividends_jpy: PerScenario::new(
                paths.optimistic.dividends,
                paths.base.dividends,
                paths.pessimistic.dividends,
            ),
            target_reached_year: PerScenario::new(
                paths.optimistic.target_year,
                paths.base.target_year,
                paths.pessimistic.target_year,
            ),
            paths: paths.map(|p| p.points),
        }
    }
}

fn run_scenario(plan: &GrowthPlan, rate: f64) -> ScenarioPath {
    let mut value = plan.initial_value_jpy;
    let mut dividends = 0.0;
    let mut target_year = match plan.target_amount_jpy {
        Some(target) if value >= target => Some(0),
        _ => None,
    };
    let mut points = Vec::with_capacity(plan.years + 1);
    points.push(YearPoint { year: 0, value_jpy: value, cumulative_dividends_jpy: 0.0 });

    for year in 1..=plan.years {
        let dividend = value * plan.dividend_yield;
        dividends += dividend;
        value = value * (1.0 + rate)
            + if plan.reinvest_dividends { dividend } else { 0.0 }
            + plan.annual_contribution_jpy;
        points.push(YearPoint {
            year,
            value_jpy: value,
            cumulative_dividends_jpy: dividends,
        });
        if target_year.is_none() {
            if let Some(target) = plan.target_amount_jpy {
                if value >= target {
                    target_year = Some(year);
                }
            }
        }
    }

    ScenarioPath { points, final_value: value, dividends, target_year }
}
