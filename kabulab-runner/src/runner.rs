//! One screening run, end to end.
//!
//! [`run_pipeline`] takes pre-loaded data and produces a [`RunSummary`]:
//! screening hits, portfolio valuation, health reports, concentration,
//! scenario stress, VaR, a rebalance proposal, hindsight on earlier hits
//! and an optional growth simulation. [`run_from_files`] wraps it with
//! the fixture loaders and appends the new hits to the screening history
//! so future runs can backtest them.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kabulab_core::backtest::{run_backtest, BacktestReport, ScreeningSnapshot};
use kabulab_core::domain::{
    FxRates, PortfolioSnapshot, Position, PriceHistory, Quote, StockMetrics, ValuedPosition,
};
use kabulab_core::forecast::{
    portfolio_estimate, CatalystSource, GrowthSimulator, ReturnEstimate, ReturnEstimator,
    SimulationResult,
};
use kabulab_core::rebalance::{BuyCandidate, RebalanceInputs, RebalancePlan, RebalancePlanner};
use kabulab_core::risk::scenario::currency_from_symbol;
use kabulab_core::risk::{
    analyze_concentration, correlation_matrix, parametric_var, weighted_portfolio_returns,
    AxisConcentration, ConcentrationLevel, ConcentrationReport, ScenarioAssessment,
    ScenarioEngine, SensitivityAnalyzer, VarConfidence, VarEstimate,
};
use kabulab_core::scoring::ValueScorer;

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{self, LoadError};
use crate::health_run::{assess_holdings, HealthSummary, HoldingData};
use crate::history::{ScreeningHistory, ScreeningRecord};
use crate::screening::{screen_universe, ScreeningReport};

/// Bumped when [`RunSummary`]'s serialized shape changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Anything that can stop a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("load: {0}")]
    Load(#[from] LoadError),

    #[error("screening history: {0}")]
    History(#[from] std::io::Error),

    #[error("profile: {0}")]
    Profile(#[from] kabulab_core::error::ConfigError),
}

/// Per-symbol catalyst counts fed to the return estimator, typically
/// curated by hand from news flow. Unlisted symbols count zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalystBook {
    #[serde(default)]
    pub counts: BTreeMap<String, CatalystCounts>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalystCounts {
    #[serde(default)]
    pub growth: usize,
    #[serde(default)]
    pub risk: usize,
}

impl CatalystBook {
    pub fn insert(&mut self, symbol: impl Into<String>, growth: usize, risk: usize) {
        self.counts.insert(symbol.into(), CatalystCounts { growth, risk });
    }
}

impl CatalystSource for CatalystBook {
    fn growth_catalysts(&self, symbol: &str) -> usize {
        self.counts.get(symbol).map_or(0, |c| c.growth)
    }

    fn risk_catalysts(&self, symbol: &str) -> usize {
        self.counts.get(symbol).map_or(0, |c| c.risk)
    }
}

/// Everything a run needs besides the universe and the config.
#[derive(Debug, Clone, Default)]
pub struct PortfolioData {
    pub positions: Vec<Position>,
    pub quotes: HashMap<String, Quote>,
    pub fx: FxRates,
    pub histories: Vec<PriceHistory>,
    pub catalysts: Option<CatalystBook>,
}

impl PortfolioData {
    pub fn history(&self, symbol: &str) -> Option<&PriceHistory> {
        self.histories.iter().find(|h| h.symbol == symbol)
    }

    /// Benchmark index histories (`^`-prefixed symbols, e.g. `^N225`).
    pub fn benchmarks(&self) -> Vec<PriceHistory> {
        self.histories
            .iter()
            .filter(|h| h.symbol.starts_with('^'))
            .cloned()
            .collect()
    }
}

/// The full output of one run. Serialized as `summary.json` by the
/// export module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config_id: String,
    pub run_date: NaiveDate,
    pub screening: ScreeningReport,
    pub valuation: PortfolioSnapshot,
    pub health: HealthSummary,
    pub concentration: ConcentrationReport,
    /// One assessment per configured scenario, in config order.
    pub scenarios: Vec<ScenarioAssessment>,
    /// `None` when no held equity has enough price history.
    pub var: Option<VarEstimate>,
    pub plan: RebalancePlan,
    /// `None` on a first run (no prior screening history).
    pub backtest: Option<BacktestReport>,
    /// `None` unless the config asks for one and the holdings support
    /// an expected-return estimate.
    pub simulation: Option<SimulationResult>,
}

/// Runs the whole pipeline on pre-loaded data. No I/O.
///
/// `universe` metrics are expected in ratio form
/// ([`StockMetrics::normalized`]); the file loaders already do this.
pub fn run_pipeline(
    config: &RunConfig,
    universe: &[StockMetrics],
    portfolio: &PortfolioData,
    prior_snapshots: &[ScreeningSnapshot],
    run_date: NaiveDate,
) -> Result<RunSummary, RunError> {
    config.validate()?;

    let screening = screen_universe(
        universe,
        &config.screening.to_criteria(),
        &ValueScorer::default(),
    );

    let valuation = PortfolioSnapshot::build(&portfolio.positions, &portfolio.quotes, &portfolio.fx);

    let by_symbol: HashMap<&str, &StockMetrics> =
        universe.iter().map(|m| (m.symbol.as_str(), m)).collect();

    let holdings: Vec<HoldingData> = valuation
        .equities()
        .map(|pos| HoldingData {
            metrics: held_metrics(&by_symbol, pos),
            history: portfolio
                .history(&pos.symbol)
                .cloned()
                .unwrap_or_else(|| PriceHistory::new(pos.symbol.clone(), Vec::new())),
        })
        .collect();
    let health = assess_holdings(&holdings);

    let concentration = analyze_concentration(&valuation);

    // Per-stock composite shocks feed the scenario engine; the worst
    // concentration axis scales them all.
    let multiplier = concentration.shock_multiplier();
    let analyzer = SensitivityAnalyzer::default();
    let stocks: Vec<StockMetrics> = holdings.iter().map(|h| h.metrics.clone()).collect();
    let weights: Vec<f64> = valuation.equities().map(|p| p.weight).collect();
    let shocks: Vec<f64> = holdings
        .iter()
        .map(|h| {
            analyzer
                .assess(&h.metrics, &h.history.closes(), multiplier)
                .composite_shock
        })
        .collect();

    let engine = ScenarioEngine::default();
    let scenarios: Vec<ScenarioAssessment> = config
        .scenarios
        .iter()
        .filter_map(|query| engine.resolve(query))
        .map(|scenario| engine.assess_portfolio(scenario, &stocks, &shocks, &weights))
        .collect();

    let var = portfolio_var(&valuation, portfolio);

    let estimator = ReturnEstimator;
    let catalysts = portfolio
        .catalysts
        .as_ref()
        .map(|book| book as &dyn CatalystSource);
    let estimates: Vec<ReturnEstimate> = holdings
        .iter()
        .filter_map(|h| {
            estimator.estimate(&h.metrics, portfolio.history(&h.metrics.symbol), catalysts)
        })
        .collect();
    let expected_returns: HashMap<String, f64> = estimates
        .iter()
        .map(|e| (e.symbol.clone(), e.annual_return.base))
        .collect();

    let candidates = buy_candidates(
        &screening,
        &valuation,
        &by_symbol,
        portfolio,
        &estimator,
        catalysts,
    );

    let held_histories: Vec<PriceHistory> = holdings
        .iter()
        .filter(|h| h.history.len() >= 2)
        .map(|h| h.history.clone())
        .collect();
    let correlations = (held_histories.len() >= 2).then(|| correlation_matrix(&held_histories));

    let flagged_sectors = flagged_groups(&concentration.sector);
    let flagged_currencies = flagged_groups(&concentration.currency);

    let planner = RebalancePlanner::new(config.profile.to_profile())?;
    let plan = planner.plan(&RebalanceInputs {
        snapshot: &valuation,
        health: &health.reports,
        expected_returns: &expected_returns,
        correlations: correlations.as_ref(),
        flagged_sectors: &flagged_sectors,
        flagged_currencies: &flagged_currencies,
        candidates: &candidates,
        additional_cash_jpy: 0.0,
    });

    let backtest = if prior_snapshots.is_empty() {
        None
    } else {
        let current: HashMap<String, f64> = portfolio
            .quotes
            .iter()
            .map(|(symbol, quote)| (symbol.clone(), quote.price))
            .collect();
        Some(run_backtest(
            prior_snapshots,
            &current,
            &portfolio.benchmarks(),
        ))
    };

    let simulation = match &config.simulation {
        Some(sim) => portfolio_estimate(&estimates, &valuation)
            .map(|rates| GrowthSimulator.simulate(&sim.to_plan(), rates)),
        None => None,
    };

    Ok(RunSummary {
        schema_version: SCHEMA_VERSION,
        config_id: config.config_id(),
        run_date,
        screening,
        valuation,
        health,
        concentration,
        scenarios,
        var,
        plan,
        backtest,
        simulation,
    })
}

/// Where [`run_from_files`] finds its fixtures.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub config: PathBuf,
    pub universe: PathBuf,
    pub positions: PathBuf,
    pub quotes: PathBuf,
    pub fx: PathBuf,
    pub history_dir: PathBuf,
    pub screening_history: PathBuf,
}

/// Loads everything, runs the pipeline and appends this run's hits to
/// the screening history.
pub fn run_from_files(paths: &RunPaths, run_date: NaiveDate) -> Result<RunSummary, RunError> {
    let config = RunConfig::load(&paths.config)?;
    let universe = data_loader::load_universe(&paths.universe)?;
    let loaded = data_loader::load_history_dir(&paths.history_dir)?;
    let portfolio = PortfolioData {
        positions: data_loader::load_positions(&paths.positions)?,
        quotes: data_loader::load_quotes(&paths.quotes)?,
        fx: data_loader::load_fx_rates(&paths.fx)?,
        histories: loaded.histories,
        catalysts: None,
    };

    let history = ScreeningHistory::new(&paths.screening_history);
    let prior = history.snapshots()?;
    let summary = run_pipeline(&config, &universe, &portfolio, &prior, run_date)?;
    history.append(&screening_records(&summary.screening, run_date, &summary.config_id))?;
    Ok(summary)
}

/// History rows for this run's hits. Hits without a price cannot be
/// backtested later and are skipped.
pub fn screening_records(
    report: &ScreeningReport,
    run_date: NaiveDate,
    config_id: &str,
) -> Vec<ScreeningRecord> {
    report
        .hits
        .iter()
        .filter_map(|hit| {
            let price = hit.price.filter(|p| *p > 0.0)?;
            Some(ScreeningRecord {
                run_date,
                config_id: config_id.to_string(),
                symbol: hit.symbol().to_string(),
                price,
                score: hit.value.score,
                verdict: hit.value.verdict.label().to_string(),
            })
        })
        .collect()
}

/// Universe metrics for a held symbol, or a stub carrying the quote
/// context so concentration and scenarios still see the position.
fn held_metrics(by_symbol: &HashMap<&str, &StockMetrics>, pos: &ValuedPosition) -> StockMetrics {
    by_symbol
        .get(pos.symbol.as_str())
        .map(|m| (*m).clone())
        .unwrap_or_else(|| StockMetrics {
            symbol: pos.symbol.clone(),
            name: pos.name.clone(),
            sector: pos.sector.clone(),
            region: pos.region.clone(),
            currency: Some(pos.currency.clone()),
            price: Some(pos.current_price),
            ..StockMetrics::default()
        })
}

/// The heaviest group on an axis, when the axis is concentrated enough
/// for the planner to care.
fn flagged_groups(axis: &AxisConcentration) -> Vec<String> {
    match axis.level {
        ConcentrationLevel::High | ConcentrationLevel::Concentrated => axis
            .groups
            .first()
            .map(|g| vec![g.label.clone()])
            .unwrap_or_default(),
        ConcentrationLevel::Low | ConcentrationLevel::Moderate => Vec::new(),
    }
}

/// VaR on the covered sub-book: held equities with at least two bars of
/// history, weights renormalized over that subset.
fn portfolio_var(valuation: &PortfolioSnapshot, portfolio: &PortfolioData) -> Option<VarEstimate> {
    let mut covered = Vec::new();
    let mut weights = Vec::new();
    let mut covered_value = 0.0;
    for pos in valuation.equities() {
        let Some(history) = portfolio.history(&pos.symbol) else {
            continue;
        };
        if history.len() < 2 {
            continue;
        }
        covered.push(history.clone());
        weights.push(pos.weight);
        covered_value += pos.value_jpy;
    }
    let total: f64 = weights.iter().sum();
    if covered.is_empty() || total <= 0.0 {
        return None;
    }
    for w in &mut weights {
        *w /= total;
    }
    let returns = weighted_portfolio_returns(&covered, &weights);
    parametric_var(&returns, covered_value, VarConfidence::P95)
}

/// Screening hits not already held, enriched with a JPY price and an
/// outlook. Hits without a usable price or estimate are skipped.
fn buy_candidates(
    screening: &ScreeningReport,
    valuation: &PortfolioSnapshot,
    by_symbol: &HashMap<&str, &StockMetrics>,
    portfolio: &PortfolioData,
    estimator: &ReturnEstimator,
    catalysts: Option<&dyn CatalystSource>,
) -> Vec<BuyCandidate> {
    let mut out = Vec::new();
    for hit in &screening.hits {
        let symbol = hit.symbol();
        if valuation.position(symbol).is_some() {
            continue;
        }
        let Some(&metrics) = by_symbol.get(symbol) else {
            continue;
        };
        let Some(price) = hit.price.filter(|p| *p > 0.0) else {
            continue;
        };
        let Some(estimate) = estimator.estimate(metrics, portfolio.history(symbol), catalysts)
        else {
            continue;
        };
        let currency = metrics
            .currency
            .clone()
            .unwrap_or_else(|| currency_from_symbol(symbol).to_string());
        out.push(BuyCandidate {
            symbol: symbol.to_string(),
            price_jpy: price * portfolio.fx.to_jpy(&currency),
            expected_return: estimate.annual_return.base,
            dividend_yield: metrics.dividend_yield,
            sector: metrics.sector.clone(),
            currency: Some(currency),
        });
    }
    out
}

// ─── Tests ──────────────────────────────────────────────────────────────
