//! KabuLab Runner — screening orchestration, fixtures, history, exports.
//!
//! This crate builds on `kabulab-core` to provide:
//! - Fixture loading (positions CSV, universe JSON, per-symbol bar CSVs)
//! - A TTL metrics cache for fundamentals fetched out of band
//! - Parallel universe screening and portfolio health sweeps
//! - The end-to-end pipeline runner with schema-versioned summaries
//! - JSONL screening history feeding hindsight backtests
//! - JSON, CSV, and Markdown artifact exports

pub mod cache;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod health_run;
pub mod history;
pub mod runner;
pub mod screening;

pub use cache::{CachedMetrics, MetricsCache};
pub use config::{
    ConfigError, ConfigId, ProfileConfig, RunConfig, ScreeningConfig, SimulationConfig,
    ToleranceChoice,
};
pub use data_loader::{
    load_fx_rates, load_history_dir, load_positions, load_price_history, load_quotes,
    load_universe, LoadError, LoadedHistories,
};
pub use export::{
    export_backtest_csv, export_json, export_plan_csv, export_screening_csv,
    export_valuation_csv, generate_report, import_json, load_artifacts, save_artifacts,
};
pub use health_run::{assess_holdings, HealthSummary, HoldingData};
pub use history::{ScreeningHistory, ScreeningRecord};
pub use runner::{
    run_from_files, run_pipeline, screening_records, CatalystBook, CatalystCounts,
    PortfolioData, RunError, RunPaths, RunSummary, SCHEMA_VERSION,
};
pub use screening::{screen_universe, ScreeningHit, ScreeningReport};
