//! Kabulab Core — stock screening and portfolio analytics engine.
//!
//! This crate contains the heart of the screening system:
//! - Domain types (per-stock metrics, positions, portfolio snapshots, price history)
//! - Value scoring (0–100 composite with verdict bands)
//! - Change-quality scoring (accruals, revenue acceleration, FCF trend, ROE trend)
//! - Technical signal engine (trend, crossovers, pullback detection)
//! - Concentration, shock-sensitivity, scenario, correlation and VaR analytics
//! - Per-position health state machine with escalation rules
//! - Constraint-driven rebalance planner
//! - Return estimation and multi-year growth simulation
//! - Screening backtest evaluation
//!
//! Everything here is pure and synchronous: no I/O, no clock reads, no caches.
//! Callers fetch data, own freshness, and decide when to run.

pub mod backtest;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod health;
pub mod indicators;
pub mod rebalance;
pub mod risk;
pub mod scoring;
pub mod signals;
