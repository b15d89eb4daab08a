//! Configuration validation errors.
//!
//! Bad *configuration* (nonsensical constraints, unknown scenario keys) is an
//! error and surfaces before any computation runs. Missing market *data* is
//! not: scorers re-weight or return an indeterminate result instead.

use thiserror::Error;

/// Errors from validating caller-supplied configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max single-position weight must be in (0, 1], got {0}")]
    InvalidWeightLimit(f64),

    #[error("HHI limit must be in (0, 1], got {0}")]
    InvalidHhiLimit(f64),

    #[error("correlation threshold must be in (0, 1], got {0}")]
    InvalidCorrelationThreshold(f64),

    #[error("dividend-yield floor must be non-negative, got {0}")]
    NegativeDividendFloor(f64),

    #[error("concentration thresholds must be ascending, got {low} / {moderate} / {high}")]
    UnorderedThresholds { low: f64, moderate: f64, high: f64 },
}
