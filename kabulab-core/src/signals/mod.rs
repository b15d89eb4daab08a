//! Technical signal engine: trend state, crossover events, pullback setups.
//!
//! Signals are computed fresh from a full price history on every run; there
//! is no incremental state to persist or invalidate.

pub mod pullback;
pub mod trend;

pub use pullback::{evaluate_pullback, PullbackSignal};
pub use trend::{
    evaluate_trend, CrossEvent, TechnicalSnapshot, TrendDirection, SMA_APPROACHING_GAP,
};
