//! Rolling indicators over close/volume series.
//!
//! All functions take plain slices and return full-length vectors with NaN
//! during the warmup window, so indicator index i always lines up with bar
//! index i. NaN inputs propagate to every window that contains them.

pub mod bollinger;
pub mod rsi;
pub mod sma;
pub mod volume;

pub use bollinger::{bollinger, BollingerBands};
pub use rsi::rsi;
pub use sma::sma;
pub use volume::{latest_volume_ratio, volume_ratio};

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
