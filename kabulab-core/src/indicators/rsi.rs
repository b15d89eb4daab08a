//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Edge cases: avg_loss == 0 → RSI = 100; avg_gain == 0 → RSI = 0;
//! both zero (flat series) → RSI = 50.

/// Wilder RSI of `closes` over `period`. NaN until the seed window fills;
/// a NaN close poisons the rest of the series (the smoothed averages cannot
/// recover from an unknown change).
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "RSI period must be >= 1");
    let n = closes.len();
    let mut result = vec![f64::NAN; n];

    if n < period + 1 {
        return result;
    }

    let mut changes = vec![f64::NAN; n];
    for i in 1..n {
        let curr = closes[i];
        let prev = closes[i - 1];
        if curr.is_nan() || prev.is_nan() {
            changes[i] = f64::NAN;
        } else {
            changes[i] = curr - prev;
        }
    }

    // Seed: simple averages over the first `period` changes.
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for &ch in &changes[1..=period] {
        if ch.is_nan() {
            return result;
        }
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    result[period] = rsi_from_averages(avg_gain, avg_loss);

    // Wilder smoothing for subsequent values.
    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        if changes[i].is_nan() {
            for val in result.iter_mut().skip(i) {
                *val = f64::NAN;
            }
            return result;
        }

        let gain = if changes[i] > 0.0 { changes[i] } else { 0.0 };
        let loss = if changes[i] < 0.0 { -changes[i] } else { 0.0 };

        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;

        result[i] = rsi_from_averages(avg_gain, avg_loss);
    }

    result
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
