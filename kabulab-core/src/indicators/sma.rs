//! Simple Moving Average (SMA).
//!
//! Rolling mean over a lookback window; first valid value at index period-1.

/// Rolling mean of `values` over `period`.
///
/// Output has the same length as the input, NaN until the window fills.
/// A NaN anywhere in the current window makes that output NaN.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "SMA period must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_in_window = false;
    for &v in values.iter().take(period) {
        if v.is_nan() {
            nan_in_window = true;
        }
        sum += v;
    }

    if !nan_in_window {
        result[period - 1] = sum / period as f64;
    }

    for i in period..n {
        let leaving = values[i - period];
        let entering = values[i];
        sum = sum - leaving + entering;

        // Rolling add/remove cannot clear a NaN-poisoned sum; rescan the
        // window whenever NaN was or may be involved.
        if entering.is_nan() || leaving.is_nan() || nan_in_window {
            nan_in_window = false;
            sum = 0.0;
            for &v in &values[(i + 1 - period)..=i] {
                if v.is_nan() {
                    nan_in_window = true;
                }
                sum += v;
            }
            if nan_in_window {
                result[i] = f64::NAN;
                continue;
            }
        }

        result[i] = sum / period as f64;
    }

    result
}
