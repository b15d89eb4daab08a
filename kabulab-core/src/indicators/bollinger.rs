//! Bollinger Bands — moving average ± standard deviation multiplier.
//!
//! Uses population stddev (divide by N). Lookback: period - 1.

/// The three Bollinger series, index-aligned with the input.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Compute all three bands in one pass.
pub fn bollinger(closes: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    assert!(period >= 1, "Bollinger period must be >= 1");
    let n = closes.len();
    let mut middle = vec![f64::NAN; n];
    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];

    if n >= period {
        for i in (period - 1)..n {
            let window = &closes[(i + 1 - period)..=i];

            let mut has_nan = false;
            let mut sum = 0.0;
            for &v in window {
                if v.is_nan() {
                    has_nan = true;
                    break;
                }
                sum += v;
            }
            if has_nan {
                continue;
            }

            let mean = sum / period as f64;
            let variance: f64 = window
                .iter()
                .map(|&v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            let stddev = variance.sqrt();

            middle[i] = mean;
            upper[i] = mean + multiplier * stddev;
            lower[i] = mean - multiplier * stddev;
        }
    }

    BollingerBands {
        middle,
        upper,
        lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn middle_is_sma() {
        let bands = bollinger(&[10.0, 11.0, 12.0, 13.0, 14.0], 3, 2.0);
        assert!(bands.middle[0].is_nan());
        assert!(bands.middle[1].is_nan());
        assert_approx(bands.middle[2], 11.0, DEFAULT_EPSILON);
        assert_approx(bands.middle[3], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bands_symmetric() {
        let bands = bollinger(&[10.0, 11.0, 12.0, 13.0, 14.0], 3, 2.0);
        for i in 2..5 {
            let half_width = bands.upper[i] - bands.middle[i];
            assert_approx(bands.middle[i] - bands.lower[i], half_width, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn constant_price_zero_width() {
        let bands = bollinger(&[100.0, 100.0, 100.0, 100.0], 3, 2.0);
        assert_approx(bands.upper[2], 100.0, DEFAULT_EPSILON);
        assert_approx(bands.lower[2], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_propagation() {
        let mut closes = vec![10.0, 11.0, 12.0, 13.0];
        closes[2] = f64::NAN;
        let bands = bollinger(&closes, 3, 2.0);
        assert!(bands.upper[2].is_nan());
        assert!(bands.upper[3].is_nan());
    }
}
