//! Volume ratio — short-window average volume over long-window average.
//!
//! Values above 1 mean current participation is running hot relative to the
//! recent baseline. The screener uses 5-day over 20-day.

/// Rolling volume ratio, index-aligned with the input. NaN until the long
/// window fills; also NaN where the long-window average is zero.
pub fn volume_ratio(volumes: &[u64], short: usize, long: usize) -> Vec<f64> {
    assert!(short >= 1 && long >= short, "need 1 <= short <= long");
    let n = volumes.len();
    let mut result = vec![f64::NAN; n];

    if n < long {
        return result;
    }

    for i in (long - 1)..n {
        let short_sum: u64 = volumes[(i + 1 - short)..=i].iter().sum();
        let long_sum: u64 = volumes[(i + 1 - long)..=i].iter().sum();
        let short_avg = short_sum as f64 / short as f64;
        let long_avg = long_sum as f64 / long as f64;
        if long_avg > 0.0 {
            result[i] = short_avg / long_avg;
        }
    }

    result
}

/// The latest 5/20-day volume ratio, if the series is long enough.
pub fn latest_volume_ratio(volumes: &[u64]) -> Option<f64> {
    let series = volume_ratio(volumes, 5, 20);
    series.last().copied().filter(|v| !v.is_nan())
}
