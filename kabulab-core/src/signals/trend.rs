//! Trend classification and moving-average crossover detection.
//!
//! - Trend: price vs SMA50 vs SMA200 (上昇 / 横ばい / 下降)
//! - Dead-cross state: SMA50 at or below SMA200
//! - Crossover events: most recent golden/death cross within 60 sessions
//! - RSI sharp drop: above 50 a week ago, below 40 now
//!
//! Everything here needs 200 closes of history. Shorter series report
//! `不明` with no alarm flags set — a stock we cannot see is not a stock
//! in trouble.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::PriceHistory;
use crate::indicators::{rsi, sma};

/// SMA50 counts as "approaching" SMA200 when the gap narrows below 2%.
pub const SMA_APPROACHING_GAP: f64 = 0.02;

/// Minimum history for SMA200-based work.
const MIN_TREND_BARS: usize = 200;

/// How far back to look for crossover events.
const CROSS_SCAN_BARS: usize = 60;

const RSI_PERIOD: usize = 14;

/// Price trend relative to the long moving averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    #[serde(rename = "上昇")]
    Rising,
    #[serde(rename = "横ばい")]
    Flat,
    #[serde(rename = "下降")]
    Falling,
    #[serde(rename = "不明")]
    Unknown,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::Rising => "上昇",
            TrendDirection::Flat => "横ばい",
            TrendDirection::Falling => "下降",
            TrendDirection::Unknown => "不明",
        };
        f.write_str(label)
    }
}

/// A moving-average crossover found in the recent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossEvent {
    /// Trading days since the cross (0 = crossed on the latest bar).
    pub days_ago: usize,
    pub date: NaiveDate,
}

/// Everything the health machine needs to know about one symbol's chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub symbol: String,
    pub price: f64,
    pub trend: TrendDirection,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub rsi14: Option<f64>,
    pub above_sma50: bool,
    pub above_sma200: bool,
    /// State, not event: SMA50 currently at or below SMA200.
    pub dead_cross: bool,
    /// SMA50 still above SMA200 but within [`SMA_APPROACHING_GAP`] of it.
    pub sma_approaching: bool,
    /// RSI above 50 five sessions ago and below 40 now.
    pub rsi_sharp_drop: bool,
    pub golden_cross: Option<CrossEvent>,
    pub death_cross: Option<CrossEvent>,
}

impl TechnicalSnapshot {
    /// Benign snapshot for symbols with too little history: no alarms.
    fn insufficient(symbol: &str, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
            trend: TrendDirection::Unknown,
            sma50: None,
            sma200: None,
            rsi14: None,
            above_sma50: true,
            above_sma200: true,
            dead_cross: false,
            sma_approaching: false,
            rsi_sharp_drop: false,
            golden_cross: None,
            death_cross: None,
        }
    }
}

/// Evaluate trend state and crossover events for one symbol.
pub fn evaluate_trend(history: &PriceHistory) -> TechnicalSnapshot {
    let closes = history.closes();
    let n = closes.len();
    let price = history.latest_close().unwrap_or(0.0);

    if n < MIN_TREND_BARS {
        return TechnicalSnapshot::insufficient(&history.symbol, price);
    }

    let sma50 = sma(&closes, 50);
    let sma200 = sma(&closes, 200);
    let s50 = sma50[n - 1];
    let s200 = sma200[n - 1];
    if s50.is_nan() || s200.is_nan() || s200 <= 0.0 {
        return TechnicalSnapshot::insufficient(&history.symbol, price);
    }

    let above_sma50 = price > s50;
    let above_sma200 = price > s200;
    let dead_cross = s50 <= s200;
    let sma_approaching = s50 > s200 && (s50 - s200) / s200 < SMA_APPROACHING_GAP;

    let trend = if above_sma50 && s50 > s200 {
        TrendDirection::Rising
    } else if sma_approaching || (!above_sma50 && above_sma200) {
        TrendDirection::Flat
    } else {
        TrendDirection::Falling
    };

    let rsi14 = rsi(&closes, RSI_PERIOD);
    let rsi_now = rsi14[n - 1];
    let rsi_week_ago = if n >= RSI_PERIOD + 6 {
        rsi14[n - 6]
    } else {
        f64::NAN
    };
    let rsi_sharp_drop =
        rsi_now.is_finite() && rsi_week_ago.is_finite() && rsi_week_ago > 50.0 && rsi_now < 40.0;

    let (golden_cross, death_cross) = scan_crosses(history, &sma50, &sma200);

    TechnicalSnapshot {
        symbol: history.symbol.clone(),
        price,
        trend,
        sma50: Some(s50),
        sma200: Some(s200),
        rsi14: rsi_now.is_finite().then_some(rsi_now),
        above_sma50,
        above_sma200,
        dead_cross,
        sma_approaching,
        rsi_sharp_drop,
        golden_cross,
        death_cross,
    }
}

/// Find the most recent golden and death crosses within the scan window.
///
/// Scans backwards from the latest bar; stops one bar short of the SMA200
/// warmup edge so both sides of every comparison are valid.
fn scan_crosses(
    history: &PriceHistory,
    sma50: &[f64],
    sma200: &[f64],
) -> (Option<CrossEvent>, Option<CrossEvent>) {
    let n = sma50.len();
    let max_scan = CROSS_SCAN_BARS.min(n.saturating_sub(MIN_TREND_BARS + 1));
    let mut golden = None;
    let mut death = None;

    for i in 0..max_scan {
        let idx = n - 1 - i;
        let (c50, c200, p50, p200) = (sma50[idx], sma200[idx], sma50[idx - 1], sma200[idx - 1]);
        if c50.is_nan() || c200.is_nan() || p50.is_nan() || p200.is_nan() {
            continue;
        }
        let cur_above = c50 > c200;
        let prev_above = p50 > p200;
        if cur_above == prev_above {
            continue;
        }
        let event = CrossEvent {
            days_ago: i,
            date: history.bars[idx].date,
        };
        if cur_above {
            golden.get_or_insert(event);
        } else {
            death.get_or_insert(event);
        }
        if golden.is_some() && death.is_some() {
            break;
        }
    }

    (golden, death)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::make_history;

    fn rising_closes(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.5).collect()
    }

    fn falling_closes(n: usize) -> Vec<f64> {
        (0..n).map(|i| 300.0 - i as f64 * 0.5).collect()
    }

    #[test]
    fn rising_series_classified_rising() {
        let h = make_history("TEST", &rising_closes(250));
        let snap = evaluate_trend(&h);
        assert_eq!(snap.trend, TrendDirection::Rising);
        assert!(!snap.dead_cross);
        assert!(snap.above_sma50);
        assert!(!snap.rsi_sharp_drop);
    }

    #[test]
    fn falling_series_classified_falling_with_dead_cross() {
        let h = make_history("TEST", &falling_closes(250));
        let snap = evaluate_trend(&h);
        assert_eq!(snap.trend, TrendDirection::Falling);
        assert!(snap.dead_cross);
        assert!(!snap.above_sma50);
    }

    #[test]
    fn short_history_reports_unknown_without_alarms() {
        let h = make_history("TEST", &rising_closes(150));
        let snap = evaluate_trend(&h);
        assert_eq!(snap.trend, TrendDirection::Unknown);
        assert!(!snap.dead_cross);
        assert!(snap.above_sma50);
        assert!(snap.sma50.is_none());
        assert!(snap.golden_cross.is_none());
    }

    #[test]
    fn golden_cross_elapsed_days() {
        // Flat at 100 for 239 bars, then a jump to 200 for the last 11.
        // SMA50 overtakes SMA200 on the first jump bar: 10 bars before the
        // latest bar.
        let mut closes = vec![100.0; 239];
        closes.extend(vec![200.0; 11]);
        let h = make_history("TEST", &closes);
        let snap = evaluate_trend(&h);

        let cross = snap.golden_cross.expect("expected a golden cross");
        assert_eq!(cross.days_ago, 10);
        assert!(snap.death_cross.is_none());
    }

    #[test]
    fn death_cross_detected() {
        // Long rise so SMA50 sits well above SMA200, then a month-long
        // collapse drags SMA50 back underneath it within the scan window.
        let mut closes = rising_closes(220);
        closes.extend(vec![100.0; 30]);
        let h = make_history("TEST", &closes);
        let snap = evaluate_trend(&h);

        let cross = snap.death_cross.expect("expected a death cross");
        assert!(cross.days_ago < CROSS_SCAN_BARS);
        assert!(snap.dead_cross);
        assert!(snap.golden_cross.is_none());
    }

    #[test]
    fn rsi_sharp_drop_detected() {
        // 200 steadily rising bars (RSI pinned high), then five hard drops.
        let mut closes = rising_closes(200);
        let last = *closes.last().unwrap();
        for k in 1..=5 {
            closes.push(last - 30.0 * k as f64);
        }
        let h = make_history("TEST", &closes);
        let snap = evaluate_trend(&h);

        assert!(snap.rsi_sharp_drop);
        assert!(snap.rsi14.unwrap() < 40.0);
    }

    #[test]
    fn flat_when_price_dips_below_sma50_only() {
        // Long rise, then a shallow dip: price below SMA50 but well above
        // SMA200, SMA50 still comfortably above SMA200.
        let mut closes = rising_closes(240);
        let last = *closes.last().unwrap();
        for k in 1..=10 {
            closes.push(last - 2.0 * k as f64);
        }
        let h = make_history("TEST", &closes);
        let snap = evaluate_trend(&h);

        assert!(!snap.above_sma50);
        assert!(snap.above_sma200);
        assert_eq!(snap.trend, TrendDirection::Flat);
    }

    #[test]
    fn snapshot_serialization_uses_japanese_trend_labels() {
        let h = make_history("TEST", &rising_closes(250));
        let snap = evaluate_trend(&h);
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("上昇"));
        let back: TechnicalSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.trend, TrendDirection::Rising);
    }
}
