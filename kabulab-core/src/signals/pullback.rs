//! Pullback detection: healthy uptrends taking a breather.
//!
//! A candidate needs all three at once:
//! 1. Uptrend — price above SMA200 and SMA50 above SMA200.
//! 2. Pullback — 5–20% below the 60-day high, price still above SMA200.
//! 3. Bounce evidence — a 0–100 score over the last five sessions clears 40.
//!
//! The bounce score rewards an RSI turning up out of the 25–50 band (+40),
//! RSI depth in 25–35 (+15), a close hugging the lower Bollinger band (+25),
//! a volume surge (+10), and a green close (+10). The score keeps the best
//! single session, not the sum across sessions.

use serde::{Deserialize, Serialize};

use crate::domain::PriceHistory;
use crate::indicators::{bollinger, rsi, sma, volume_ratio};

const MIN_BARS: usize = 200;
const HIGH_LOOKBACK: usize = 60;
const BOUNCE_WINDOW: usize = 5;
const BOUNCE_THRESHOLD: u32 = 40;

const PULLBACK_MIN: f64 = -0.20;
const PULLBACK_MAX: f64 = -0.05;
/// Close within 2% above the lower band counts as touching it.
const BB_PROXIMITY: f64 = 1.02;
const VOLUME_SURGE: f64 = 1.2;

/// Result of the pullback screen for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullbackSignal {
    pub symbol: String,
    pub price: f64,
    /// All three conditions hold.
    pub is_candidate: bool,
    pub uptrend: bool,
    pub is_pullback: bool,
    /// Distance from the 60-day high, as a (negative) fraction.
    pub pullback_pct: f64,
    pub recent_high: f64,
    pub bounce_score: u32,
    pub bounce_signal: bool,
    pub rsi14: Option<f64>,
}

/// Run the pullback screen. Returns `None` below 200 bars of history.
pub fn evaluate_pullback(history: &PriceHistory) -> Option<PullbackSignal> {
    let closes = history.closes();
    let n = closes.len();
    if n < MIN_BARS {
        return None;
    }

    let price = closes[n - 1];
    let sma50 = sma(&closes, 50);
    let sma200 = sma(&closes, 200);
    let s50 = sma50[n - 1];
    let s200 = sma200[n - 1];
    let high = recent_high(&closes);
    if s50.is_nan() || s200.is_nan() || !(high > 0.0) {
        return None;
    }

    let pullback_pct = (price - high) / high;
    let uptrend = price > s200 && s50 > s200;
    let is_pullback =
        (PULLBACK_MIN..=PULLBACK_MAX).contains(&pullback_pct) && price > s200;

    let rsi14 = rsi(&closes, 14);
    let bands = bollinger(&closes, 20, 2.0);
    let vol_ratio = volume_ratio(&history.volumes(), 5, 20);

    let bounce_score = bounce_score(&closes, &rsi14, &bands.lower, &vol_ratio);
    let bounce_signal = bounce_score >= BOUNCE_THRESHOLD;

    let rsi_now = rsi14[n - 1];
    Some(PullbackSignal {
        symbol: history.symbol.clone(),
        price,
        is_candidate: uptrend && is_pullback && bounce_signal,
        uptrend,
        is_pullback,
        pullback_pct,
        recent_high: high,
        bounce_score,
        bounce_signal,
        rsi14: rsi_now.is_finite().then_some(rsi_now),
    })
}

fn recent_high(closes: &[f64]) -> f64 {
    closes
        .iter()
        .rev()
        .take(HIGH_LOOKBACK)
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Best single-session bounce score over the last five sessions.
fn bounce_score(closes: &[f64], rsi14: &[f64], bb_lower: &[f64], vol_ratio: &[f64]) -> u32 {
    let n = closes.len();
    let mut best = 0u32;

    for d in (n - BOUNCE_WINDOW)..n {
        if d == 0 {
            continue;
        }
        let mut score = 0u32;
        let r = rsi14[d];
        let r_prev = rsi14[d - 1];
        let close = closes[d];
        let close_prev = closes[d - 1];

        if r.is_finite() && r_prev.is_finite() {
            if (25.0..=50.0).contains(&r) && r > r_prev {
                score += 40;
            }
            if (25.0..=35.0).contains(&r) {
                score += 15;
            }
        }
        if bb_lower[d].is_finite() && close <= bb_lower[d] * BB_PROXIMITY {
            score += 25;
        }
        if vol_ratio[d].is_finite() && vol_ratio[d] > VOLUME_SURGE {
            score += 10;
        }
        if close.is_finite() && close_prev.is_finite() && close > close_prev {
            score += 10;
        }

        best = best.max(score);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::make_history;

    /// Long rise, then an 8-session slide of about 10%, then one green close.
    fn pullback_closes() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..200).map(|i| 100.0 + i as f64 * 0.5).collect();
        let peak = *closes.last().unwrap();
        for k in 1..=8 {
            closes.push(peak - 2.5 * k as f64);
        }
        let bottom = *closes.last().unwrap();
        closes.push(bottom + 1.5);
        closes
    }

    #[test]
    fn dip_in_uptrend_is_a_candidate() {
        let h = make_history("TEST", &pullback_closes());
        let signal = evaluate_pullback(&h).unwrap();

        assert!(signal.uptrend);
        assert!(signal.is_pullback);
        assert!(
            signal.pullback_pct < PULLBACK_MAX && signal.pullback_pct > PULLBACK_MIN,
            "pullback_pct = {}",
            signal.pullback_pct
        );
        assert!(signal.bounce_score >= BOUNCE_THRESHOLD);
        assert!(signal.is_candidate);
    }

    #[test]
    fn fresh_high_is_not_a_pullback() {
        let closes: Vec<f64> = (0..250).map(|i| 100.0 + i as f64 * 0.5).collect();
        let h = make_history("TEST", &closes);
        let signal = evaluate_pullback(&h).unwrap();

        assert!(signal.uptrend);
        assert!(!signal.is_pullback);
        assert!(!signal.is_candidate);
    }

    #[test]
    fn downtrend_is_not_a_candidate() {
        let closes: Vec<f64> = (0..250).map(|i| 300.0 - i as f64 * 0.5).collect();
        let h = make_history("TEST", &closes);
        let signal = evaluate_pullback(&h).unwrap();

        assert!(!signal.uptrend);
        assert!(!signal.is_candidate);
    }

    #[test]
    fn short_history_yields_none() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let h = make_history("TEST", &closes);
        assert!(evaluate_pullback(&h).is_none());
    }

    #[test]
    fn bounce_score_is_bounded() {
        let h = make_history("TEST", &pullback_closes());
        let signal = evaluate_pullback(&h).unwrap();
        assert!(signal.bounce_score <= 100);
    }
}
