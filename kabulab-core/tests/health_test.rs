//! Integration tests for the health pipeline on synthetic price series.
//!
//! Each test runs the real chain — price history → trend evaluation →
//! change-quality scoring → health machine — instead of hand-built
//! snapshots, so the pieces are exercised against each other:
//!
//! 1. Steady uptrend with improving fundamentals stays healthy
//! 2. Trend collapse plus a deteriorating book is the exit signal
//! 3. ETFs are judged on technicals alone
//! 4. Value-trap flags raise an otherwise healthy position
//! 5. Payout cuts feed the level through the stability input

use chrono::{Duration, NaiveDate};
use kabulab_core::domain::{DailyBar, PriceHistory, StockMetrics};
use kabulab_core::health::{detect_value_trap, HealthEngine, HealthInput, HealthLevel};
use kabulab_core::scoring::{AlphaScorer, QualityLabel, ReturnStability, StabilityReport};
use kabulab_core::signals::{evaluate_trend, TrendDirection};

fn history(symbol: &str, closes: &[f64]) -> PriceHistory {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| DailyBar {
            date: base + Duration::days(i as i64),
            close,
            volume: 150_000,
        })
        .collect();
    PriceHistory::new(symbol, bars)
}

/// 260 bars compounding at +0.3% a day.
fn uptrend(symbol: &str) -> PriceHistory {
    let closes: Vec<f64> = (0..260).map(|i| 100.0 * 1.003_f64.powi(i)).collect();
    history(symbol, &closes)
}

/// 150 flat bars, then 110 bars bleeding -1% a day. The 50-day average
/// sits below the 200-day for the whole scan window.
fn collapse(symbol: &str) -> PriceHistory {
    let mut closes = vec![100.0; 150];
    let mut price = 100.0;
    for _ in 0..110 {
        price *= 0.99;
        closes.push(price);
    }
    history(symbol, &closes)
}

fn improving_metrics(symbol: &str) -> StockMetrics {
    StockMetrics {
        symbol: symbol.to_string(),
        net_income: Some(100.0),
        net_income_prior: Some(95.0),
        operating_cash_flow: Some(150.0),
        total_assets: Some(1_000.0),
        free_cash_flow: Some(120.0),
        free_cash_flow_prior: Some(90.0),
        revenue_history: vec![130.0, 110.0, 100.0],
        net_income_history: vec![100.0, 90.0, 80.0],
        equity_history: vec![1_000.0, 950.0, 900.0],
        ..Default::default()
    }
}

fn assess(
    history: &PriceHistory,
    metrics: &StockMetrics,
    stability: Option<ReturnStability>,
) -> kabulab_core::health::HealthReport {
    let technical = evaluate_trend(history);
    let quality = AlphaScorer.score(metrics).map(|s| s.label);
    let trap = detect_value_trap(metrics);
    HealthEngine.assess(HealthInput {
        technical: &technical,
        quality,
        value_trap: Some(&trap),
        stability,
        is_etf: metrics.is_etf,
    })
}

#[test]
fn uptrend_with_improving_book_is_healthy() {
    let h = uptrend("7203.T");
    let technical = evaluate_trend(&h);
    assert_eq!(technical.trend, TrendDirection::Rising);
    assert!(technical.above_sma50);
    assert!(technical.above_sma200);
    assert!(!technical.dead_cross);
    assert!(technical.golden_cross.is_none());

    let report = assess(&h, &improving_metrics("7203.T"), None);
    assert_eq!(report.level, HealthLevel::Healthy);
    assert!(report.reasons.is_empty());
}

#[test]
fn trend_collapse_with_deterioration_is_exit() {
    // Two of four quality signals down: revenue deceleration and an FCF
    // conversion slip on top of the improving base.
    let metrics = StockMetrics {
        revenue_history: vec![100.0, 105.0, 100.0],
        free_cash_flow: Some(-10.0),
        free_cash_flow_prior: Some(50.0),
        ..improving_metrics("5401.T")
    };
    let quality = AlphaScorer.score(&metrics).unwrap();
    assert_eq!(quality.label, QualityLabel::OneDown);

    let h = collapse("5401.T");
    let technical = evaluate_trend(&h);
    assert!(technical.dead_cross);
    assert_eq!(technical.trend, TrendDirection::Falling);
    // The flip itself predates the scan window, so it is state, not event.
    assert!(technical.death_cross.is_none());

    let report = assess(&h, &metrics, None);
    assert_eq!(report.level, HealthLevel::Exit);
    assert_eq!(report.reasons, vec!["トレンド崩壊（デッドクロス + ファンダ悪化）"]);
}

#[test]
fn etf_is_judged_on_technicals_alone() {
    // A year of gains, then one -10% session: price pierces the 50-day
    // average and the RSI collapses, but the long trend is intact.
    let mut closes: Vec<f64> = (0..219).map(|i| 100.0 * 1.003_f64.powi(i)).collect();
    let last = *closes.last().unwrap();
    closes.push(last * 0.9);
    let h = history("1306.T", &closes);

    let technical = evaluate_trend(&h);
    assert!(!technical.above_sma50);
    assert!(!technical.dead_cross);
    assert!(technical.rsi_sharp_drop);

    let metrics = StockMetrics {
        symbol: "1306.T".to_string(),
        is_etf: true,
        ..Default::default()
    };
    let quality = AlphaScorer.score(&metrics).unwrap();
    assert_eq!(quality.label, QualityLabel::NotApplicable);

    let report = assess(&h, &metrics, None);
    assert_eq!(report.level, HealthLevel::EarlyWarning);
    assert_eq!(report.reasons.len(), 2);
    assert!(report.reasons[0].contains("SMA50を下回り"));
    assert!(report.reasons[1].contains("RSI急低下"));
}

#[test]
fn value_trap_raises_a_healthy_uptrend() {
    // Cheap on earnings with profits slipping: the chart says nothing is
    // wrong, the trap detector says look closer.
    let metrics = StockMetrics {
        per: Some(6.0),
        eps_growth: Some(-0.05),
        ..improving_metrics("8306.T")
    };
    let quality = AlphaScorer.score(&metrics).unwrap();
    assert_eq!(quality.label, QualityLabel::Good);
    assert!(!quality.penalized);

    let report = assess(&uptrend("8306.T"), &metrics, None);
    assert_eq!(report.level, HealthLevel::EarlyWarning);
    assert_eq!(report.reasons, vec!["低PERだが利益減少中"]);
}

#[test]
fn payout_cut_feeds_the_level() {
    let metrics = StockMetrics {
        market_cap: Some(1_000.0),
        dividend_paid_history: vec![-10.0, -20.0, -22.0],
        ..improving_metrics("9434.T")
    };
    let stability = StabilityReport::from_metrics(&metrics);
    assert_eq!(stability.stability, ReturnStability::Decreasing);

    let report = assess(&uptrend("9434.T"), &metrics, Some(stability.stability));
    assert_eq!(report.level, HealthLevel::Caution);
    assert!(report.reasons.contains(&"株主還元の減少傾向".to_string()));
}
