//! Position health: one alert level per holding, with reasons.
//!
//! The machine combines the technical snapshot with the change-quality
//! label and escalates along Healthy → EarlyWarning → Caution → Exit:
//!
//! - a dead cross on its own is survivable; a dead cross plus broad
//!   fundamental deterioration is the exit signal
//! - good fundamentals soften a technical breakdown to Caution — the
//!   thesis may be intact even when the chart is not
//! - ETFs (and stocks with no computable quality signal) are judged on
//!   technicals alone, accumulating reasons instead of short-circuiting
//!
//! Value-trap flags and payout-stability warnings arrive as a second
//! pass and can only raise the level, never lower it.

pub mod suitability;
pub mod value_trap;

pub use suitability::{assess_suitability, SuitabilityReport, SuitabilityVerdict};
pub use value_trap::{detect_value_trap, ValueTrapReport};

use serde::{Deserialize, Serialize};

use crate::scoring::{QualityLabel, ReturnStability};
use crate::signals::{TechnicalSnapshot, TrendDirection};

/// A death cross this recent gets annotated on every verdict.
const DEATH_CROSS_NOTE_DAYS: usize = 10;
/// A golden cross this recent is worth watching for a trend turn.
const GOLDEN_CROSS_NOTE_DAYS: usize = 20;

/// Alert level, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HealthLevel {
    #[serde(rename = "なし")]
    Healthy,
    #[serde(rename = "早期警告")]
    EarlyWarning,
    #[serde(rename = "注意")]
    Caution,
    #[serde(rename = "撤退")]
    Exit,
}

impl HealthLevel {
    pub fn icon(self) -> &'static str {
        match self {
            HealthLevel::Healthy => "",
            HealthLevel::EarlyWarning => "⚡",
            HealthLevel::Caution => "⚠",
            HealthLevel::Exit => "🚨",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthLevel::Healthy => "なし",
            HealthLevel::EarlyWarning => "早期警告",
            HealthLevel::Caution => "注意",
            HealthLevel::Exit => "撤退",
        }
    }
}

impl std::fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.icon(), self.label())
    }
}

/// Everything the machine looks at for one symbol.
#[derive(Debug, Clone, Copy)]
pub struct HealthInput<'a> {
    pub technical: &'a TechnicalSnapshot,
    /// Change-quality label; `None` when no signal was computable.
    pub quality: Option<QualityLabel>,
    pub value_trap: Option<&'a ValueTrapReport>,
    pub stability: Option<ReturnStability>,
    pub is_etf: bool,
}

/// The verdict: an alert level and the reasons behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub symbol: String,
    pub level: HealthLevel,
    pub reasons: Vec<String>,
}

/// Runs the health state machine.
#[derive(Debug, Clone, Default)]
pub struct HealthEngine;

impl HealthEngine {
    pub fn assess(&self, input: HealthInput<'_>) -> HealthReport {
        let t = input.technical;
        let technical_only =
            input.is_etf || matches!(input.quality, None | Some(QualityLabel::NotApplicable));

        let (mut level, mut reasons) = if technical_only {
            assess_technical_only(t)
        } else {
            // quality is Good / OneDown / MultipleDown here
            assess_equity(t, input.quality.unwrap_or(QualityLabel::Good))
        };

        if let Some(death) = &t.death_cross {
            if death.days_ago <= DEATH_CROSS_NOTE_DAYS {
                reasons.push(format!(
                    "デッドクロス発生（{}日前、{}）",
                    death.days_ago, death.date
                ));
            }
        }
        if let Some(golden) = &t.golden_cross {
            if golden.days_ago <= GOLDEN_CROSS_NOTE_DAYS {
                level = level.max(HealthLevel::EarlyWarning);
                reasons.push(format!(
                    "ゴールデンクロス発生（{}日前、{}）- 上昇トレンド転換の可能性",
                    golden.days_ago, golden.date
                ));
            }
        }
        if let Some(trap) = input.value_trap {
            if trap.is_trap() {
                level = level.max(HealthLevel::EarlyWarning);
                reasons.extend(trap.reasons.iter().cloned());
            }
        }
        match input.stability {
            Some(ReturnStability::Temporary) => {
                level = level.max(HealthLevel::EarlyWarning);
                reasons.push("株主還元が一時的な高還元の可能性".to_string());
            }
            Some(ReturnStability::Decreasing) => {
                level = level.max(HealthLevel::Caution);
                reasons.push("株主還元の減少傾向".to_string());
            }
            _ => {}
        }

        HealthReport {
            symbol: t.symbol.clone(),
            level,
            reasons,
        }
    }
}

/// Equity path: first matching rule wins, ordered worst-first.
fn assess_equity(t: &TechnicalSnapshot, quality: QualityLabel) -> (HealthLevel, Vec<String>) {
    use QualityLabel::*;

    if t.dead_cross && quality == MultipleDown {
        return (
            HealthLevel::Exit,
            vec!["デッドクロス + 変化スコア複数悪化".to_string()],
        );
    }
    if t.dead_cross && t.trend == TrendDirection::Falling {
        return if quality == Good {
            (
                HealthLevel::Caution,
                vec!["デッドクロス（ファンダメンタル良好のためCAUTION）".to_string()],
            )
        } else {
            (
                HealthLevel::Exit,
                vec!["トレンド崩壊（デッドクロス + ファンダ悪化）".to_string()],
            )
        };
    }
    if t.sma_approaching && matches!(quality, OneDown | MultipleDown) {
        let quality_reason = if quality == OneDown {
            "変化スコア1指標悪化"
        } else {
            "変化スコア複数悪化"
        };
        return (
            HealthLevel::Caution,
            vec![quality_reason.to_string(), "SMA50がSMA200に接近".to_string()],
        );
    }
    if quality == MultipleDown {
        return (
            HealthLevel::Caution,
            vec!["変化スコア複数悪化".to_string()],
        );
    }
    if !t.above_sma50 {
        return (HealthLevel::EarlyWarning, vec![below_sma50_reason(t)]);
    }
    if t.rsi_sharp_drop {
        return (HealthLevel::EarlyWarning, vec![rsi_drop_reason(t)]);
    }
    if quality == OneDown {
        return (
            HealthLevel::EarlyWarning,
            vec!["変化スコア1指標悪化".to_string()],
        );
    }
    (HealthLevel::Healthy, Vec::new())
}

/// Technical-only path: every firing signal contributes a reason, the
/// level is the worst of them.
fn assess_technical_only(t: &TechnicalSnapshot) -> (HealthLevel, Vec<String>) {
    let mut level = HealthLevel::Healthy;
    let mut reasons = Vec::new();

    if !t.above_sma50 {
        level = level.max(HealthLevel::EarlyWarning);
        reasons.push(below_sma50_reason(t));
    }
    if t.dead_cross {
        level = level.max(HealthLevel::Caution);
        reasons.push("デッドクロス（SMA50がSMA200を下回り）".to_string());
    }
    if t.rsi_sharp_drop {
        level = level.max(HealthLevel::EarlyWarning);
        reasons.push(rsi_drop_reason(t));
    }
    (level, reasons)
}

fn below_sma50_reason(t: &TechnicalSnapshot) -> String {
    match t.sma50 {
        Some(s) => format!("SMA50を下回り（現在{:.2}、SMA50={:.2}）", t.price, s),
        None => "SMA50を下回り".to_string(),
    }
}

fn rsi_drop_reason(t: &TechnicalSnapshot) -> String {
    match t.rsi14 {
        Some(r) => format!("RSI急低下（{r:.1}）"),
        None => "RSI急低下".to_string(),
    }
}
