//! The built-in stress-scenario catalog.
//!
//! Eight macro scenarios, each with a trigger narrative, a base shock,
//! primary and secondary target impacts, a currency effect and the
//! offsetting factors worth remembering when the headline number looks
//! scary. Queries resolve through exact keys, an alias table, then a
//! substring match so that "日銀" or "tech" finds the right scenario.

use serde::{Deserialize, Serialize};

/// One target-group impact within a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioImpact {
    /// Target group label ("グロース株", "全外貨資産", ...).
    pub target: String,
    /// Fractional price impact on the group.
    pub impact: f64,
    pub reason: String,
}

/// USD/JPY move and its effect on foreign-currency assets in JPY terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrencyEffect {
    /// Yen move, e.g. +15.0 means USD/JPY up 15 yen.
    pub usd_jpy_move: f64,
    /// Fractional JPY-terms impact on non-JPY assets.
    pub impact_on_foreign: f64,
}

/// A full scenario definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub key: String,
    pub name: String,
    pub trigger: String,
    /// Market-wide base shock, fractional.
    pub base_shock: f64,
    pub primary: Vec<ScenarioImpact>,
    pub secondary: Vec<ScenarioImpact>,
    pub currency: CurrencyEffect,
    /// Offsetting effects that soften the headline number.
    pub offsets: Vec<String>,
    /// How the scenario is expected to unfold over time.
    pub time_axis: String,
}

/// Alias → scenario key. Ordered so substring lookups are deterministic.
const ALIASES: &[(&str, &str)] = &[
    ("トリプル安", "triple_decline"),
    ("triple", "triple_decline"),
    ("株安・円安・債券安", "triple_decline"),
    ("ドル高", "yen_depreciation"),
    ("ドル高円安", "yen_depreciation"),
    ("円安", "yen_depreciation"),
    ("yen", "yen_depreciation"),
    ("為替ショック", "yen_depreciation"),
    ("リセッション", "us_recession"),
    ("recession", "us_recession"),
    ("景気後退", "us_recession"),
    ("米国リセッション", "us_recession"),
    ("利上げ", "boj_rate_hike"),
    ("日銀", "boj_rate_hike"),
    ("日銀利上げ", "boj_rate_hike"),
    ("金利上昇", "boj_rate_hike"),
    ("boj", "boj_rate_hike"),
    ("米中", "us_china_conflict"),
    ("米中対立", "us_china_conflict"),
    ("china", "us_china_conflict"),
    ("地政学リスク", "us_china_conflict"),
    ("貿易戦争", "us_china_conflict"),
    ("インフレ", "inflation_resurgence"),
    ("インフレ再燃", "inflation_resurgence"),
    ("inflation", "inflation_resurgence"),
    ("物価上昇", "inflation_resurgence"),
    ("テック暴落", "tech_crash"),
    ("tech暴落", "tech_crash"),
    ("ai暴落", "tech_crash"),
    ("ナスダック暴落", "tech_crash"),
    ("tech", "tech_crash"),
    ("テクノロジー暴落", "tech_crash"),
    ("円高ドル安", "yen_appreciation"),
    ("円高", "yen_appreciation"),
    ("ドル安", "yen_appreciation"),
];

/// The built-in catalog.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: Vec<ScenarioDefinition>,
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self {
            scenarios: builtin_scenarios(),
        }
    }
}

impl ScenarioCatalog {
    pub fn all(&self) -> &[ScenarioDefinition] {
        &self.scenarios
    }

    pub fn by_key(&self, key: &str) -> Option<&ScenarioDefinition> {
        self.scenarios.iter().find(|s| s.key == key)
    }

    /// Resolves a free-form query: exact key, exact alias, then (for
    /// queries of two or more characters) substring in either direction.
    pub fn resolve(&self, query: &str) -> Option<&ScenarioDefinition> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return None;
        }
        if let Some(s) = self.by_key(&q) {
            return Some(s);
        }
        if let Some((_, key)) = ALIASES.iter().find(|(alias, _)| *alias == q) {
            return self.by_key(key);
        }
        if q.chars().count() >= 2 {
            if let Some((_, key)) = ALIASES
                .iter()
                .find(|(alias, _)| alias.contains(q.as_str()) || q.contains(alias))
            {
                return self.by_key(key);
            }
        }
        None
    }
}

fn imp(target: &str, impact: f64, reason: &str) -> ScenarioImpact {
    ScenarioImpact {
        target: target.to_string(),
        impact,
        reason: reason.to_string(),
    }
}

fn builtin_scenarios() -> Vec<ScenarioDefinition> {
    vec![
        ScenarioDefinition {
            key: "triple_decline".into(),
            name: "トリプル安（株安・債券安・円安）".into(),
            trigger: "財政不安・格下げ".into(),
            base_shock: -0.20,
            primary: vec![
                imp("日本株全般", -0.12, "海外勢売り"),
                imp("円建て", -0.10, "円安15円"),
            ],
            secondary: vec![
                imp("グロース株", -0.12, "金利上昇"),
                imp("輸出企業", 0.06, "円安メリット"),
                imp("内需企業", -0.07, "コスト増"),
                imp("銀行", 0.06, "利ザヤ改善"),
            ],
            currency: CurrencyEffect {
                usd_jpy_move: 15.0,
                impact_on_foreign: 0.097,
            },
            offsets: vec![
                "輸出企業の円安メリット".into(),
                "銀行の金利上昇メリット".into(),
            ],
            time_axis: "即座→数週間で二次効果→介入で急反転リスク".into(),
        },
        ScenarioDefinition {
            key: "yen_depreciation".into(),
            name: "ドル高円安".into(),
            trigger: "日米金利差拡大".into(),
            base_shock: -0.10,
            primary: vec![
                imp("米国株(円建て)", 0.097, "為替益"),
                imp("日本輸出株", 0.06, "円安メリット"),
                imp("日本内需株", -0.07, "コスト増"),
            ],
            secondary: vec![imp("全外貨資産", -0.05, "介入→急反転リスク(165→158)")],
            currency: CurrencyEffect {
                usd_jpy_move: 10.0,
                impact_on_foreign: 0.065,
            },
            offsets: vec!["輸出企業メリット".into()],
            time_axis: "段階的: 155→165(プラス) → 165→175(警戒) → 介入(急反転)".into(),
        },
        ScenarioDefinition {
            key: "us_recession".into(),
            name: "米国リセッション".into(),
            trigger: "景気後退入り確認".into(),
            base_shock: -0.25,
            primary: vec![
                imp("米国株全般", -0.25, "企業業績悪化"),
                imp("シクリカル株", -0.35, "景気敏感"),
            ],
            secondary: vec![
                imp("日本輸出株", -0.15, "需要減"),
                imp("ASEAN株", -0.10, "資金引き揚げ"),
                imp("ディフェンシブ株", -0.05, "相対的に耐性"),
            ],
            currency: CurrencyEffect {
                usd_jpy_move: -10.0,
                impact_on_foreign: -0.065,
            },
            offsets: vec![
                "ディフェンシブ銘柄".into(),
                "円高で外貨建て資産のヘッジ効果".into(),
            ],
            time_axis: "確認→半年〜1年で底打ち→金融緩和で反転".into(),
        },
        ScenarioDefinition {
            key: "boj_rate_hike".into(),
            name: "日銀利上げ加速".into(),
            trigger: "インフレ持続で追加利上げ".into(),
            base_shock: -0.15,
            primary: vec![
                imp("グロース株", -0.15, "割引率上昇"),
                imp("不動産", -0.12, "金利コスト増"),
                imp("銀行", 0.08, "利ザヤ拡大"),
            ],
            secondary: vec![
                imp("高配当株", -0.05, "債券との比較劣後"),
                imp("円建て外貨資産", -0.05, "円高"),
            ],
            currency: CurrencyEffect {
                usd_jpy_move: -8.0,
                impact_on_foreign: -0.052,
            },
            offsets: vec![
                "銀行セクター上昇".into(),
                "円高で輸入コスト低下".into(),
            ],
            time_axis: "利上げ発表→即座に反応→半年で織り込み".into(),
        },
        ScenarioDefinition {
            key: "us_china_conflict".into(),
            name: "米中対立激化".into(),
            trigger: "関税・制裁強化".into(),
            base_shock: -0.15,
            primary: vec![
                imp("中国関連株", -0.20, "サプライチェーン混乱"),
                imp("半導体", -0.15, "輸出規制"),
            ],
            secondary: vec![
                imp("ASEAN株", 0.05, "サプライチェーン移転先"),
                imp("防衛関連", 0.08, "地政学リスク"),
            ],
            currency: CurrencyEffect {
                usd_jpy_move: -3.0,
                impact_on_foreign: -0.02,
            },
            offsets: vec![
                "ASEANへの生産移転メリット".into(),
                "防衛関連上昇".into(),
            ],
            time_axis: "発表→数日で急落→数ヶ月で代替先に資金移動".into(),
        },
        ScenarioDefinition {
            key: "inflation_resurgence".into(),
            name: "インフレ再燃".into(),
            trigger: "CPI再加速".into(),
            base_shock: -0.15,
            primary: vec![
                imp("グロース株", -0.18, "利上げ再開懸念"),
                imp("長期債", -0.10, "金利上昇"),
            ],
            secondary: vec![
                imp("エネルギー株", 0.10, "原油高"),
                imp("素材株", 0.05, "資源価格上昇"),
                imp("消費関連", -0.08, "購買力低下"),
            ],
            currency: CurrencyEffect {
                usd_jpy_move: 5.0,
                impact_on_foreign: 0.032,
            },
            offsets: vec![
                "コモディティ関連の上昇".into(),
                "インフレヘッジ資産".into(),
            ],
            time_axis: "CPI発表→即座に反応→3-6ヶ月で方向性確定".into(),
        },
        ScenarioDefinition {
            key: "tech_crash".into(),
            name: "テック暴落".into(),
            trigger: "AI収益化の失望・バリュエーション調整・規制強化".into(),
            base_shock: -0.30,
            primary: vec![
                imp("テック株", -0.35, "NASDAQ -30%、バリュエーション修正"),
                imp("半導体", -0.40, "AI関連の過剰期待修正"),
            ],
            secondary: vec![
                imp("非テック株", -0.08, "リスクオフ波及"),
                imp("ディフェンシブ株", -0.03, "質への逃避で相対的に耐性"),
                imp("金・安全資産", 0.06, "安全資産需要"),
            ],
            currency: CurrencyEffect {
                usd_jpy_move: -8.0,
                impact_on_foreign: -0.052,
            },
            offsets: vec![
                "ディフェンシブ銘柄の耐性".into(),
                "金・債券への資金逃避".into(),
                "円高による外貨資産圧縮".into(),
            ],
            time_axis: "暴落→数日で急落→数週間で二次波及→数ヶ月で底値模索".into(),
        },
        ScenarioDefinition {
            key: "yen_appreciation".into(),
            name: "円高ドル安".into(),
            trigger: "FRB利下げ加速＋日銀追加利上げ".into(),
            base_shock: -0.10,
            primary: vec![
                imp("全外貨資産", -0.13, "USD/JPY -20円 (153→133円)"),
                imp("日本輸出株", -0.12, "円高デメリット"),
            ],
            secondary: vec![
                imp("日本内需株", 0.04, "輸入コスト減"),
                imp("金・安全資産", 0.05, "ドル安で金価格上昇"),
            ],
            currency: CurrencyEffect {
                usd_jpy_move: -20.0,
                impact_on_foreign: -0.131,
            },
            offsets: vec![
                "内需企業の輸入コスト低下".into(),
                "日本国内消費改善".into(),
            ],
            time_axis: "FRB利下げ決定→数日で急速な円高→数ヶ月で新均衡".into(),
        },
    ]
}
