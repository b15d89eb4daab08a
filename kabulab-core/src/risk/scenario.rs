//! Scenario application: propagate a catalog scenario through stocks and
//! portfolios, producing impact numbers and a human-readable causal
//! chain.
//!
//! Target groups match on sector, region or currency. Region and
//! currency fall back to the ticker-suffix convention (.T is
//! Japan/JPY, .SI is Singapore/SGD, ...) when the metrics do not carry
//! them. Each stock's impact is the base shock scaled by beta, plus the
//! average of its matched group impacts, adjusted by its composite
//! sensitivity, plus the currency effect for non-JPY holdings.

use serde::{Deserialize, Serialize};

use super::catalog::{ScenarioCatalog, ScenarioDefinition, ScenarioImpact};
use crate::domain::StockMetrics;

/// Fraction of the composite sensitivity applied as an impact
/// adjustment.
const COMPOSITE_ADJUSTMENT_GAIN: f64 = 0.2;

const ASEAN_REGIONS: &[&str] = &["Singapore", "Thailand", "Malaysia", "Indonesia", "Philippines"];
const CHINA_REGIONS: &[&str] = &["China", "Hong Kong"];
const TECH_SECTORS: &[&str] = &["Technology", "Communication Services"];

/// Overall portfolio judgment for one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioJudgment {
    #[serde(rename = "要対応")]
    ActionRequired,
    #[serde(rename = "認識")]
    Acknowledge,
    #[serde(rename = "継続")]
    Continue,
}

impl ScenarioJudgment {
    pub fn from_impact(portfolio_impact: f64) -> Self {
        if portfolio_impact <= -0.30 {
            ScenarioJudgment::ActionRequired
        } else if portfolio_impact <= -0.15 {
            ScenarioJudgment::Acknowledge
        } else {
            ScenarioJudgment::Continue
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScenarioJudgment::ActionRequired => "要対応",
            ScenarioJudgment::Acknowledge => "認識",
            ScenarioJudgment::Continue => "継続",
        }
    }
}

/// Scenario impact on one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockImpact {
    pub symbol: String,
    /// Direct (equity) impact, fractional.
    pub direct_impact: f64,
    /// FX translation impact for non-JPY holdings, fractional.
    pub currency_impact: f64,
    pub total_impact: f64,
    /// Expected price move per share, in trading currency.
    pub price_impact: f64,
    /// `total_impact` × portfolio weight; set during portfolio
    /// assessment, zero for standalone stock assessments.
    pub portfolio_contribution: f64,
    /// Step-by-step derivation, display-ready.
    pub causal_chain: Vec<String>,
}

/// Scenario impact on a whole portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAssessment {
    pub key: String,
    pub name: String,
    /// Weighted sum of per-stock impacts, fractional.
    pub portfolio_impact: f64,
    /// Weighted average per-share price move.
    pub portfolio_value_change: f64,
    pub judgment: ScenarioJudgment,
    pub stocks: Vec<StockImpact>,
    pub causal_chain_summary: String,
    pub offsets: Vec<String>,
    pub time_axis: String,
}

/// Applies catalog scenarios to stocks and portfolios.
#[derive(Debug, Clone, Default)]
pub struct ScenarioEngine {
    catalog: ScenarioCatalog,
}

impl ScenarioEngine {
    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    pub fn resolve(&self, query: &str) -> Option<&ScenarioDefinition> {
        self.catalog.resolve(query)
    }

    /// Assesses one stock under a scenario. `composite_shock` is the
    /// deviation from the sensitivity analyzer (0.0 when unknown).
    pub fn assess_stock(
        &self,
        scenario: &ScenarioDefinition,
        metrics: &StockMetrics,
        composite_shock: f64,
    ) -> StockImpact {
        let beta = metrics.beta.filter(|b| b.is_finite()).unwrap_or(1.0);
        let price = metrics.price.unwrap_or(0.0);
        let profile = StockProfile::of(metrics);

        let mut chain = Vec::new();
        let mut direct = scenario.base_shock * beta;
        chain.push(format!(
            "ベースショック {} x beta({:.2}) = {}",
            pct(scenario.base_shock),
            beta,
            pct(direct)
        ));

        let mut matched = Vec::new();
        for i in &scenario.primary {
            if profile.matches(&i.target) {
                chain.push(format!("[一次] {}: {}（{}）", i.target, pct(i.impact), i.reason));
                matched.push(i.impact);
            }
        }
        for i in &scenario.secondary {
            if profile.matches(&i.target) {
                chain.push(format!("[二次] {}: {}（{}）", i.target, pct(i.impact), i.reason));
                matched.push(i.impact);
            }
        }
        if !matched.is_empty() {
            direct += matched.iter().sum::<f64>() / matched.len() as f64;
        }

        if composite_shock != 0.0 {
            let factor = 1.0 + composite_shock * COMPOSITE_ADJUSTMENT_GAIN;
            direct *= factor;
            chain.push(format!(
                "感応度調整: composite_shock={composite_shock:+.2} → 影響率 x{factor:.2}"
            ));
        }

        let currency_impact = if profile.currency != "JPY" {
            let c = scenario.currency.impact_on_foreign;
            chain.push(format!(
                "通貨効果: USD/JPY {:+.0}円 → 外貨資産 {}",
                scenario.currency.usd_jpy_move,
                pct(c)
            ));
            c
        } else {
            0.0
        };

        let total = direct + currency_impact;
        chain.push(format!(
            "合計影響: 直接{} + 通貨{} = {}",
            pct(direct),
            pct(currency_impact),
            pct(total)
        ));

        StockImpact {
            symbol: metrics.symbol.clone(),
            direct_impact: round4(direct),
            currency_impact: round4(currency_impact),
            total_impact: round4(total),
            price_impact: round2(price * total),
            portfolio_contribution: 0.0,
            causal_chain: chain,
        }
    }

    /// Assesses a portfolio. `composite_shocks` pads with 0.0 when
    /// shorter than `stocks`; missing `weights` split the unassigned
    /// remainder equally.
    pub fn assess_portfolio(
        &self,
        scenario: &ScenarioDefinition,
        stocks: &[StockMetrics],
        composite_shocks: &[f64],
        weights: &[f64],
    ) -> ScenarioAssessment {
        let known: f64 = weights.iter().take(stocks.len()).sum();
        let missing = stocks.len().saturating_sub(weights.len());
        let fill = if missing > 0 {
            (1.0 - known).max(0.0) / missing as f64
        } else {
            0.0
        };

        let mut impacts = Vec::with_capacity(stocks.len());
        let mut portfolio_impact = 0.0;
        let mut value_change = 0.0;
        for (i, m) in stocks.iter().enumerate() {
            let composite = composite_shocks.get(i).copied().unwrap_or(0.0);
            let weight = weights.get(i).copied().unwrap_or(fill);
            let mut impact = self.assess_stock(scenario, m, composite);
            impact.portfolio_contribution = round4(impact.total_impact * weight);
            portfolio_impact += impact.portfolio_contribution;
            value_change += impact.price_impact * weight;
            impacts.push(impact);
        }

        ScenarioAssessment {
            key: scenario.key.clone(),
            name: scenario.name.clone(),
            portfolio_impact: round4(portfolio_impact),
            portfolio_value_change: round2(value_change),
            judgment: ScenarioJudgment::from_impact(portfolio_impact),
            stocks: impacts,
            causal_chain_summary: causal_summary(scenario, portfolio_impact),
            offsets: scenario.offsets.clone(),
            time_axis: scenario.time_axis.clone(),
        }
    }
}

/// Resolved sector/region/currency view of one stock, explicit metrics
/// first, suffix convention as fallback.
struct StockProfile<'a> {
    sector: Option<&'a str>,
    region: &'a str,
    currency: &'a str,
}

impl<'a> StockProfile<'a> {
    fn of(m: &'a StockMetrics) -> Self {
        Self {
            sector: m.sector.as_deref(),
            region: m
                .region
                .as_deref()
                .unwrap_or_else(|| region_from_symbol(&m.symbol)),
            currency: m
                .currency
                .as_deref()
                .unwrap_or_else(|| currency_from_symbol(&m.symbol)),
        }
    }

    fn matches(&self, target: &str) -> bool {
        match target {
            "日本株全般" => self.region == "Japan",
            "米国株全般" | "米国株(円建て)" => self.region == "US",
            "ASEAN株" => ASEAN_REGIONS.contains(&self.region),
            "中国関連株" => CHINA_REGIONS.contains(&self.region),
            "円建て" | "円建て外貨資産" => self.currency == "JPY",
            "全外貨資産" => self.currency != "JPY",
            "日本輸出株" | "輸出企業" | "日本内需株" | "内需企業" => {
                self.region == "Japan" && self.sector_in(target_sectors(target))
            }
            "非テック株" => match self.sector {
                Some(s) => !TECH_SECTORS.contains(&s),
                None => true,
            },
            // Asset classes the portfolio cannot hold as listed stocks.
            "高配当株" | "長期債" | "金・安全資産" => false,
            other => self.sector_in(target_sectors(other)),
        }
    }

    fn sector_in(&self, sectors: Option<&[&str]>) -> bool {
        match (self.sector, sectors) {
            (Some(sector), Some(list)) => list.contains(&sector),
            _ => false,
        }
    }
}

fn target_sectors(target: &str) -> Option<&'static [&'static str]> {
    match target {
        "グロース株" | "テック株" => Some(TECH_SECTORS),
        "輸出企業" | "日本輸出株" => {
            Some(&["Industrials", "Consumer Cyclical", "Technology"])
        }
        "内需企業" | "日本内需株" => {
            Some(&["Consumer Defensive", "Utilities", "Real Estate"])
        }
        "銀行" => Some(&["Financial Services"]),
        "不動産" => Some(&["Real Estate"]),
        "シクリカル株" => Some(&["Consumer Cyclical", "Industrials", "Basic Materials"]),
        "ディフェンシブ株" => Some(&["Consumer Defensive", "Healthcare", "Utilities"]),
        "半導体" => Some(&["Technology"]),
        "防衛関連" => Some(&["Industrials"]),
        "エネルギー株" => Some(&["Energy"]),
        "素材株" => Some(&["Basic Materials"]),
        "消費関連" => Some(&["Consumer Cyclical", "Consumer Defensive"]),
        _ => None,
    }
}

/// Ticker-suffix → trading currency. No suffix reads as a US listing.
pub fn currency_from_symbol(symbol: &str) -> &'static str {
    match suffix(symbol) {
        Some("T") => "JPY",
        Some("SI") => "SGD",
        Some("BK") => "THB",
        Some("KL") => "MYR",
        Some("JK") => "IDR",
        Some("PS") => "PHP",
        _ => "USD",
    }
}

/// Ticker-suffix → listing region.
pub fn region_from_symbol(symbol: &str) -> &'static str {
    match suffix(symbol) {
        Some("T") => "Japan",
        Some("SI") => "Singapore",
        Some("BK") => "Thailand",
        Some("KL") => "Malaysia",
        Some("JK") => "Indonesia",
        Some("PS") => "Philippines",
        _ => "US",
    }
}

fn suffix(symbol: &str) -> Option<&str> {
    symbol.rsplit_once('.').map(|(_, s)| s)
}

fn causal_summary(scenario: &ScenarioDefinition, portfolio_impact: f64) -> String {
    let mut lines = vec![
        format!("トリガー: {}", scenario.trigger),
        format!("ベースショック: {}", pct(scenario.base_shock)),
    ];
    if !scenario.primary.is_empty() {
        lines.push(format!("[一次] {}", join_impacts(&scenario.primary)));
    }
    if !scenario.secondary.is_empty() {
        lines.push(format!("[二次] {}", join_impacts(&scenario.secondary)));
    }
    lines.push(format!(
        "[為替] USD/JPY {:+.0}円 → 外貨資産 {}",
        scenario.currency.usd_jpy_move,
        pct(scenario.currency.impact_on_foreign)
    ));
    lines.push(format!("PF全体影響: {}", pct(portfolio_impact)));
    lines.join("\n  ↓\n")
}

fn join_impacts(impacts: &[ScenarioImpact]) -> String {
    impacts
        .iter()
        .map(|i| format!("{} {}（{}）", i.target, pct(i.impact), i.reason))
        .collect::<Vec<_>>()
        .join("、")
}

fn pct(v: f64) -> String {
    format!("{:+.1}%", v * 100.0)
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
