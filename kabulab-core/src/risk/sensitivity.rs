//! Per-stock shock sensitivity: how hard does a market shock hit this
//! position?
//!
//! Two multiplier layers, both centered on 1.0 and clamped to 0.5–2.0:
//!
//! - fundamental: PER, PBR, dividend, size, beta — expensive, small,
//!   high-beta names amplify shocks, cheap dividend payers damp them
//! - technical: RSI, distance from SMA50, 30-session surge, volatility
//!   heat — an overheated chart has further to fall
//!
//! Combined with the portfolio concentration multiplier they produce the
//! integrated shock (base shock scaled by all three) and the composite
//! deviation used by the scenario engine. The two layers also map to a
//! quadrant diagnosis: fragile-and-overheated is the dangerous corner.

use serde::{Deserialize, Serialize};

use crate::domain::StockMetrics;
use crate::indicators::{rsi, sma};

/// Sessions of history required before the technical layer engages.
const MIN_TECH_CLOSES: usize = 50;
/// Window for the "recent" leg of the volatility-heat ratio.
const VOL_HEAT_WINDOW: usize = 20;
/// Default base shock when no scenario supplies one.
pub const DEFAULT_BASE_SHOCK: f64 = -0.20;

const SENSITIVITY_FLOOR: f64 = 0.5;
const SENSITIVITY_CAP: f64 = 2.0;
/// Concentration multipliers below this floor are treated as noise.
const CONCENTRATION_FLOOR: f64 = 0.5;

/// Fundamental × technical corner diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quadrant {
    #[serde(rename = "最危険")]
    MostDangerous,
    #[serde(rename = "底抜けリスク")]
    BreakdownRisk,
    #[serde(rename = "短期調整リスク")]
    PullbackRisk,
    #[serde(rename = "耐性最強")]
    MostResilient,
    #[serde(rename = "中立")]
    Neutral,
}

impl Quadrant {
    /// Fragile above 1.2, sound below 1.0; overheated above 1.2,
    /// oversold below 0.9.
    pub fn classify(fundamental: f64, technical: f64) -> Self {
        let fragile = fundamental > 1.2;
        let sound = fundamental < 1.0;
        let overheated = technical > 1.2;
        let oversold = technical < 0.9;
        match (fragile, sound, overheated, oversold) {
            (true, _, true, _) => Quadrant::MostDangerous,
            (true, _, _, true) => Quadrant::BreakdownRisk,
            (_, true, true, _) => Quadrant::PullbackRisk,
            (_, true, _, true) => Quadrant::MostResilient,
            _ => Quadrant::Neutral,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quadrant::MostDangerous => "最危険",
            Quadrant::BreakdownRisk => "底抜けリスク",
            Quadrant::PullbackRisk => "短期調整リスク",
            Quadrant::MostResilient => "耐性最強",
            Quadrant::Neutral => "中立",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Quadrant::MostDangerous => "🔴",
            Quadrant::BreakdownRisk => "⚠",
            Quadrant::PullbackRisk => "⚠",
            Quadrant::MostResilient => "✅",
            Quadrant::Neutral => "○",
        }
    }
}

/// Shock sensitivity for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockSensitivity {
    pub symbol: String,
    pub fundamental: f64,
    pub technical: f64,
    /// Portfolio concentration multiplier this was assessed under.
    pub concentration: f64,
    pub quadrant: Quadrant,
    /// Base shock scaled by all three multipliers.
    pub integrated_shock: f64,
    /// Deviation of the combined multiplier from neutral, used by the
    /// scenario engine as a per-stock adjustment.
    pub composite_shock: f64,
}

/// Computes shock sensitivities.
#[derive(Debug, Clone)]
pub struct SensitivityAnalyzer {
    pub base_shock: f64,
}

impl Default for SensitivityAnalyzer {
    fn default() -> Self {
        Self {
            base_shock: DEFAULT_BASE_SHOCK,
        }
    }
}

impl SensitivityAnalyzer {
    /// Assesses one stock. `closes` may be empty or short; the technical
    /// layer stays neutral until 50 sessions are available.
    pub fn assess(
        &self,
        metrics: &StockMetrics,
        closes: &[f64],
        concentration_multiplier: f64,
    ) -> ShockSensitivity {
        let fundamental = fundamental_sensitivity(metrics);
        let technical = technical_sensitivity(closes);
        let concentration = concentration_multiplier.max(CONCENTRATION_FLOOR);
        let combined = fundamental * technical * concentration;
        ShockSensitivity {
            symbol: metrics.symbol.clone(),
            fundamental,
            technical,
            concentration: concentration_multiplier,
            quadrant: Quadrant::classify(fundamental, technical),
            integrated_shock: self.base_shock * combined,
            composite_shock: combined - 1.0,
        }
    }
}

/// Fundamental multiplier: weighted PER/PBR/dividend/size/beta bands.
pub fn fundamental_sensitivity(m: &StockMetrics) -> f64 {
    let per = match m.per {
        Some(p) if p <= 0.0 => 1.5,
        Some(p) if p < 15.0 => 0.7,
        Some(p) if p <= 30.0 => 1.0,
        Some(_) => 1.5,
        None => 1.0,
    };
    let pbr = match m.pbr {
        Some(p) if p <= 0.0 => 1.0,
        Some(p) if p < 1.0 => 0.7,
        Some(p) if p <= 3.0 => 1.0,
        Some(_) => 1.3,
        None => 1.0,
    };
    let dividend = match m.dividend_yield {
        Some(d) if d >= 0.03 => 0.7,
        Some(d) if d >= 0.01 => 1.0,
        Some(_) => 1.3,
        // No dividend data usually means no dividend.
        None => 1.3,
    };
    let size = match m.market_cap {
        Some(c) if c >= 1e12 => 0.8,
        Some(c) if c >= 1e11 => 1.0,
        Some(c) if c > 0.0 => 1.3,
        _ => 1.0,
    };
    let beta = match m.beta {
        Some(b) if b <= 0.0 => 1.0,
        Some(b) if b < 0.8 => 0.8,
        Some(b) if b <= 1.2 => 1.0,
        Some(b) => (1.0 + (b - 1.2) * 0.5).min(2.0),
        None => 1.0,
    };

    let weighted =
        per * 0.30 + pbr * 0.20 + dividend * 0.20 + size * 0.15 + beta * 0.15;
    weighted.clamp(SENSITIVITY_FLOOR, SENSITIVITY_CAP)
}

/// Technical multiplier: RSI, SMA50 deviation, 30-session surge,
/// volatility heat. Neutral 1.0 below 50 sessions.
pub fn technical_sensitivity(closes: &[f64]) -> f64 {
    if closes.len() < MIN_TECH_CLOSES {
        return 1.0;
    }
    let n = closes.len();
    let price = closes[n - 1];

    let rsi_component = match rsi(closes, 14).last().copied().filter(|v| v.is_finite()) {
        Some(r) if r > 70.0 => 1.5,
        Some(r) if r > 50.0 => 1.0,
        Some(r) if r > 30.0 => 0.8,
        Some(_) => 0.9,
        None => 1.0,
    };

    let ma_component = match sma(closes, 50).last().copied().filter(|v| v.is_finite() && *v > 0.0) {
        Some(s50) => {
            let dev = (price - s50) / s50;
            if dev >= 0.15 {
                1.5
            } else if dev >= 0.05 {
                1.2
            } else if dev >= -0.05 {
                1.0
            } else if dev >= -0.15 {
                0.8
            } else {
                0.7
            }
        }
        None => 1.0,
    };

    let surge_component = match closes.get(n - 31).copied().filter(|c| *c > 0.0) {
        Some(past) => {
            let surge = price / past - 1.0;
            if surge >= 0.20 {
                1.5
            } else if surge >= 0.10 {
                1.2
            } else if surge >= 0.0 {
                1.0
            } else {
                0.8
            }
        }
        None => 1.0,
    };

    let returns = pct_returns(closes);
    let heat_component = match volatility_heat(&returns) {
        Some(h) if h >= 1.5 => 1.3,
        Some(h) if h >= 1.0 => 1.0,
        Some(_) => 0.9,
        None => 1.0,
    };

    let weighted: f64 = rsi_component * 0.35
        + ma_component * 0.25
        + surge_component * 0.25
        + heat_component * 0.15;
    weighted.clamp(SENSITIVITY_FLOOR, SENSITIVITY_CAP)
}

fn pct_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Recent volatility over baseline volatility. `None` when the baseline
/// is flat.
fn volatility_heat(returns: &[f64]) -> Option<f64> {
    if returns.len() < VOL_HEAT_WINDOW {
        return None;
    }
    let recent = stddev(&returns[returns.len() - VOL_HEAT_WINDOW..]);
    let baseline = stddev(returns);
    (baseline > 0.0).then(|| recent / baseline)
}

fn stddev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}
