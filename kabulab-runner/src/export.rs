//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for run summaries:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: screening table, position book, rebalance plan, and
//!   backtest tape for spreadsheet analysis
//! - **Markdown**: a human-readable run report
//!
//! All persisted artifacts include a `schema_version` field. Unknown
//! versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use kabulab_core::backtest::BacktestReport;
use kabulab_core::domain::PortfolioSnapshot;
use kabulab_core::rebalance::RebalancePlan;

use crate::runner::{RunSummary, SCHEMA_VERSION};
use crate::screening::ScreeningReport;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunSummary` to pretty JSON.
pub fn export_json(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize RunSummary to JSON")
}

/// Deserialize a `RunSummary` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunSummary> {
    let summary: RunSummary =
        serde_json::from_str(json).context("failed to deserialize RunSummary from JSON")?;
    if summary.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            summary.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(summary)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the screening hits as CSV, best score first.
///
/// Columns: symbol, score, verdict, quality, shareholder_yield, price
pub fn export_screening_csv(report: &ScreeningReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "score",
        "verdict",
        "quality",
        "shareholder_yield",
        "price",
    ])?;

    for hit in &report.hits {
        wtr.write_record([
            hit.symbol(),
            &format!("{:.1}", hit.value.score),
            hit.value.verdict.label(),
            hit.quality.as_ref().map_or("", |q| q.label.label()),
            &hit
                .shareholder_yield
                .map_or(String::new(), |y| format!("{y:.4}")),
            &hit.price.map_or(String::new(), |p| format!("{p:.2}")),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the valued position book as CSV, cash rows included.
///
/// Columns: symbol, name, sector, currency, shares, cost_price,
/// current_price, value_jpy, unrealized_pnl_jpy, pnl_rate, weight, priced
pub fn export_valuation_csv(snapshot: &PortfolioSnapshot) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "name",
        "sector",
        "currency",
        "shares",
        "cost_price",
        "current_price",
        "value_jpy",
        "unrealized_pnl_jpy",
        "pnl_rate",
        "weight",
        "priced",
    ])?;

    for pos in &snapshot.positions {
        wtr.write_record([
            &pos.symbol,
            pos.name.as_deref().unwrap_or(""),
            pos.sector.as_deref().unwrap_or(""),
            &pos.currency,
            &pos.shares.to_string(),
            &format!("{:.2}", pos.cost_price),
            &format!("{:.2}", pos.current_price),
            &format!("{:.0}", pos.value_jpy),
            &format!("{:.0}", pos.unrealized_pnl_jpy),
            &format!("{:.4}", pos.pnl_rate),
            &format!("{:.4}", pos.weight),
            &pos.priced.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the rebalance actions as CSV, highest priority first.
///
/// Columns: priority, side, symbol, shares, amount_jpy, reason
pub fn export_plan_csv(plan: &RebalancePlan) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["priority", "side", "symbol", "shares", "amount_jpy", "reason"])?;

    for action in &plan.actions {
        wtr.write_record([
            &action.priority.to_string(),
            action.side.label(),
            &action.symbol,
            &action.shares.to_string(),
            &format!("{:.0}", action.amount_jpy),
            &action.reason,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the backtest tape as CSV, best performer first.
///
/// Columns: symbol, screened_date, screened_price, current_price, return_rate
pub fn export_backtest_csv(report: &BacktestReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "screened_date",
        "screened_price",
        "current_price",
        "return_rate",
    ])?;

    for perf in &report.performances {
        wtr.write_record([
            &perf.symbol,
            &perf.screened_date.to_string(),
            &format!("{:.2}", perf.screened_price),
            &format!("{:.2}", perf.current_price),
            &format!("{:.4}", perf.return_rate),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one run.
///
/// Creates a directory named `{run_date}_{config-id-prefix}/` under
/// `output_dir` containing:
/// - `summary.json` — the full `RunSummary`
/// - `screening.csv`, `valuation.csv`, `plan.csv` — always
/// - `backtest.csv` — when the run had prior history
/// - `report.md` — the Markdown report
///
/// Re-exporting the same run on the same day overwrites in place.
/// Returns the path to the created directory.
pub fn save_artifacts(summary: &RunSummary, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        summary.run_date.format("%Y%m%d"),
        short_id(&summary.config_id)
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(summary)?;
    std::fs::write(run_dir.join("summary.json"), &json)?;

    let screening_csv = export_screening_csv(&summary.screening)?;
    std::fs::write(run_dir.join("screening.csv"), &screening_csv)?;

    let valuation_csv = export_valuation_csv(&summary.valuation)?;
    std::fs::write(run_dir.join("valuation.csv"), &valuation_csv)?;

    let plan_csv = export_plan_csv(&summary.plan)?;
    std::fs::write(run_dir.join("plan.csv"), &plan_csv)?;

    if let Some(backtest) = &summary.backtest {
        let backtest_csv = export_backtest_csv(backtest)?;
        std::fs::write(run_dir.join("backtest.csv"), &backtest_csv)?;
    }

    let report = generate_report(summary);
    std::fs::write(run_dir.join("report.md"), &report)?;

    Ok(run_dir)
}

/// Load a `RunSummary` from an artifact directory's summary.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<RunSummary> {
    let summary_path = dir.join("summary.json");
    let json = std::fs::read_to_string(&summary_path)
        .with_context(|| format!("failed to read {}", summary_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for one run.
pub fn generate_report(summary: &RunSummary) -> String {
    fn pct(v: f64) -> String {
        format!("{:.2}%", v * 100.0)
    }
    fn yen(v: f64) -> String {
        format!("¥{v:.0}")
    }

    let mut md = String::with_capacity(4096);

    md.push_str("# スクリーニング実行レポート\n\n");

    // 概要
    md.push_str("## 概要\n\n");
    md.push_str("| 項目 | 値 |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| 実行日 | {} |\n", summary.run_date));
    md.push_str(&format!("| 設定ID | {} |\n", short_id(&summary.config_id)));
    md.push_str(&format!("| 対象銘柄 | {} |\n", summary.screening.screened));
    md.push_str(&format!("| 条件通過 | {} |\n", summary.screening.passed_filter));
    md.push_str(&format!("| 判定不能 | {} |\n", summary.screening.indeterminate));
    md.push_str(&format!("| ヒット | {} |\n", summary.screening.hits.len()));
    md.push('\n');

    // スクリーニング上位
    if !summary.screening.hits.is_empty() {
        md.push_str("## スクリーニング上位\n\n");
        md.push_str("| 銘柄 | スコア | 判定 | 変化品質 | 総還元利回り |\n");
        md.push_str("| --- | ---: | --- | --- | ---: |\n");
        for hit in summary.screening.hits.iter().take(10) {
            md.push_str(&format!(
                "| {} | {:.1} | {} | {} | {} |\n",
                hit.symbol(),
                hit.value.score,
                hit.value.verdict.label(),
                hit.quality.as_ref().map_or("-", |q| q.label.label()),
                hit.shareholder_yield.map_or("-".to_string(), pct),
            ));
        }
        md.push('\n');
    }

    // ポートフォリオ
    md.push_str("## ポートフォリオ\n\n");
    if summary.valuation.is_empty() {
        md.push_str("保有なし\n\n");
    } else {
        md.push_str("| 項目 | 値 |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!("| 評価額 | {} |\n", yen(summary.valuation.total_value_jpy)));
        md.push_str(&format!("| 取得額 | {} |\n", yen(summary.valuation.total_cost_jpy)));
        md.push_str(&format!("| 評価損益 | {} |\n", yen(summary.valuation.total_pnl_jpy)));
        md.push_str(&format!("| 現金 | {} |\n", yen(summary.valuation.cash_jpy())));
        md.push('\n');

        md.push_str("| 銘柄 | セクター | 株数 | 評価額 | 損益率 | 比率 |\n");
        md.push_str("| --- | --- | ---: | ---: | ---: | ---: |\n");
        for pos in summary.valuation.equities() {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                pos.symbol,
                pos.sector.as_deref().unwrap_or("-"),
                pos.shares,
                yen(pos.value_jpy),
                pct(pos.pnl_rate),
                pct(pos.weight),
            ));
        }
        md.push('\n');
    }

    // ヘルス
    if !summary.health.reports.is_empty() {
        md.push_str("## ヘルス\n\n");
        md.push_str(&format!(
            "健全 {} / 早期警告 {} / 注意 {} / 撤退 {}\n\n",
            summary.health.healthy,
            summary.health.early_warning,
            summary.health.caution,
            summary.health.exit
        ));
        if !summary.health.all_clear() {
            md.push_str("| 銘柄 | 警戒度 | 理由 |\n");
            md.push_str("| --- | --- | --- |\n");
            for report in &summary.health.reports {
                if report.reasons.is_empty() {
                    continue;
                }
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    report.symbol,
                    report.level.label(),
                    report.reasons.join("、")
                ));
            }
            md.push('\n');
        }
    }

    // 集中度
    md.push_str("## 集中度\n\n");
    md.push_str("| 軸 | HHI | 判定 | 最大グループ |\n");
    md.push_str("| --- | ---: | --- | --- |\n");
    for axis in summary.concentration.axes() {
        let top = axis
            .groups
            .first()
            .map_or("-".to_string(), |g| format!("{} ({})", g.label, pct(g.weight)));
        md.push_str(&format!(
            "| {} | {:.3} | {} | {} |\n",
            axis.axis.label(),
            axis.hhi,
            axis.level.label(),
            top
        ));
    }
    md.push('\n');

    // シナリオ
    for assessment in &summary.scenarios {
        md.push_str(&format!("## シナリオ: {}\n\n", assessment.name));
        md.push_str("| 項目 | 値 |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!(
            "| ポートフォリオ影響 | {} |\n",
            pct(assessment.portfolio_impact)
        ));
        md.push_str(&format!(
            "| 推定価格変化 | {} |\n",
            pct(assessment.portfolio_value_change)
        ));
        md.push_str(&format!("| 判定 | {} |\n", assessment.judgment.label()));
        md.push_str(&format!("| 時間軸 | {} |\n", assessment.time_axis));
        md.push('\n');
        md.push_str(&format!("{}\n\n", assessment.causal_chain_summary));
        if !assessment.offsets.is_empty() {
            md.push_str("緩和要因:\n\n");
            for offset in &assessment.offsets {
                md.push_str(&format!("- {offset}\n"));
            }
            md.push('\n');
        }
    }

    // VaR
    if let Some(var) = &summary.var {
        md.push_str("## VaR\n\n");
        md.push_str("| 項目 | 値 |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!("| 信頼水準 | {} |\n", var.confidence.label()));
        md.push_str(&format!("| 日次想定損失 | {} |\n", yen(var.daily_loss_jpy)));
        md.push_str(&format!("| 月次想定損失 | {} |\n", yen(var.monthly_loss_jpy)));
        md.push_str(&format!(
            "| 年率ボラティリティ | {} |\n",
            pct(var.annualized_volatility)
        ));
        md.push_str(&format!("| 観測日数 | {} |\n", var.observation_days));
        md.push('\n');
    }

    // リバランス計画
    md.push_str("## リバランス計画\n\n");
    if summary.plan.actions.is_empty() {
        md.push_str("提案なし\n\n");
    } else {
        md.push_str("| 優先 | 売買 | 銘柄 | 株数 | 金額 | 理由 |\n");
        md.push_str("| ---: | --- | --- | ---: | ---: | --- |\n");
        for action in &summary.plan.actions {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                action.priority,
                action.side.label(),
                action.symbol,
                action.shares,
                yen(action.amount_jpy),
                action.reason
            ));
        }
        md.push('\n');
        md.push_str(&format!(
            "捻出現金 {} / 投資額 {} / セクターHHI {:.3} → {:.3} / 通貨HHI {:.3} → {:.3}\n\n",
            yen(summary.plan.freed_cash_jpy),
            yen(summary.plan.invested_jpy),
            summary.plan.sector_hhi_before,
            summary.plan.sector_hhi_after,
            summary.plan.currency_hhi_before,
            summary.plan.currency_hhi_after,
        ));
    }
    for constraint in &summary.plan.unmet_constraints {
        md.push_str(&format!("- 未達: {constraint}\n"));
    }
    for note in &summary.plan.notes {
        md.push_str(&format!("- {note}\n"));
    }
    if !(summary.plan.unmet_constraints.is_empty() && summary.plan.notes.is_empty()) {
        md.push('\n');
    }

    // バックテスト
    if let Some(backtest) = &summary.backtest {
        md.push_str("## バックテスト\n\n");
        md.push_str("| 項目 | 値 |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!("| 評価銘柄 | {} |\n", backtest.evaluated));
        md.push_str(&format!("| 除外 | {} |\n", backtest.skipped));
        md.push_str(&format!("| 平均リターン | {} |\n", pct(backtest.mean_return)));
        md.push_str(&format!("| 中央値 | {} |\n", pct(backtest.median_return)));
        md.push_str(&format!("| 勝率 | {} |\n", pct(backtest.win_rate)));
        md.push('\n');
        if !backtest.benchmarks.is_empty() {
            md.push_str("| ベンチマーク | リターン | α | 対象 |\n");
            md.push_str("| --- | ---: | ---: | ---: |\n");
            for bench in &backtest.benchmarks {
                md.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    bench.label,
                    pct(bench.mean_benchmark_return),
                    pct(bench.alpha),
                    bench.covered
                ));
            }
            md.push('\n');
        }
    }

    // 成長シミュレーション
    if let Some(sim) = &summary.simulation {
        md.push_str(&format!("## 成長シミュレーション ({}年)\n\n", sim.years));
        md.push_str("| シナリオ | 最終評価額 | 累計配当 | 目標到達 |\n");
        md.push_str("| --- | ---: | ---: | --- |\n");
        let rows = [
            ("楽観", sim.final_value_jpy.optimistic, sim.cumulative_dividends_jpy.optimistic, sim.target_reached_year.optimistic),
            ("基本", sim.final_value_jpy.base, sim.cumulative_dividends_jpy.base, sim.target_reached_year.base),
            ("悲観", sim.final_value_jpy.pessimistic, sim.cumulative_dividends_jpy.pessimistic, sim.target_reached_year.pessimistic),
        ];
        for (label, value, dividends, reached) in rows {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                label,
                yen(value),
                yen(dividends),
                reached.map_or("-".to_string(), |y| format!("{y}年目"))
            ));
        }
        md.push('\n');
    }

    md
}

// ─── Helpers ────────────────────────────────────────────────────────

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::NaiveDate;
    use kabulab_core::backtest::{BenchmarkAlpha, SymbolPerformance};
    use kabulab_core::domain::{FxRates, Position, Quote, StockMetrics};
    use kabulab_core::forecast::{GrowthPlan, GrowthSimulator, PerScenario};
    use kabulab_core::rebalance::{PlannedTrade, TradeSide};
    use kabulab_core::risk::{analyze_concentration, ScenarioEngine, VarConfidence, VarEstimate};
    use kabulab_core::scoring::{ValueScore, Verdict};

    use crate::health_run::assess_holdings;
    use crate::runner::RunSummary;
    use crate::screening::ScreeningHit;

    // ─── Test helpers ────────────────────────────────────────────────

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_hit(symbol: &str, score: f64) -> ScreeningHit {
        ScreeningHit {
            value: ValueScore {
                symbol: symbol.to_string(),
                score,
                verdict: Verdict::from_score(score),
                axes: Vec::new(),
            },
            quality: None,
            shareholder_yield: Some(0.045),
            price: Some(2_500.0),
        }
    }

    fn sample_summary() -> RunSummary {
        let positions = vec![
            Position {
                symbol: "7203.T".to_string(),
                shares: 100,
                cost_price: 2_000.0,
                cost_currency: "JPY".to_string(),
                purchase_date: date(2024, 1, 15),
                memo: None,
            },
            Position {
                symbol: "JPY.CASH".to_string(),
                shares: 1,
                cost_price: 500_000.0,
                cost_currency: "JPY".to_string(),
                purchase_date: date(2024, 1, 15),
                memo: None,
            },
        ];
        let quotes = HashMap::from([(
            "7203.T".to_string(),
            Quote {
                price: 2_500.0,
                currency: "JPY".to_string(),
                name: Some("トヨタ".to_string()),
                sector: Some("自動車".to_string()),
                region: Some("日本".to_string()),
            },
        )]);
        let valuation = PortfolioSnapshot::build(&positions, &quotes, &FxRates::default());
        let concentration = analyze_concentration(&valuation);

        let engine = ScenarioEngine::default();
        let scenario = engine.resolve("円安").unwrap();
        let stock = StockMetrics {
            symbol: "7203.T".to_string(),
            sector: Some("自動車".to_string()),
            price: Some(2_500.0),
            beta: Some(1.0),
            ..StockMetrics::default()
        };
        let assessment = engine.assess_portfolio(scenario, &[stock], &[0.1], &[1.0]);

        let simulation = GrowthSimulator.simulate(
            &GrowthPlan {
                initial_value_jpy: 10_000_000.0,
                annual_contribution_jpy: 0.0,
                dividend_yield: 0.02,
                reinvest_dividends: true,
                years: 5,
                target_amount_jpy: None,
            },
            PerScenario::new(0.08, 0.05, 0.01),
        );

        RunSummary {
            schema_version: SCHEMA_VERSION,
            config_id: "a3f9c2d8e1b4a3f9c2d8e1b4".to_string(),
            run_date: date(2025, 3, 10),
            screening: ScreeningReport {
                hits: vec![sample_hit("6758.T", 82.0), sample_hit("8058.T", 66.5)],
                screened: 20,
                passed_filter: 5,
                indeterminate: 1,
            },
            valuation,
            health: assess_holdings(&[]),
            concentration,
            scenarios: vec![assessment],
            var: Some(VarEstimate {
                confidence: VarConfidence::P95,
                daily_return_var: -0.018,
                monthly_return_var: -0.07,
                daily_loss_jpy: 45_000.0,
                monthly_loss_jpy: 175_000.0,
                annualized_volatility: 0.22,
                mean_daily_return: 0.0004,
                observation_days: 250,
            }),
            plan: RebalancePlan {
                actions: vec![PlannedTrade {
                    symbol: "6758.T".to_string(),
                    side: TradeSide::Buy,
                    shares: 100,
                    amount_jpy: 250_000.0,
                    priority: 6,
                    reason: "期待リターン8.0%".to_string(),
                }],
                freed_cash_jpy: 0.0,
                invested_jpy: 250_000.0,
                sector_hhi_before: 1.0,
                sector_hhi_after: 0.52,
                currency_hhi_before: 1.0,
                currency_hhi_after: 1.0,
                unmet_constraints: Vec::new(),
                notes: Vec::new(),
            },
            backtest: Some(BacktestReport {
                evaluated: 2,
                skipped: 1,
                mean_return: 0.125,
                median_return: 0.125,
                win_rate: 1.0,
                performances: vec![SymbolPerformance {
                    symbol: "7203.T".to_string(),
                    screened_date: date(2024, 6, 3),
                    screened_price: 2_000.0,
                    current_price: 2_500.0,
                    return_rate: 0.25,
                }],
                benchmarks: vec![BenchmarkAlpha {
                    benchmark: "^N225".to_string(),
                    label: "日経平均".to_string(),
                    mean_benchmark_return: 0.06,
                    alpha: 0.065,
                    covered: 2,
                }],
            }),
            simulation: Some(simulation),
        }
    }

    // ─── JSON round-trip ─────────────────────────────────────────────

    #[test]
    fn test_json_roundtrip() {
        let original = sample_summary();
        let json = export_json(&original).unwrap();
        let restored = import_json(&json).unwrap();

        assert_eq!(restored.schema_version, SCHEMA_VERSION);
        assert_eq!(restored.config_id, original.config_id);
        assert_eq!(restored.run_date, original.run_date);
        assert_eq!(restored.screening, original.screening);
        assert_eq!(restored.plan, original.plan);
        assert_eq!(restored.backtest, original.backtest);
        assert!(
            (restored.valuation.total_value_jpy - original.valuation.total_value_jpy).abs() < 1e-9
        );
    }

    #[test]
    fn test_json_rejects_unknown_version() {
        let mut summary = sample_summary();
        summary.schema_version = 99;
        let json = export_json(&summary).unwrap();

        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version 99"));
    }

    // ─── CSV ────────────────────────────────────────────────────────

    #[test]
    fn test_screening_csv_rows() {
        let summary = sample_summary();
        let csv = export_screening_csv(&summary.screening).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "symbol,score,verdict,quality,shareholder_yield,price"
        );
        assert!(lines[1].starts_with("6758.T,82.0,深割安,,0.0450,2500.00"));
        assert!(lines[2].starts_with("8058.T,66.5,割安,"));
    }

    #[test]
    fn test_valuation_csv_includes_cash() {
        let summary = sample_summary();
        let csv = export_valuation_csv(&summary.valuation).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("7203.T"));
        assert!(lines[2].contains("JPY.CASH"));
        assert!(lines[1].contains("自動車"));
    }

    #[test]
    fn test_plan_csv_rows() {
        let summary = sample_summary();
        let csv = export_plan_csv(&summary.plan).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("買い"));
        assert!(lines[1].contains("6758.T"));
        assert!(lines[1].contains("250000"));
    }

    #[test]
    fn test_backtest_csv_rows() {
        let summary = sample_summary();
        let csv = export_backtest_csv(summary.backtest.as_ref().unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("7203.T,2024-06-03,2000.00,2500.00,0.2500"));
    }

    // ─── Markdown report ────────────────────────────────────────────

    #[test]
    fn test_report_has_sections() {
        let summary = sample_summary();
        let md = generate_report(&summary);

        assert!(md.contains("# スクリーニング実行レポート"));
        assert!(md.contains("## 概要"));
        assert!(md.contains("## スクリーニング上位"));
        assert!(md.contains("## ポートフォリオ"));
        assert!(md.contains("## 集中度"));
        assert!(md.contains("## シナリオ: ドル高円安"));
        assert!(md.contains("## VaR"));
        assert!(md.contains("## リバランス計画"));
        assert!(md.contains("## バックテスト"));
        assert!(md.contains("## 成長シミュレーション (5年)"));
        assert!(md.contains("深割安"));
        assert!(md.contains("| 設定ID | a3f9c2d8 |"));
    }

    #[test]
    fn test_report_skips_optional_sections() {
        let mut summary = sample_summary();
        summary.var = None;
        summary.backtest = None;
        summary.simulation = None;
        summary.scenarios.clear();
        let md = generate_report(&summary);

        assert!(!md.contains("## VaR"));
        assert!(!md.contains("## バックテスト"));
        assert!(!md.contains("## 成長シミュレーション"));
        assert!(!md.contains("## シナリオ"));
    }

    // ─── Save/load artifacts ────────────────────────────────────────

    #[test]
    fn test_save_load_artifacts_roundtrip() {
        let summary = sample_summary();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&summary, dir.path()).unwrap();

        assert!(run_dir.ends_with("20250310_a3f9c2d8"));
        assert!(run_dir.join("summary.json").exists());
        assert!(run_dir.join("screening.csv").exists());
        assert!(run_dir.join("valuation.csv").exists());
        assert!(run_dir.join("plan.csv").exists());
        assert!(run_dir.join("backtest.csv").exists());
        assert!(run_dir.join("report.md").exists());

        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.config_id, summary.config_id);
        assert_eq!(loaded.screening, summary.screening);
    }

    #[test]
    fn test_artifacts_skip_backtest_when_absent() {
        let mut summary = sample_summary();
        summary.backtest = None;
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&summary, dir.path()).unwrap();

        assert!(run_dir.join("summary.json").exists());
        assert!(!run_dir.join("backtest.csv").exists());
    }
}
