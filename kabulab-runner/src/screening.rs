//! Universe screening — criteria filter plus both scorers, in parallel.
//!
//! Per-symbol work is independent, so the universe fans out across Rayon
//! and collects back in input order before the final sort. A symbol can
//! leave the pipeline two ways: filtered (failed a criterion) or
//! indeterminate (too little data for even a minimal value score). Both
//! are counted, neither is an error.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use kabulab_core::domain::StockMetrics;
use kabulab_core::scoring::{AlphaScore, AlphaScorer, ScreeningCriteria, ValueScore, ValueScorer};

/// One symbol that passed the filter and produced a value score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningHit {
    pub value: ValueScore,
    /// Change-quality score; `None` when no signal was computable.
    pub quality: Option<AlphaScore>,
    pub shareholder_yield: Option<f64>,
    /// Price at screening time, when the record carried one.
    pub price: Option<f64>,
}

impl ScreeningHit {
    pub fn symbol(&self) -> &str {
        &self.value.symbol
    }
}

/// Everything one screening pass produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningReport {
    /// Best value score first; ties break by symbol.
    pub hits: Vec<ScreeningHit>,
    pub screened: usize,
    pub passed_filter: usize,
    /// Passed the filter but had too little data to score.
    pub indeterminate: usize,
}

enum Outcome {
    Filtered,
    Indeterminate,
    Hit(ScreeningHit),
}

/// Screens a pre-fetched universe against `criteria` and scores survivors.
///
/// Order-independent per symbol; the report is deterministic for a given
/// universe regardless of thread scheduling.
pub fn screen_universe(
    universe: &[StockMetrics],
    criteria: &ScreeningCriteria,
    scorer: &ValueScorer,
) -> ScreeningReport {
    let alpha = AlphaScorer;

    let outcomes: Vec<Outcome> = universe
        .par_iter()
        .map(|metrics| {
            if !criteria.passes(metrics) {
                return Outcome::Filtered;
            }
            let Some(value) = scorer.score(metrics) else {
                return Outcome::Indeterminate;
            };
            Outcome::Hit(ScreeningHit {
                value,
                quality: alpha.score(metrics),
                shareholder_yield: metrics.shareholder_yield(),
                price: metrics.price,
            })
        })
        .collect();

    let screened = universe.len();
    let mut hits = Vec::new();
    let mut filtered = 0usize;
    let mut indeterminate = 0usize;
    for outcome in outcomes {
        match outcome {
            Outcome::Filtered => filtered += 1,
            Outcome::Indeterminate => indeterminate += 1,
            Outcome::Hit(hit) => hits.push(hit),
        }
    }

    hits.sort_by(|a, b| {
        b.value
            .score
            .total_cmp(&a.value.score)
            .then_with(|| a.value.symbol.cmp(&b.value.symbol))
    });

    ScreeningReport {
        hits,
        screened,
        passed_filter: screened - filtered,
        indeterminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap(symbol: &str, per: f64) -> StockMetrics {
        StockMetrics {
            symbol: symbol.to_string(),
            price: Some(2500.0),
            per: Some(per),
            pbr: Some(0.8),
            dividend_yield: Some(0.035),
            roe: Some(0.12),
            ..StockMetrics::default()
        }
    }

    fn expensive(symbol: &str) -> StockMetrics {
        StockMetrics {
            symbol: symbol.to_string(),
            per: Some(45.0),
            pbr: Some(6.0),
            dividend_yield: Some(0.002),
            ..StockMetrics::default()
        }
    }

    #[test]
    fn filter_counts_and_hits_line_up() {
        let universe = vec![
            cheap("7203.T", 8.0),
            expensive("AAPL"),
            cheap("2914.T", 10.0),
            // Passes an empty-bounds criterion set but carries nothing to score.
            StockMetrics {
                symbol: "GHOST.T".to_string(),
                ..StockMetrics::default()
            },
        ];
        let criteria = ScreeningCriteria {
            max_per: Some(15.0),
            ..ScreeningCriteria::default()
        };

        let report = screen_universe(&universe, &criteria, &ValueScorer::default());

        assert_eq!(report.screened, 4);
        // AAPL fell to the P/E ceiling; GHOST passed (missing field skips
        // the criterion) but could not be scored.
        assert_eq!(report.passed_filter, 3);
        assert_eq!(report.indeterminate, 1);
        assert_eq!(report.hits.len(), 2);
        assert!(report.hits.iter().all(|h| h.symbol() != "AAPL"));
    }

    #[test]
    fn hits_sort_by_score_then_symbol() {
        // Identical fundamentals → identical scores; symbol breaks the tie.
        let universe = vec![cheap("9984.T", 8.0), cheap("2914.T", 8.0), cheap("7203.T", 6.0)];
        let report =
            screen_universe(&universe, &ScreeningCriteria::default(), &ValueScorer::default());

        assert_eq!(report.hits.len(), 3);
        // The cheapest P/E scores highest.
        assert_eq!(report.hits[0].symbol(), "7203.T");
        assert_eq!(report.hits[1].symbol(), "2914.T");
        assert_eq!(report.hits[2].symbol(), "9984.T");
    }

    #[test]
    fn hits_carry_quality_and_yield_context() {
        let mut metrics = cheap("7203.T", 8.0);
        metrics.buyback_yield = Some(0.01);
        metrics.net_income = Some(3_000_000.0);
        metrics.operating_cash_flow = Some(4_000_000.0);
        metrics.total_assets = Some(50_000_000.0);

        let report =
            screen_universe(&[metrics], &ScreeningCriteria::default(), &ValueScorer::default());

        let hit = &report.hits[0];
        assert!(hit.quality.is_some());
        assert!((hit.shareholder_yield.unwrap() - 0.045).abs() < 1e-12);
        assert_eq!(hit.price, Some(2500.0));
    }

    #[test]
    fn empty_universe_is_an_empty_report() {
        let report =
            screen_universe(&[], &ScreeningCriteria::default(), &ValueScorer::default());
        assert_eq!(report.screened, 0);
        assert_eq!(report.passed_filter, 0);
        assert!(report.hits.is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_universe_and_order() -> impl Strategy<Value = (Vec<StockMetrics>, Vec<usize>)> {
            prop::collection::vec(4.0..40.0_f64, 1..12).prop_flat_map(|pers| {
                let universe: Vec<StockMetrics> = pers
                    .iter()
                    .enumerate()
                    .map(|(i, per)| cheap(&format!("{}.T", 1000 + i), *per))
                    .collect();
                let order = Just((0..universe.len()).collect::<Vec<usize>>()).prop_shuffle();
                (Just(universe), order)
            })
        }

        proptest! {
            #[test]
            fn report_ignores_universe_order((universe, order) in arb_universe_and_order()) {
                let permuted: Vec<StockMetrics> =
                    order.iter().map(|&i| universe[i].clone()).collect();

                let original = screen_universe(
                    &universe,
                    &ScreeningCriteria::default(),
                    &ValueScorer::default(),
                );
                let shuffled = screen_universe(
                    &permuted,
                    &ScreeningCriteria::default(),
                    &ValueScorer::default(),
                );
                prop_assert_eq!(original, shuffled);
            }
        }
    }
}
