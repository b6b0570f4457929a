//! Scoring properties: verdict monotonicity, score bounds, rank ordering.

use chrono::NaiveDate;
use proptest::prelude::*;
use stratlab_core::{ParamMap, StrategyRegistry};
use stratlab_runner::metrics::keys;
use stratlab_runner::{
    meets_profitability_criteria, rank, score, BacktestOrchestrator, BacktestResult,
    EngineConfig, MarketDataProvider, MetricsBundle, PerformanceScorer, ProfitabilityCriteria,
    RankingWeights, ScoringError, SyntheticProvider,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn template() -> BacktestResult {
    let data = SyntheticProvider::new(
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
    )
    .fetch("SPY", None, None)
    .unwrap();
    let mut strategy = StrategyRegistry::global()
        .create("sma_crossover", &ParamMap::new())
        .unwrap();
    BacktestOrchestrator::new(EngineConfig::default())
        .unwrap()
        .execute_strategy_evaluation(strategy.as_mut(), &data, None, None, None)
        .unwrap()
}

fn with_metrics(base: &BacktestResult, metrics: MetricsBundle) -> BacktestResult {
    let mut r = base.clone();
    r.metrics = metrics;
    r
}

fn bundle(ret: f64, sharpe: f64, dd: f64, win: f64, trades: f64, pf: f64) -> MetricsBundle {
    MetricsBundle::from([
        (keys::TOTAL_RETURN, ret),
        (keys::SHARPE_RATIO, sharpe),
        (keys::MAX_DRAWDOWN, dd),
        (keys::WIN_RATE, win),
        (keys::TOTAL_TRADES, trades),
        (keys::PROFIT_FACTOR, pf),
    ])
}

fn arb_bundle() -> impl Strategy<Value = MetricsBundle> {
    (
        -0.5..1.0_f64,
        -2.0..4.0_f64,
        -0.6..0.0_f64,
        0.0..1.0_f64,
        0u32..40,
        0.0..20.0_f64,
    )
        .prop_map(|(r, s, d, w, t, pf)| bundle(r, s, d, w, t as f64, pf))
}

// ── Verdict ──────────────────────────────────────────────────────────

#[test]
fn each_criterion_flips_the_verdict_on_its_own() {
    let passing = bundle(0.15, 1.2, -0.10, 0.5, 8.0, 1.5);
    let criteria = ProfitabilityCriteria::default();
    assert!(meets_profitability_criteria(&passing, &criteria));

    let failing = [
        bundle(0.05, 1.2, -0.10, 0.5, 8.0, 1.5),
        bundle(0.15, 0.9, -0.10, 0.5, 8.0, 1.5),
        bundle(0.15, 1.2, -0.25, 0.5, 8.0, 1.5),
        bundle(0.15, 1.2, -0.10, 0.2, 8.0, 1.5),
        bundle(0.15, 1.2, -0.10, 0.5, 4.0, 1.5),
    ];
    for m in &failing {
        assert!(!meets_profitability_criteria(m, &criteria), "{m:?}");
    }
}

#[test]
fn missing_drawdown_fails_the_drawdown_check() {
    let m = MetricsBundle::from([
        (keys::TOTAL_RETURN, 0.5),
        (keys::SHARPE_RATIO, 3.0),
        (keys::WIN_RATE, 0.9),
        (keys::TOTAL_TRADES, 20.0),
    ]);
    assert!(!meets_profitability_criteria(&m, &ProfitabilityCriteria::default()));
}

#[test]
fn struct_update_overrides_single_thresholds() {
    let m = bundle(0.06, 1.2, -0.10, 0.5, 8.0, 1.5);
    let lenient = ProfitabilityCriteria {
        min_return: 0.05,
        ..Default::default()
    };
    assert!(!meets_profitability_criteria(&m, &ProfitabilityCriteria::default()));
    assert!(meets_profitability_criteria(&m, &lenient));
}

proptest! {
    #[test]
    fn stricter_min_return_never_admits_more(m in arb_bundle(), lo in -0.5..0.5_f64, bump in 0.0..0.5_f64) {
        let loose = ProfitabilityCriteria { min_return: lo, ..Default::default() };
        let strict = ProfitabilityCriteria { min_return: lo + bump, ..Default::default() };
        if meets_profitability_criteria(&m, &strict) {
            prop_assert!(meets_profitability_criteria(&m, &loose));
        }
    }

    #[test]
    fn score_is_never_negative(m in arb_bundle()) {
        prop_assert!(score(&m, &RankingWeights::default()) >= 0.0);
    }

    #[test]
    fn profit_factor_is_capped_at_five(m in arb_bundle(), pf in 5.0..1000.0_f64) {
        let mut a = m.clone();
        let mut b = m;
        a.insert(keys::PROFIT_FACTOR, 5.0);
        b.insert(keys::PROFIT_FACTOR, pf);
        let w = RankingWeights::default();
        prop_assert!((score(&a, &w) - score(&b, &w)).abs() < 1e-12);
    }
}

// ── Ranking ──────────────────────────────────────────────────────────

#[test]
fn rank_of_nothing_is_nothing() {
    assert!(rank(Vec::new(), &RankingWeights::default()).unwrap().is_empty());
}

#[test]
fn single_result_ranks_first() {
    let ranked = rank(vec![template()], &RankingWeights::default()).unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].rank(), Some(1));
}

#[test]
fn empty_metrics_are_rejected() {
    let base = template();
    let results = vec![base.clone(), with_metrics(&base, MetricsBundle::new())];
    assert_eq!(
        rank(results, &RankingWeights::default()).unwrap_err(),
        ScoringError::MissingMetrics { index: 1 }
    );
}

#[test]
fn ties_keep_input_order() {
    let base = template();
    let m = bundle(0.1, 1.0, -0.1, 0.5, 10.0, 2.0);
    let mut a = with_metrics(&base, m.clone());
    a.symbol = "A".into();
    let mut b = with_metrics(&base, m);
    b.symbol = "B".into();
    let ranked = rank(vec![a, b], &RankingWeights::default()).unwrap();
    assert_eq!(ranked[0].symbol, "A");
    assert_eq!(ranked[1].symbol, "B");
}

#[test]
fn comparison_needs_two_results() {
    let scorer = PerformanceScorer::default();
    assert_eq!(
        scorer.compare(&[template()]).unwrap_err(),
        ScoringError::NotEnoughResults { required: 2, got: 1 }
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn rank_orders_by_score_and_is_stable_under_rerank(
        bundles in prop::collection::vec(arb_bundle(), 1..12)
    ) {
        let base = template();
        let weights = RankingWeights::default();
        let results: Vec<_> = bundles.into_iter().map(|m| with_metrics(&base, m)).collect();

        let ranked = rank(results, &weights).unwrap();
        let scores: Vec<f64> = ranked.iter().filter_map(|r| r.score()).collect();
        prop_assert_eq!(scores.len(), ranked.len());
        prop_assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        for (i, r) in ranked.iter().enumerate() {
            prop_assert_eq!(r.rank(), Some(i + 1));
        }

        let reranked = rank(ranked.clone(), &weights).unwrap();
        prop_assert_eq!(standings(&reranked), standings(&ranked));
    }
}

fn standings(results: &[BacktestResult]) -> Vec<(String, f64, Option<f64>, Option<usize>)> {
    results
        .iter()
        .map(|r| (r.strategy.identifier.clone(), r.total_return(), r.score(), r.rank()))
        .collect()
}

#[test]
fn result_with_warm_up_indicators_equals_its_clone() {
    let result = template();
    assert!(result.indicators.iter().any(|(_, v)| v.iter().any(|x| x.is_nan())));
    assert_eq!(result.clone(), result);
}
