use super::common::*;
use crate::scoring::domain::{EstimateDetails, HistoricalStats, ScoreMethod};
use crate::scoring::heuristic::{value_score, HeuristicScorer};

#[test]
fn empty_proposal_with_neutral_stats_scores_forty() {
    let estimate = HeuristicScorer::new().score(&proposal(0.0), &HistoricalStats::default());

    assert_eq!(estimate.score, 40.0);
    assert_eq!(estimate.percentual, 40);
    assert_eq!(estimate.method, ScoreMethod::Statistical);
    match estimate.details {
        EstimateDetails::Statistical(factors) => {
            assert_eq!(factors.seller.contribution, 0.0);
            assert_eq!(factors.client.contribution, 0.0);
            assert_eq!(factors.value.score, 30.0);
        }
        other => panic!("expected heuristic factors, got {other:?}"),
    }
}

#[test]
fn strong_rates_and_mid_band_total_lift_the_score() {
    let stats = HistoricalStats::new(0.8, 0.6);

    let estimate = HeuristicScorer::new().score(&proposal(10_000.0), &stats);

    // running = 50 + 12 + 5 = 67, averaged with the band score of 85
    assert!((estimate.score - 76.0).abs() < 1e-9);
    assert_eq!(estimate.percentual, 76);
    match estimate.details {
        EstimateDetails::Statistical(factors) => {
            assert!((factors.seller.contribution - 12.0).abs() < 1e-9);
            assert!((factors.seller.score - 80.0).abs() < 1e-9);
            assert!((factors.client.contribution - 5.0).abs() < 1e-9);
            assert_eq!(factors.value.total, 10_000.0);
        }
        other => panic!("expected heuristic factors, got {other:?}"),
    }
}

#[test]
fn value_bands_are_inclusive_at_both_edges() {
    assert_eq!(value_score(5_000.0), 85.0);
    assert_eq!(value_score(50_000.0), 85.0);
    assert_eq!(value_score(4_999.99), 70.0);
    assert_eq!(value_score(50_000.01), 70.0);
    assert_eq!(value_score(0.01), 70.0);
    assert_eq!(value_score(0.0), 30.0);
    assert_eq!(value_score(-250.0), 30.0);
}

#[test]
fn out_of_range_rates_are_clamped() {
    let scorer = HeuristicScorer::new();

    let high = scorer.score(&proposal(10_000.0), &HistoricalStats::new(10.0, 10.0));
    let low = scorer.score(&proposal(0.0), &HistoricalStats::new(-10.0, -10.0));

    assert_eq!(high.score, 100.0);
    assert_eq!(high.percentual, 100);
    assert_eq!(low.score, 0.0);
    assert_eq!(low.percentual, 0);
}

#[test]
fn non_finite_rates_fall_back_to_neutral() {
    let estimate = HeuristicScorer::new().score(
        &proposal(0.0),
        &HistoricalStats::new(f64::NAN, f64::INFINITY),
    );

    assert_eq!(estimate.score, 40.0);
}

#[test]
fn identical_inputs_serialize_identically() {
    let scorer = HeuristicScorer::new();
    let stats = HistoricalStats::new(0.37, 0.81);
    let record = proposal(7_321.5);

    let first = serde_json::to_string(&scorer.score(&record, &stats)).expect("serializes");
    let second = serde_json::to_string(&scorer.score(&record, &stats)).expect("serializes");

    assert_eq!(first, second);
}
