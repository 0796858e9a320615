use super::domain::{
    clamp_score, percent_of, EstimateDetails, HeuristicFactors, HistoricalStats, ProposalRecord,
    RateFactor, ScoreEstimate, ScoreMethod, ValueFactor, NEUTRAL_RATE,
};

const BASELINE: f64 = 50.0;
const SELLER_WEIGHT: f64 = 40.0;
const CLIENT_WEIGHT: f64 = 50.0;
const VALUE_BAND_LOW: f64 = 5_000.0;
const VALUE_BAND_HIGH: f64 = 50_000.0;

/// Rule-based scorer that needs no training data. Always returns a score.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, proposal: &ProposalRecord, stats: &HistoricalStats) -> ScoreEstimate {
        let mut running = BASELINE;

        let seller = rate_factor(stats.seller_rate, SELLER_WEIGHT);
        running += seller.contribution;

        let client = rate_factor(stats.client_rate, CLIENT_WEIGHT);
        running += client.contribution;

        let value = ValueFactor {
            total: proposal.total,
            score: value_score(proposal.total),
        };

        let score = clamp_score((running + value.score) / 2.0);

        ScoreEstimate {
            score,
            percentual: percent_of(score),
            method: ScoreMethod::Statistical,
            details: EstimateDetails::Statistical(HeuristicFactors {
                seller,
                client,
                value,
            }),
        }
    }
}

fn rate_factor(rate: f64, weight: f64) -> RateFactor {
    let rate = if rate.is_finite() { rate } else { NEUTRAL_RATE };
    RateFactor {
        rate,
        score: rate * 100.0,
        contribution: (rate - NEUTRAL_RATE) * weight,
    }
}

/// Value-band rule: mid-sized deals close most often, empty proposals rarely.
pub(crate) fn value_score(total: f64) -> f64 {
    if (VALUE_BAND_LOW..=VALUE_BAND_HIGH).contains(&total) {
        85.0
    } else if total > 0.0 {
        70.0
    } else {
        30.0
    }
}
