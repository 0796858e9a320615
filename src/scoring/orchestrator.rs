use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::classifier::ScoreClassifier;
use super::domain::{
    EstimateDetails, HistoricalStats, ScoreEstimate, ScoreMethod, ScoreRequest, ScoreResult,
};
use super::heuristic::HeuristicScorer;
use super::import::HistoricalImportError;
use super::learned::{FallbackReason, LearnedOutcome, LearnedScorer, MIN_TRAINING_RECORDS};
use crate::config::ScoringConfig;

pub const ALGORITHM_VERSION: &str = "rust-v1.0";
const NEUTRAL_SCORE: f64 = 50.0;
const ERROR_ACTION: &str = "Error calculating score. Neutral score assigned.";

/// Input problems that prevent scoring altogether.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("unable to read score request: {0}")]
    Unreadable(#[from] std::io::Error),
    #[error("malformed score request: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid historical data: {0}")]
    Historical(#[from] HistoricalImportError),
}

/// Result of one invocation. A rejected invocation still carries a neutral result.
#[derive(Debug)]
pub enum ScoreOutcome {
    Scored(ScoreResult),
    Rejected {
        result: ScoreResult,
        error: PayloadError,
    },
}

impl ScoreOutcome {
    pub fn rejected(error: PayloadError) -> Self {
        Self::Rejected {
            result: ScoringOrchestrator::error_result(&error.to_string()),
            error,
        }
    }

    pub fn result(&self) -> &ScoreResult {
        match self {
            ScoreOutcome::Scored(result) | ScoreOutcome::Rejected { result, .. } => result,
        }
    }

    pub fn into_result(self) -> ScoreResult {
        match self {
            ScoreOutcome::Scored(result) | ScoreOutcome::Rejected { result, .. } => result,
        }
    }

    /// Whether the process should report abnormal termination.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, ScoreOutcome::Rejected { .. })
    }
}

/// Heuristic and learned results for the same request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComparison {
    pub statistical: ScoreResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learned: Option<ScoreResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learned_unavailable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
}

/// Entry point that chooses a scorer and stamps a uniform result.
///
/// The learned path is a construction-time capability: an orchestrator built without a
/// [`LearnedScorer`] always uses the heuristic.
#[derive(Debug, Clone, Default)]
pub struct ScoringOrchestrator {
    heuristic: HeuristicScorer,
    learned: Option<LearnedScorer>,
}

impl ScoringOrchestrator {
    pub fn new(learned: Option<LearnedScorer>) -> Self {
        Self {
            heuristic: HeuristicScorer::new(),
            learned,
        }
    }

    pub fn heuristic_only() -> Self {
        Self::new(None)
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        if config.learned_enabled {
            Self::new(Some(LearnedScorer::new(config.forest)))
        } else {
            warn!("learned scorer disabled; all proposals use the statistical heuristic");
            Self::heuristic_only()
        }
    }

    pub fn has_learned_scorer(&self) -> bool {
        self.learned.is_some()
    }

    pub fn parse_request(raw: &str) -> Result<ScoreRequest, PayloadError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Parse and score a raw JSON payload; malformed payloads yield the neutral result.
    pub fn score_payload(&self, raw: &str) -> ScoreOutcome {
        match Self::parse_request(raw) {
            Ok(request) => ScoreOutcome::Scored(self.score(&request)),
            Err(err) => {
                warn!(error = %err, "rejecting score request");
                ScoreOutcome::rejected(err)
            }
        }
    }

    pub fn score(&self, request: &ScoreRequest) -> ScoreResult {
        let estimate = self.estimate(request);
        info!(
            method = estimate.method.as_str(),
            score = estimate.score,
            "proposal scored"
        );
        Self::finalize(estimate, Utc::now())
    }

    /// Score the request with the heuristic and, when possible, with the forest.
    pub fn compare(&self, request: &ScoreRequest) -> ScoreComparison {
        let calculated_at = Utc::now();
        let stats = request.historical_stats.unwrap_or_default();
        let statistical = Self::finalize(
            self.heuristic.score(&request.proposal, &stats),
            calculated_at,
        );

        let learned_outcome = match (&self.learned, &request.historical_data) {
            (None, _) => Err("learned scorer disabled".to_string()),
            (Some(_), None) => Err("no historical data supplied".to_string()),
            (Some(learned), Some(dataset)) => match learned.score(&request.proposal, dataset) {
                LearnedOutcome::Scored(estimate) => Ok(Self::finalize(estimate, calculated_at)),
                LearnedOutcome::Fallback(reason) => Err(reason.summary()),
            },
        };

        match learned_outcome {
            Ok(learned) => ScoreComparison {
                difference: Some(((learned.score - statistical.score) * 10.0).round() / 10.0),
                statistical,
                learned: Some(learned),
                learned_unavailable: None,
            },
            Err(reason) => ScoreComparison {
                statistical,
                learned: None,
                learned_unavailable: Some(reason),
                difference: None,
            },
        }
    }

    /// Neutral midpoint result used whenever the request cannot be scored.
    pub fn error_result(message: &str) -> ScoreResult {
        let classification = ScoreClassifier::classify(NEUTRAL_SCORE);
        ScoreResult {
            score: NEUTRAL_SCORE,
            percentual: NEUTRAL_SCORE as u8,
            level: classification.level,
            action: ERROR_ACTION.to_string(),
            method: ScoreMethod::ErrorFallback,
            calculated_at: Utc::now(),
            algorithm_version: ALGORITHM_VERSION.to_string(),
            factors: None,
            confidence: None,
            features_importance: None,
            prediction_probability: None,
            error: Some(message.to_string()),
        }
    }

    fn estimate(&self, request: &ScoreRequest) -> ScoreEstimate {
        let proposal = &request.proposal;

        let learned = self.learned.as_ref().zip(
            request
                .historical_data
                .as_ref()
                .filter(|dataset| dataset.len() >= MIN_TRAINING_RECORDS),
        );

        let Some((learned, dataset)) = learned else {
            debug!(
                learned_available = self.has_learned_scorer(),
                records = request.historical_data.as_ref().map_or(0, |data| data.len()),
                "using statistical heuristic"
            );
            let stats = request.historical_stats.unwrap_or_default();
            return self.heuristic.score(proposal, &stats);
        };

        match learned.score(proposal, dataset) {
            LearnedOutcome::Scored(estimate) => estimate,
            LearnedOutcome::Fallback(reason) => {
                match &reason {
                    FallbackReason::ModelFitting(err) => {
                        warn!(error = %err, "learned scoring failed; falling back to heuristic");
                    }
                    other => debug!(reason = %other.summary(), "learned scoring skipped"),
                }
                self.heuristic
                    .score(proposal, &HistoricalStats::from_proposal(proposal))
            }
        }
    }

    fn finalize(estimate: ScoreEstimate, calculated_at: DateTime<Utc>) -> ScoreResult {
        let classification = ScoreClassifier::classify(estimate.score);
        let (factors, learned) = match estimate.details {
            EstimateDetails::Statistical(factors) => (Some(factors), None),
            EstimateDetails::Learned(details) => (None, Some(details)),
        };

        ScoreResult {
            score: estimate.score,
            percentual: estimate.percentual,
            level: classification.level,
            action: classification.action,
            method: estimate.method,
            calculated_at,
            algorithm_version: ALGORITHM_VERSION.to_string(),
            factors,
            confidence: learned.as_ref().map(|details| details.confidence),
            prediction_probability: learned
                .as_ref()
                .map(|details| details.prediction_probability),
            features_importance: learned.map(|details| details.features_importance),
            error: None,
        }
    }
}
