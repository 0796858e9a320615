//! Learned scoring path: a random forest trained per call on the supplied history.
//!
//! Nothing is cached between calls. Every reason the model cannot be used is reported as a
//! [`LearnedOutcome::Fallback`] so the caller decides how to recover.

mod forest;
mod tree;

pub use forest::{ForestConfig, RandomForest};

use std::collections::BTreeMap;

use super::domain::{
    clamp_score, percent_of, EstimateDetails, HistoricalDataset, LearnedDetails, ProposalRecord,
    ScoreEstimate, ScoreMethod,
};
use super::features::{FeatureBuilder, FEATURE_COLUMNS};

/// Smallest history the forest is trained on.
pub const MIN_TRAINING_RECORDS: usize = 10;

const MAX_CONFIDENCE: usize = 95;
const BASE_CONFIDENCE: usize = 50;

/// Failures while fitting the forest or predicting with it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("forest must contain at least one tree")]
    EmptyEnsemble,
    #[error("feature matrix has {rows} rows but {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },
    #[error("non-finite value in column '{column}' of historical record {row}")]
    NonFiniteTrainingValue { row: usize, column: &'static str },
    #[error("non-finite value in column '{column}' of the scored proposal")]
    NonFiniteProposalValue { column: &'static str },
    #[error("model produced a non-finite probability")]
    NonFiniteProbability,
}

/// Why the learned path declined to score.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    InsufficientData { records: usize },
    DegenerateLabels { records: usize, closed: usize },
    ModelFitting(ModelError),
}

impl FallbackReason {
    pub fn summary(&self) -> String {
        match self {
            FallbackReason::InsufficientData { records } => format!(
                "{records} historical record(s), at least {MIN_TRAINING_RECORDS} required"
            ),
            FallbackReason::DegenerateLabels { records, closed } => format!(
                "{closed} of {records} historical records closed; both outcomes are required"
            ),
            FallbackReason::ModelFitting(err) => format!("model fitting failed: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LearnedOutcome {
    Scored(ScoreEstimate),
    Fallback(FallbackReason),
}

/// Trains a fresh forest on every call and scores the current proposal with it.
#[derive(Debug, Clone, Default)]
pub struct LearnedScorer {
    config: ForestConfig,
}

impl LearnedScorer {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn score(&self, proposal: &ProposalRecord, dataset: &HistoricalDataset) -> LearnedOutcome {
        if dataset.len() < MIN_TRAINING_RECORDS {
            return LearnedOutcome::Fallback(FallbackReason::InsufficientData {
                records: dataset.len(),
            });
        }

        let training = FeatureBuilder::build(proposal, dataset);
        if training.distinct_classes() < 2 {
            return LearnedOutcome::Fallback(FallbackReason::DegenerateLabels {
                records: training.len(),
                closed: training.positives(),
            });
        }

        if let Some(column) = training.current.iter().position(|value| !value.is_finite()) {
            return LearnedOutcome::Fallback(FallbackReason::ModelFitting(
                ModelError::NonFiniteProposalValue {
                    column: FEATURE_COLUMNS[column],
                },
            ));
        }

        let forest = match RandomForest::fit(&training.features, &training.labels, &self.config) {
            Ok(forest) => forest,
            Err(err) => return LearnedOutcome::Fallback(FallbackReason::ModelFitting(err)),
        };

        let probability = forest.predict_proba(&training.current);
        if !probability.is_finite() {
            return LearnedOutcome::Fallback(FallbackReason::ModelFitting(
                ModelError::NonFiniteProbability,
            ));
        }

        let score = round_to_tenth(clamp_score(probability * 100.0));
        let features_importance: BTreeMap<String, f64> = FEATURE_COLUMNS
            .iter()
            .zip(forest.feature_importances())
            .map(|(column, weight)| (column.to_string(), *weight))
            .collect();

        LearnedOutcome::Scored(ScoreEstimate {
            score,
            percentual: percent_of(score),
            method: ScoreMethod::MlRandomForest,
            details: EstimateDetails::Learned(LearnedDetails {
                confidence: confidence_for(dataset.len()),
                features_importance,
                prediction_probability: probability,
            }),
        })
    }
}

/// Data-volume proxy: one point per ten records above 50, capped at 95.
pub fn confidence_for(records: usize) -> u8 {
    (BASE_CONFIDENCE + records / 10).min(MAX_CONFIDENCE) as u8
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
