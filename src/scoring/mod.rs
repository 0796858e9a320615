//! Proposal closing-score engine.
//!
//! [`ScoringOrchestrator`] routes each request to the learned forest when enough labelled
//! history is supplied and to the statistical heuristic otherwise, then classifies the score
//! into a level and a recommended action. A result is produced for every request.

pub mod classifier;
pub mod domain;
pub mod features;
pub mod heuristic;
pub mod import;
pub mod learned;
pub mod orchestrator;
pub mod router;

#[cfg(test)]
mod tests;

pub use classifier::{ActionCategory, Classification, ScoreClassifier};
pub use domain::{
    HeuristicFactors, HistoricalDataset, HistoricalRow, HistoricalStats, ProposalOutcome,
    ProposalRecord, RawProposal, RawStatus, ScoreEstimate, ScoreLevel, ScoreMethod, ScoreRequest,
    ScoreResult, NEUTRAL_RATE,
};
pub use features::{FeatureBuilder, FeatureVector, TrainingSet, FEATURE_COLUMNS, FEATURE_COUNT};
pub use heuristic::HeuristicScorer;
pub use import::{load_historical_csv, load_historical_csv_path, HistoricalImportError};
pub use learned::{
    FallbackReason, ForestConfig, LearnedOutcome, LearnedScorer, ModelError, RandomForest,
    MIN_TRAINING_RECORDS,
};
pub use orchestrator::{
    PayloadError, ScoreComparison, ScoreOutcome, ScoringOrchestrator, ALGORITHM_VERSION,
};
pub use router::scoring_router;
