use std::sync::Arc;

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use tracing::warn;

use super::domain::{ScoreRequest, ScoreResult};
use super::orchestrator::{PayloadError, ScoreComparison, ScoringOrchestrator};
use crate::error::AppError;

/// Router builder exposing the scoring engine over HTTP.
pub fn scoring_router(orchestrator: Arc<ScoringOrchestrator>) -> Router {
    Router::new()
        .route("/api/v1/proposals/score", post(score_handler))
        .route("/api/v1/proposals/score/compare", post(compare_handler))
        .with_state(orchestrator)
}

/// Fitting is CPU-bound, so it runs on the blocking pool.
pub(crate) async fn score_handler(
    State(orchestrator): State<Arc<ScoringOrchestrator>>,
    body: Bytes,
) -> Result<Json<ScoreResult>, AppError> {
    let request = parse_body(&body)?;
    let result = tokio::task::spawn_blocking(move || orchestrator.score(&request))
        .await
        .map_err(axum::Error::new)?;
    Ok(Json(result))
}

pub(crate) async fn compare_handler(
    State(orchestrator): State<Arc<ScoringOrchestrator>>,
    body: Bytes,
) -> Result<Json<ScoreComparison>, AppError> {
    let request = parse_body(&body)?;
    let comparison = tokio::task::spawn_blocking(move || orchestrator.compare(&request))
        .await
        .map_err(axum::Error::new)?;
    Ok(Json(comparison))
}

fn parse_body(body: &[u8]) -> Result<ScoreRequest, PayloadError> {
    serde_json::from_slice(body).map_err(|err| {
        warn!(error = %err, "score request rejected");
        PayloadError::Malformed(err)
    })
}
