use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::scoring::domain::{HistoricalDataset, ProposalOutcome, ProposalRecord};

pub(super) fn proposal(total: f64) -> ProposalRecord {
    ProposalRecord {
        total,
        items_count: 3.0,
        discount_percentage: 5.0,
        days_since_creation: 4.0,
        days_until_expiry: 26.0,
        seller_conversion_rate: 0.5,
        client_conversion_rate: 0.5,
        month: 6.0,
        seller_proposals_count: 40.0,
        client_proposals_count: 2.0,
        client_total_revenue: 30_000.0,
        outcome: ProposalOutcome::NotClosed,
    }
}

/// Closed and lost records differ on every commercial signal.
pub(super) fn historical_record(index: usize, closed: bool) -> ProposalRecord {
    let step = index as f64;
    ProposalRecord {
        total: if closed { 12_000.0 } else { 2_000.0 } + step * 150.0,
        items_count: (index % 5 + 1) as f64,
        discount_percentage: if closed { 5.0 } else { 12.0 },
        days_since_creation: (index % 30) as f64,
        days_until_expiry: 30.0 - (index % 30) as f64,
        seller_conversion_rate: if closed { 0.7 } else { 0.3 },
        client_conversion_rate: if closed { 0.6 } else { 0.35 },
        month: (index % 12 + 1) as f64,
        seller_proposals_count: 40.0,
        client_proposals_count: (index % 7) as f64,
        client_total_revenue: if closed { 90_000.0 } else { 15_000.0 },
        outcome: if closed {
            ProposalOutcome::Closed
        } else {
            ProposalOutcome::NotClosed
        },
    }
}

pub(super) fn mixed_history(count: usize) -> HistoricalDataset {
    (0..count)
        .map(|index| historical_record(index, index % 2 == 0))
        .collect::<Vec<_>>()
        .into()
}

pub(super) fn uniform_history(count: usize, closed: bool) -> HistoricalDataset {
    (0..count)
        .map(|index| historical_record(index, closed))
        .collect::<Vec<_>>()
        .into()
}

pub(super) fn closed_like_proposal() -> ProposalRecord {
    ProposalRecord {
        outcome: ProposalOutcome::NotClosed,
        ..historical_record(4, true)
    }
}

pub(super) fn lost_like_proposal() -> ProposalRecord {
    historical_record(5, false)
}

pub(super) fn json_request(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
