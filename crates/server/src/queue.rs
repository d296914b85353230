use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use comanda_core::{PriorityMarker, PriorityTracker};

#[derive(Clone)]
pub struct QueueState {
    priority: Arc<PriorityTracker>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub position: usize,
    pub endpoint_id: String,
    pub counterparty_id: String,
    pub requested_at: String,
    pub wait_seconds: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueueResponse {
    pub pending: Vec<QueueEntry>,
    pub total: usize,
    pub checked_at: String,
}

pub fn router(priority: Arc<PriorityTracker>) -> Router {
    Router::new()
        .route("/api/v1/priority", get(list_priority))
        .with_state(QueueState { priority })
}

/// Counterparties waiting for a human, oldest request first. Read-only.
pub async fn list_priority(State(state): State<QueueState>) -> Json<QueueResponse> {
    let now = Utc::now();
    Json(queue_view(state.priority.pending().await, now))
}

fn queue_view(markers: Vec<PriorityMarker>, now: DateTime<Utc>) -> QueueResponse {
    let pending: Vec<QueueEntry> = markers
        .into_iter()
        .enumerate()
        .map(|(index, marker)| QueueEntry {
            position: index + 1,
            wait_seconds: marker.wait_time(now).num_seconds(),
            requested_at: marker.requested_at.to_rfc3339(),
            endpoint_id: marker.endpoint_id,
            counterparty_id: marker.counterparty_id,
        })
        .collect();

    QueueResponse { total: pending.len(), pending, checked_at: now.to_rfc3339() }
}
