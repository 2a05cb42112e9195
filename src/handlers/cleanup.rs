//! Cleanup endpoints (spec.md §4.1). Each starts a background cleanup under
//! a fixed internal timeout and replies 202 immediately; the background
//! function itself runs against whichever store the route names (the events
//! endpoint cleans events, per spec.md §9's "rename oversight" note — not
//! changesets).

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::CLEANUP_TIMEOUT;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct CleanupRequest {
    /// Records/events created strictly before this instant are eligible.
    /// Defaults to "now" when omitted.
    before: Option<DateTime<Utc>>,
}

fn started() -> (StatusCode, Json<Value>) {
    (StatusCode::ACCEPTED, Json(json!({ "message": "Cleanup started" })))
}

pub async fn cleanup_validations(
    Extension(state): Extension<AppState>,
    body: Option<Json<CleanupRequest>>,
) -> (StatusCode, Json<Value>) {
    let threshold = body.and_then(|b| b.0.before).unwrap_or_else(Utc::now);
    tokio::spawn(async move {
        match tokio::time::timeout(CLEANUP_TIMEOUT, state.validations.cleanup(threshold)).await {
            Ok(Ok(removed)) => tracing::info!(removed, "validation cleanup complete"),
            Ok(Err(err)) => tracing::warn!(?err, "validation cleanup failed"),
            Err(_) => tracing::warn!("validation cleanup timed out"),
        }
    });
    started()
}

pub async fn cleanup_changesets(
    Extension(state): Extension<AppState>,
    body: Option<Json<CleanupRequest>>,
) -> (StatusCode, Json<Value>) {
    let threshold = body.and_then(|b| b.0.before).unwrap_or_else(Utc::now);
    tokio::spawn(async move {
        match tokio::time::timeout(CLEANUP_TIMEOUT, state.changesets.cleanup(threshold)).await {
            Ok(Ok(removed)) => tracing::info!(removed, "changeset cleanup complete"),
            Ok(Err(err)) => tracing::warn!(?err, "changeset cleanup failed"),
            Err(_) => tracing::warn!("changeset cleanup timed out"),
        }
    });
    started()
}

pub async fn cleanup_events(
    Extension(state): Extension<AppState>,
    body: Option<Json<CleanupRequest>>,
) -> (StatusCode, Json<Value>) {
    let threshold = body.and_then(|b| b.0.before).unwrap_or_else(Utc::now);
    tokio::spawn(async move {
        match tokio::time::timeout(CLEANUP_TIMEOUT, state.events.cleanup(threshold)).await {
            Ok(Ok(removed)) => tracing::info!(removed, "event cleanup complete"),
            Ok(Err(err)) => tracing::warn!(?err, "event cleanup failed"),
            Err(_) => tracing::warn!("event cleanup timed out"),
        }
    });
    started()
}
