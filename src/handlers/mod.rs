//! The Controller (spec.md §4.1): translates HTTP requests into
//! (operation-record, background-job) pairs and serves retrieval/streaming
//! endpoints.

pub mod changesets;
pub mod cleanup;
pub mod health;
pub mod instances;
pub mod validations;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Shared 404 mapping for `Get`-style handlers (spec.md §4.1).
pub(crate) fn not_found(kind: &'static str, id: Uuid) -> AppError {
    AppError::NotFound {
        kind,
        id: id.to_string(),
    }
}

pub(crate) fn internal<E: std::fmt::Display>(err: E) -> AppError {
    AppError::Internal(err.to_string())
}

pub(crate) fn parse_last_event_id(value: Option<&str>) -> AppResult<Option<Uuid>> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .parse::<Uuid>()
            .map(Some)
            .map_err(|_| AppError::BadRequest("invalid Last-Event-ID header".to_string())),
    }
}
