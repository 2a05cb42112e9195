use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::{Diagnostic, ValidationFieldError};

/// The one error enum the Controller's handlers return. Each variant maps to
/// exactly the status code and body shape spec.md §6/§7 specify; nothing
/// that happens after a 202 response ever goes through here (per-job errors
/// become Event Store writes instead, see `orchestrator`).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("request body input validation failed")]
    Validation(Vec<ValidationFieldError>),

    #[error("{0}")]
    ResolverError(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("plugin configuration validation failed")]
    PluginConfigInvalid(Vec<Diagnostic>),

    #[error("failed to load the blueprint document specified in the request")]
    BlueprintLoad(Vec<Diagnostic>),

    #[error("{kind} {id:?} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("requested change set is missing")]
    MissingChangeset,

    #[error("the provided blueprint could not be resolved")]
    BlueprintUnresolvable,

    #[error("an unexpected error occurred")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                tracing::warn!(?errors, "request body input validation failed");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({
                        "message": "request body input validation failed",
                        "errors": errors,
                    })),
                )
                    .into_response()
            }
            AppError::PluginConfigInvalid(diagnostics) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "message": "plugin configuration validation failed",
                    "validationDiagnostics": diagnostics,
                })),
            )
                .into_response(),
            AppError::BlueprintLoad(diagnostics) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "message": "failed to load the blueprint document specified in the request",
                    "validationDiagnostics": diagnostics,
                })),
            )
                .into_response(),
            AppError::ResolverError(reason) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": reason }))).into_response()
            }
            AppError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": reason }))).into_response()
            }
            AppError::BlueprintUnresolvable => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": self.to_string() })),
            )
                .into_response(),
            AppError::MissingChangeset => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "requested change set is missing" })),
            )
                .into_response(),
            AppError::NotFound { kind, id } => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": format!("{kind} {id:?} not found") })),
            )
                .into_response(),
            AppError::Internal(reason) => {
                tracing::error!(error = %reason, "unexpected error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "an unexpected error occurred" })),
                )
                    .into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
