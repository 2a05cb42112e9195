use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::{internal, not_found, parse_last_event_id};
use crate::error::{AppError, AppResult};
use crate::events::ChannelType;
use crate::models::{CreateValidationRequest, ValidationRecord, ValidationStatus};
use crate::orchestrator::spawn_validation;
use crate::sse;
use crate::state::AppState;
use crate::stores::StoreError;

pub async fn create(
    Extension(state): Extension<AppState>,
    Json(request): Json<CreateValidationRequest>,
) -> AppResult<(StatusCode, Json<ValidationRecord>)> {
    request
        .validate()
        .map_err(|errors| AppError::Validation(crate::validation::translate(&errors)))?;

    let document = request.blueprint_document.into_domain();
    let source = state
        .resolver
        .resolve(&document)
        .await
        .map_err(|err| AppError::ResolverError(err.to_string()))?;

    let record = ValidationRecord {
        id: Uuid::now_v7(),
        status: ValidationStatus::Starting,
        blueprint_location: document.location(),
        created: Utc::now(),
    };
    state
        .validations
        .save(record.clone())
        .await
        .map_err(internal)?;

    spawn_validation(state, record.id, source, document.format().to_string(), request.params);

    Ok((StatusCode::ACCEPTED, Json(record)))
}

pub async fn get(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ValidationRecord>> {
    let record = state.validations.get(id).await.map_err(|err| match err {
        StoreError::NotFound(_) => not_found("validation", id),
        other => internal(other),
    })?;
    Ok(Json(record))
}

pub async fn stream(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let last_event_id = parse_last_event_id(
        headers
            .get("Last-Event-ID")
            .and_then(|v| v.to_str().ok()),
    )?;
    Ok(sse::stream_response(&state, ChannelType::Validation, id, last_event_id).await)
}
