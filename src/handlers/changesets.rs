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
use crate::models::{ChangesetRecord, ChangesetStatus, CreateChangesetRequest};
use crate::orchestrator::spawn_change_staging;
use crate::sse;
use crate::state::AppState;
use crate::stores::StoreError;

pub async fn create(
    Extension(state): Extension<AppState>,
    Json(request): Json<CreateChangesetRequest>,
) -> AppResult<(StatusCode, Json<ChangesetRecord>)> {
    request
        .validate()
        .map_err(|errors| AppError::Validation(crate::validation::translate(&errors)))?;

    let document = request.blueprint_document.into_domain();
    let source = state
        .resolver
        .resolve(&document)
        .await
        .map_err(|err| AppError::ResolverError(err.to_string()))?;

    let instance_id = match request.instance_id {
        Some(id) => Some(id),
        None => match request.instance_name {
            Some(name) => state
                .instances
                .find_id_by_name(&name)
                .await
                .map_err(internal)?,
            None => None,
        },
    };

    let record = ChangesetRecord {
        id: Uuid::now_v7(),
        instance_id,
        destroy: request.destroy,
        status: ChangesetStatus::Starting,
        blueprint_location: document.location(),
        computed_changes: None,
        created: Utc::now(),
    };
    state.changesets.save(record.clone()).await.map_err(internal)?;

    spawn_change_staging(
        state,
        record.id,
        instance_id,
        request.destroy,
        source,
        document.format().to_string(),
    );

    Ok((StatusCode::ACCEPTED, Json(record)))
}

pub async fn get(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ChangesetRecord>> {
    let record = state.changesets.get(id).await.map_err(|err| match err {
        StoreError::NotFound(_) => not_found("changeset", id),
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
    Ok(sse::stream_response(&state, ChannelType::Changeset, id, last_event_id).await)
}
