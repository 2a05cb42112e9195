use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use tokio::sync::oneshot;
use uuid::Uuid;
use validator::Validate;

use super::{internal, not_found, parse_last_event_id};
use crate::blueprint::ContainerError;
use crate::error::{AppError, AppResult};
use crate::events::ChannelType;
use crate::models::{CreateInstanceRequest, DestroyInstanceRequest, InstanceRecord, InstanceStatus};
use crate::orchestrator::{spawn_deploy, spawn_destroy};
use crate::sse;
use crate::state::AppState;
use crate::stores::StoreError;

pub async fn create(
    Extension(state): Extension<AppState>,
    Json(request): Json<CreateInstanceRequest>,
) -> AppResult<(StatusCode, Json<InstanceRecord>)> {
    start_deployment(state, None, request).await
}

pub async fn update(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateInstanceRequest>,
) -> AppResult<(StatusCode, Json<InstanceRecord>)> {
    start_deployment(state, Some(id), request).await
}

async fn start_deployment(
    state: AppState,
    instance_id: Option<Uuid>,
    request: CreateInstanceRequest,
) -> AppResult<(StatusCode, Json<InstanceRecord>)> {
    request
        .validate()
        .map_err(|errors| AppError::Validation(crate::validation::translate(&errors)))?;

    let document = request.blueprint_document.into_domain();
    let source = state
        .resolver
        .resolve(&document)
        .await
        .map_err(|err| AppError::ResolverError(err.to_string()))?;
    let format = document.format().to_string();

    let container = state
        .containers
        .load(&source, &format)
        .await
        .map_err(|err| load_error(err))?;

    let config_outcome = container
        .validate(&source, &format, &request.plugin_config)
        .await
        .map_err(|err| AppError::PluginConfigInvalid(err.diagnostics(false, false)))?;
    if config_outcome
        .diagnostics
        .iter()
        .any(|d| d.severity == crate::models::DiagnosticSeverity::Error)
    {
        return Err(AppError::PluginConfigInvalid(config_outcome.diagnostics));
    }

    let changeset = state
        .changesets
        .get(request.change_set_id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound(_) => AppError::MissingChangeset,
            other => internal(other),
        })?;
    let changes = changeset.computed_changes.clone().unwrap_or(serde_json::json!({}));

    let (ready_tx, ready_rx) = oneshot::channel();
    spawn_deploy(state.clone(), instance_id, source, format, changes, request.rollback, ready_tx);
    let channel_id = ready_rx.await.map_err(internal)?;

    let status = if instance_id.is_some() {
        InstanceStatus::Deploying
    } else {
        InstanceStatus::Preparing
    };
    let record = InstanceRecord {
        id: channel_id,
        status,
        exports: Default::default(),
        last_status_update_ts: Utc::now(),
    };
    state.instances.save(record.clone()).await.map_err(internal)?;

    Ok((StatusCode::ACCEPTED, Json(record)))
}

pub async fn destroy(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<DestroyInstanceRequest>,
) -> AppResult<(StatusCode, Json<InstanceRecord>)> {
    request
        .validate()
        .map_err(|errors| AppError::Validation(crate::validation::translate(&errors)))?;
    request.changesets_exist(&state).await?;

    let container = state
        .containers
        .load_placeholder()
        .await
        .map_err(|err| load_error(err))?;
    let config_outcome = container
        .validate("", "", &request.plugin_config)
        .await
        .map_err(|err| AppError::PluginConfigInvalid(err.diagnostics(false, false)))?;
    if config_outcome
        .diagnostics
        .iter()
        .any(|d| d.severity == crate::models::DiagnosticSeverity::Error)
    {
        return Err(AppError::PluginConfigInvalid(config_outcome.diagnostics));
    }

    let mut record = state.instances.get(id).await.map_err(|err| match err {
        StoreError::NotFound(_) => not_found("instance", id),
        other => internal(other),
    })?;
    record.status = InstanceStatus::Destroying;
    record.last_status_update_ts = Utc::now();
    state.instances.save(record.clone()).await.map_err(internal)?;

    spawn_destroy(state, id);

    Ok((StatusCode::ACCEPTED, Json(record.with_status_hint(InstanceStatus::Destroying))))
}

pub async fn get(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InstanceRecord>> {
    let record = state.instances.get(id).await.map_err(|err| match err {
        StoreError::NotFound(_) => not_found("instance", id),
        other => internal(other),
    })?;
    Ok(Json(record))
}

pub async fn exports(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<std::collections::BTreeMap<String, serde_json::Value>>> {
    let record = state.instances.get(id).await.map_err(|err| match err {
        StoreError::NotFound(_) => not_found("instance", id),
        other => internal(other),
    })?;
    Ok(Json(record.exports))
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
    Ok(sse::stream_response(&state, ChannelType::Deployment, id, last_event_id).await)
}

fn load_error(err: ContainerError) -> AppError {
    let diagnostics = err.diagnostics(false, false);
    if diagnostics.is_empty() {
        AppError::Internal(err.message)
    } else {
        AppError::BlueprintLoad(diagnostics)
    }
}

impl DestroyInstanceRequest {
    async fn changesets_exist(&self, state: &AppState) -> AppResult<()> {
        state
            .changesets
            .get(self.change_set_id)
            .await
            .map_err(|err| match err {
                StoreError::NotFound(_) => AppError::MissingChangeset,
                other => internal(other),
            })?;
        Ok(())
    }
}
