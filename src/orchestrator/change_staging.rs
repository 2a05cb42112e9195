//! Change-staging job (spec.md §4.2).

use chrono::Utc;
use uuid::Uuid;

use super::{save_event, ErrorEventData};
use crate::blueprint::{ChangeStagingChannels, ContainerError};
use crate::events::{ChannelType, EventType};
use crate::models::ChangesetStatus;
use crate::state::AppState;

pub fn spawn_change_staging(
    state: AppState,
    changeset_id: Uuid,
    instance_id: Option<Uuid>,
    destroy: bool,
    source: String,
    format: String,
) {
    tokio::spawn(run(state, changeset_id, instance_id, destroy, source, format));
}

async fn run(
    state: AppState,
    changeset_id: Uuid,
    instance_id: Option<Uuid>,
    destroy: bool,
    source: String,
    format: String,
) {
    advance_status(&state, changeset_id, ChangesetStatus::Staging).await;

    let container = match state.containers.load(&source, &format).await {
        Ok(container) => container,
        Err(err) => {
            fail(&state, changeset_id, err).await;
            return;
        }
    };

    let channels = container.stage_changes(instance_id, destroy).await;
    let timeout = *crate::config::CHANGE_STAGING_TIMEOUT;

    match tokio::time::timeout(timeout, select_loop(&state, changeset_id, channels)).await {
        Ok(Outcome::Complete(changes)) => {
            if let Ok(mut record) = state.changesets.get(changeset_id).await {
                record.status = ChangesetStatus::ChangesStaged;
                record.computed_changes = Some(changes);
                if let Err(err) = state.changesets.save(record).await {
                    tracing::warn!(?err, %changeset_id, "failed to persist changes_staged status");
                }
            }
        }
        Ok(Outcome::Error(err)) => fail(&state, changeset_id, err).await,
        Err(_elapsed) => {
            tracing::warn!(%changeset_id, "change staging job timed out");
            fail(&state, changeset_id, ContainerError::plain("change staging job timed out")).await;
        }
    }
}

enum Outcome {
    Complete(serde_json::Value),
    Error(ContainerError),
}

async fn select_loop(state: &AppState, changeset_id: Uuid, channels: ChangeStagingChannels) -> Outcome {
    let mut resource_open = true;
    let mut child_open = true;
    let mut link_open = true;
    let mut resource_changes = channels.resource_changes;
    let mut child_changes = channels.child_changes;
    let mut link_changes = channels.link_changes;
    // Wrapped in `Option` and disabled with `if` guards once resolved: a
    // oneshot receiver keeps returning `Ready` on every poll after the first,
    // which would otherwise spin the unused branch until the other fires.
    let mut complete = Some(channels.complete);
    let mut error = Some(channels.error);

    loop {
        tokio::select! {
            msg = resource_changes.recv(), if resource_open => {
                match msg {
                    Some(message) => {
                        save_event(state, EventType::ResourceChanges, ChannelType::Changeset, changeset_id, message, false).await;
                    }
                    None => resource_open = false,
                }
            }
            msg = child_changes.recv(), if child_open => {
                match msg {
                    Some(message) => {
                        save_event(state, EventType::ChildChanges, ChannelType::Changeset, changeset_id, message, false).await;
                    }
                    None => child_open = false,
                }
            }
            msg = link_changes.recv(), if link_open => {
                match msg {
                    Some(message) => {
                        save_event(state, EventType::LinkChanges, ChannelType::Changeset, changeset_id, message, false).await;
                    }
                    None => link_open = false,
                }
            }
            res = complete.as_mut().unwrap(), if complete.is_some() => {
                complete = None;
                if let Ok(message) = res {
                    save_event(
                        state,
                        EventType::ChangeStagingComplete,
                        ChannelType::Changeset,
                        changeset_id,
                        &message,
                        true,
                    )
                    .await;
                    return Outcome::Complete(message.changes);
                }
            }
            res = error.as_mut().unwrap(), if error.is_some() => {
                error = None;
                if let Ok(container_err) = res {
                    return Outcome::Error(container_err);
                }
            }
        }
    }
}

async fn fail(state: &AppState, changeset_id: Uuid, err: ContainerError) {
    let diagnostics = err.diagnostics(false, false);
    save_event(
        state,
        EventType::Error,
        ChannelType::Changeset,
        changeset_id,
        ErrorEventData {
            message: err.message.clone(),
            diagnostics,
            timestamp: Utc::now(),
        },
        true,
    )
    .await;

    if let Ok(mut record) = state.changesets.get(changeset_id).await {
        record.status = ChangesetStatus::Failed;
        if let Err(err) = state.changesets.save(record).await {
            tracing::warn!(?err, %changeset_id, "failed to persist failed status");
        }
    }
}

async fn advance_status(state: &AppState, changeset_id: Uuid, status: ChangesetStatus) {
    if let Ok(mut record) = state.changesets.get(changeset_id).await {
        record.status = status;
        if let Err(err) = state.changesets.save(record).await {
            tracing::warn!(?err, %changeset_id, "failed to persist status");
        }
    }
}
