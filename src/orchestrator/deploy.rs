//! Deploy and Destroy jobs (spec.md §4.2). Both drive the same five-channel
//! `DeployChannels` bundle through the same select loop; they differ only in
//! how the container is obtained and whether the operation id is known up
//! front.

use chrono::Utc;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{save_event, ErrorEventData};
use crate::blueprint::{ContainerError, DeployChannels};
use crate::events::{ChannelType, EventType};
use crate::state::AppState;

/// `ready_tx` is sent the operation's channel id as soon as it is known:
/// immediately for an existing instance, or once the container's first
/// `preparing` message is observed for a new one (spec.md §4.1's "capture
/// the instance id ... before returning").
pub fn spawn_deploy(
    state: AppState,
    instance_id: Option<Uuid>,
    source: String,
    format: String,
    changes: serde_json::Value,
    rollback: bool,
    ready_tx: oneshot::Sender<Uuid>,
) {
    tokio::spawn(async move {
        let container = match state.containers.load(&source, &format).await {
            Ok(container) => container,
            Err(err) => {
                report_load_failure(&state, instance_id, err, ready_tx).await;
                return;
            }
        };

        let mut channels = container.deploy(instance_id, changes, rollback).await;

        let channel_id = match instance_id {
            Some(id) => {
                let _ = ready_tx.send(id);
                id
            }
            None => match capture_preparing(&state, &mut channels).await {
                Some(id) => {
                    let _ = ready_tx.send(id);
                    id
                }
                None => {
                    // Container closed without ever announcing a preparing
                    // instance id; nothing sensible to report back or persist
                    // events under.
                    return;
                }
            },
        };

        let timeout = *crate::config::DEPLOYMENT_TIMEOUT;
        match tokio::time::timeout(timeout, select_loop(&state, channel_id, channels)).await {
            Ok(Some(err)) => fail(&state, channel_id, err).await,
            Ok(None) => {}
            Err(_elapsed) => {
                tracing::warn!(%channel_id, "deploy job timed out");
                fail(&state, channel_id, ContainerError::plain("deploy job timed out")).await;
            }
        }
    });
}

pub fn spawn_destroy(state: AppState, instance_id: Uuid) {
    tokio::spawn(async move {
        let container = match state.containers.load_placeholder().await {
            Ok(container) => container,
            Err(err) => {
                fail(&state, instance_id, err).await;
                return;
            }
        };
        let channels = container.destroy(instance_id).await;
        let timeout = *crate::config::DEPLOYMENT_TIMEOUT;
        match tokio::time::timeout(timeout, select_loop(&state, instance_id, channels)).await {
            Ok(Some(err)) => fail(&state, instance_id, err).await,
            Ok(None) => {}
            Err(_elapsed) => {
                tracing::warn!(%instance_id, "destroy job timed out");
                fail(&state, instance_id, ContainerError::plain("destroy job timed out")).await;
            }
        }
    });
}

async fn report_load_failure(
    state: &AppState,
    instance_id: Option<Uuid>,
    err: ContainerError,
    ready_tx: oneshot::Sender<Uuid>,
) {
    let channel_id = instance_id.unwrap_or_else(Uuid::now_v7);
    let _ = ready_tx.send(channel_id);
    fail(state, channel_id, err).await;
}

/// Consumes the container's first `deployment_update` message, requiring
/// `status == "preparing"`, and writes it as the first `instanceUpdate`
/// event under the newly adopted channel id (spec.md §4.2(c)).
async fn capture_preparing(state: &AppState, channels: &mut DeployChannels) -> Option<Uuid> {
    let msg = channels.deployment_update.recv().await?;
    if msg.status != "preparing" {
        tracing::warn!(status = %msg.status, "first deployment update was not preparing, instance id not captured");
        return None;
    }
    let channel_id = match msg.instance_id.parse::<Uuid>() {
        Ok(id) => id,
        Err(_) => Uuid::now_v7(),
    };
    save_event(state, EventType::InstanceUpdate, ChannelType::Deployment, channel_id, &msg, false).await;
    Some(channel_id)
}

/// Returns `Some(err)` on error, `None` on a clean finish. The terminal
/// `finish`/`error` event is always written with `end=true` inside this loop
/// or by the caller's `fail` path.
async fn select_loop(state: &AppState, channel_id: Uuid, channels: DeployChannels) -> Option<ContainerError> {
    let mut resource_open = true;
    let mut child_open = true;
    let mut link_open = true;
    let mut update_open = true;
    let mut resource = channels.resource;
    let mut child = channels.child;
    let mut link = channels.link;
    let mut deployment_update = channels.deployment_update;
    let mut finish = Some(channels.finish);
    let mut error = Some(channels.error);

    loop {
        tokio::select! {
            msg = resource.recv(), if resource_open => {
                match msg {
                    Some(message) => save_event(state, EventType::Resource, ChannelType::Deployment, channel_id, message, false).await,
                    None => resource_open = false,
                }
            }
            msg = child.recv(), if child_open => {
                match msg {
                    Some(message) => save_event(state, EventType::Child, ChannelType::Deployment, channel_id, message, false).await,
                    None => child_open = false,
                }
            }
            msg = link.recv(), if link_open => {
                match msg {
                    Some(message) => save_event(state, EventType::Link, ChannelType::Deployment, channel_id, message, false).await,
                    None => link_open = false,
                }
            }
            msg = deployment_update.recv(), if update_open => {
                match msg {
                    Some(message) => save_event(state, EventType::InstanceUpdate, ChannelType::Deployment, channel_id, message, false).await,
                    None => update_open = false,
                }
            }
            res = finish.as_mut().unwrap(), if finish.is_some() => {
                finish = None;
                if let Ok(message) = res {
                    save_event(state, EventType::Finish, ChannelType::Deployment, channel_id, &message, true).await;
                    return None;
                }
            }
            res = error.as_mut().unwrap(), if error.is_some() => {
                error = None;
                if let Ok(container_err) = res {
                    return Some(container_err);
                }
            }
        }
    }
}

/// The generic deployment-path error branch: `fallback_to_general_diagnostic`
/// is set, so an unstructured error still yields one line-0 diagnostic
/// (spec.md §7).
async fn fail(state: &AppState, channel_id: Uuid, err: ContainerError) {
    let diagnostics = err.diagnostics(false, true);
    save_event(
        state,
        EventType::Error,
        ChannelType::Deployment,
        channel_id,
        ErrorEventData {
            message: err.message.clone(),
            diagnostics,
            timestamp: Utc::now(),
        },
        true,
    )
    .await;
}
