//! The long-running job core (spec.md §4.2): drives `Validate` /
//! `StageChanges` / `Deploy` / `Destroy` against a blueprint container and
//! translates its typed channel messages into Event Store writes and
//! lifecycle-state transitions.
//!
//! Each `spawn_*` function is `tokio::spawn`-ed by the Controller immediately
//! after the Starting record has been persisted (invariant 1) and returns
//! without waiting for the job.

mod change_staging;
mod deploy;
mod validation;

pub use change_staging::spawn_change_staging;
pub use deploy::{spawn_deploy, spawn_destroy};
pub use validation::spawn_validation;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::events::{ChannelType, EventRecord, EventType};
use crate::state::AppState;

/// Persists one event, logging and skipping on id-gen/marshal failure rather
/// than aborting the job (spec.md §4.2's per-event persistence rule).
pub(crate) async fn save_event(
    state: &AppState,
    event_type: EventType,
    channel_type: ChannelType,
    channel_id: Uuid,
    data: impl Serialize,
    end: bool,
) {
    match EventRecord::new(event_type, channel_type, channel_id, data, end) {
        Ok(event) => {
            if let Err(err) = state.events.save(event).await {
                tracing::warn!(?err, %channel_id, "failed to persist event, continuing job");
            }
        }
        Err(err) => {
            tracing::warn!(?err, %channel_id, "failed to serialize event data, skipping");
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ErrorEventData {
    pub message: String,
    pub diagnostics: Vec<crate::models::Diagnostic>,
    pub timestamp: chrono::DateTime<Utc>,
}
