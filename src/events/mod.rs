//! The event record type and the append-only per-channel log contract
//! (spec.md §3, §4.3).

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `channel_type` wire strings (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Validation,
    Changeset,
    Deployment,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Validation => "validation",
            ChannelType::Changeset => "changeset",
            ChannelType::Deployment => "deployment",
        }
    }
}

/// Event `type` wire strings (spec.md §4.2, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "diagnostic")]
    Diagnostic,
    #[serde(rename = "resourceChanges")]
    ResourceChanges,
    #[serde(rename = "childChanges")]
    ChildChanges,
    #[serde(rename = "linkChanges")]
    LinkChanges,
    #[serde(rename = "changeStagingComplete")]
    ChangeStagingComplete,
    #[serde(rename = "resource")]
    Resource,
    #[serde(rename = "child")]
    Child,
    #[serde(rename = "link")]
    Link,
    #[serde(rename = "instanceUpdate")]
    InstanceUpdate,
    #[serde(rename = "finish")]
    Finish,
    #[serde(rename = "error")]
    Error,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Diagnostic => "diagnostic",
            EventType::ResourceChanges => "resourceChanges",
            EventType::ChildChanges => "childChanges",
            EventType::LinkChanges => "linkChanges",
            EventType::ChangeStagingComplete => "changeStagingComplete",
            EventType::Resource => "resource",
            EventType::Child => "child",
            EventType::Link => "link",
            EventType::InstanceUpdate => "instanceUpdate",
            EventType::Finish => "finish",
            EventType::Error => "error",
        }
    }
}

/// An append-only, immutable-once-saved event record (spec.md §3).
///
/// `id` is a UUIDv7 — time-ordered, so it doubles as the total-order sort
/// key within a channel and as a valid resume cursor (invariant 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub channel_type: ChannelType,
    pub channel_id: Uuid,
    /// Opaque JSON already serialized to a string, not re-parsed by the
    /// store; only the orchestrator and SSE layer ever interpret it.
    pub data: String,
    pub timestamp: DateTime<Utc>,
    pub end: bool,
}

impl EventRecord {
    pub fn new(
        event_type: EventType,
        channel_type: ChannelType,
        channel_id: Uuid,
        data: impl Serialize,
        end: bool,
    ) -> Result<Self, serde_json::Error> {
        Ok(EventRecord {
            id: Uuid::now_v7(),
            event_type,
            channel_type,
            channel_id,
            data: serde_json::to_string(&data)?,
            timestamp: Utc::now(),
            end,
        })
    }
}
