//! The blueprint container contract (spec.md §1, §4.2): `Validate`,
//! `StageChanges`, `Deploy`, `Destroy`, each emitting typed messages on
//! caller-provided channels. The container itself — the resource-graph
//! algorithm and plugin framework that drive real infrastructure — is an
//! out-of-scope external collaborator; this module only defines the contract
//! the Orchestrator drives, plus (under `test-support`) a scripted fake used
//! by this crate's own tests.

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::diagnostics::LoaderError;
use crate::models::Diagnostic;

/// An error surfaced by the blueprint container. May carry a structured
/// loader error tree (spec.md §7) for diagnostic extraction.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ContainerError {
    pub message: String,
    pub loader_error: Option<LoaderError>,
}

impl ContainerError {
    pub fn plain(message: impl Into<String>) -> Self {
        ContainerError {
            message: message.into(),
            loader_error: None,
        }
    }

    /// Diagnostics extracted from this error per spec.md §7. `drop_runtime_only`
    /// drops leaves that are runtime/execution errors rather than authoring
    /// errors (set for validation contexts). `fallback_to_general_diagnostic`
    /// controls whether a non-structured error yields one line-0 diagnostic
    /// (the deployment path) or an empty list (change staging).
    pub fn diagnostics(
        &self,
        drop_runtime_only: bool,
        fallback_to_general_diagnostic: bool,
    ) -> Vec<Diagnostic> {
        match &self.loader_error {
            Some(tree) => crate::diagnostics::flatten(tree, drop_runtime_only),
            None if fallback_to_general_diagnostic => {
                crate::diagnostics::general_diagnostic(self.message.clone())
            }
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateOutcome {
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceChangesMessage {
    pub resource_name: String,
    pub changes: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChildChangesMessage {
    pub child_name: String,
    pub changes: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkChangesMessage {
    pub link_name: String,
    pub changes: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeStagingCompleteMessage {
    pub changes: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceMessage {
    pub resource_name: String,
    pub status: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChildMessage {
    pub child_name: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkMessage {
    pub link_name: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// `status` is expected to be `"preparing"` for the first message of a
/// brand-new deployment (spec.md §4.2, §9's open question).
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentUpdateMessage {
    pub instance_id: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinishMessage {
    pub instance_id: String,
    pub status: String,
    pub exports: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// The four typed receive channels plus an error channel that `StageChanges`
/// hands back to the Orchestrator's select loop (spec.md §4.2).
pub struct ChangeStagingChannels {
    pub resource_changes: mpsc::Receiver<ResourceChangesMessage>,
    pub child_changes: mpsc::Receiver<ChildChangesMessage>,
    pub link_changes: mpsc::Receiver<LinkChangesMessage>,
    pub complete: oneshot::Receiver<ChangeStagingCompleteMessage>,
    pub error: oneshot::Receiver<ContainerError>,
}

/// The five-channel bundle plus error channel `Deploy`/`Destroy` hand back
/// (spec.md §4.2).
pub struct DeployChannels {
    pub resource: mpsc::Receiver<ResourceMessage>,
    pub link: mpsc::Receiver<LinkMessage>,
    pub child: mpsc::Receiver<ChildMessage>,
    pub deployment_update: mpsc::Receiver<DeploymentUpdateMessage>,
    pub finish: oneshot::Receiver<FinishMessage>,
    pub error: oneshot::Receiver<ContainerError>,
}

#[async_trait]
pub trait BlueprintContainer: Send + Sync {
    async fn validate(
        &self,
        source: &str,
        format: &str,
        params: &serde_json::Value,
    ) -> Result<ValidateOutcome, ContainerError>;

    async fn stage_changes(&self, instance_id: Option<Uuid>, destroy: bool) -> ChangeStagingChannels;

    async fn deploy(
        &self,
        instance_id: Option<Uuid>,
        changes: serde_json::Value,
        rollback: bool,
    ) -> DeployChannels;

    /// Uses a placeholder blueprint internally — the destroy path doesn't
    /// need the original source (spec.md §4.2, §9).
    async fn destroy(&self, instance_id: Uuid) -> DeployChannels;
}

/// Builds a `BlueprintContainer` for a resolved blueprint source. A real
/// implementation would parse/load the document; this is the seam the
/// out-of-scope loader library plugs into.
#[async_trait]
pub trait BlueprintContainerFactory: Send + Sync {
    async fn load(
        &self,
        source: &str,
        format: &str,
    ) -> Result<Box<dyn BlueprintContainer>, ContainerError>;

    /// A container obtained from a minimal stub document, used by `Destroy`
    /// (spec.md §4.2: "uses a placeholder blueprint ... because the
    /// blueprint source is not needed to destroy").
    async fn load_placeholder(&self) -> Result<Box<dyn BlueprintContainer>, ContainerError>;
}

/// Default factory wired by `main.rs` until a real blueprint container
/// library is plugged in. Every call fails; this only exists so the binary
/// has something concrete to construct `AppState` with.
pub struct UnimplementedContainerFactory;

#[async_trait]
impl BlueprintContainerFactory for UnimplementedContainerFactory {
    async fn load(&self, _source: &str, _format: &str) -> Result<Box<dyn BlueprintContainer>, ContainerError> {
        Err(ContainerError::plain("no blueprint container factory configured"))
    }

    async fn load_placeholder(&self) -> Result<Box<dyn BlueprintContainer>, ContainerError> {
        Err(ContainerError::plain("no blueprint container factory configured"))
    }
}
