//! Wire and persisted record shapes shared by the stores, orchestrator and
//! controller: operation records, the blueprint location descriptor, and the
//! small value types that travel with them over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// `file_source_scheme` enum values accepted on the HTTP boundary.
///
/// Any other value fails body validation with `oneof`, matching spec.md S2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSourceScheme {
    File,
    S3,
    Gcs,
    Azureblob,
    Https,
}

impl FileSourceScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileSourceScheme::File => "file",
            FileSourceScheme::S3 => "s3",
            FileSourceScheme::Gcs => "gcs",
            FileSourceScheme::Azureblob => "azureblob",
            FileSourceScheme::Https => "https",
        }
    }
}

impl Default for FileSourceScheme {
    fn default() -> Self {
        FileSourceScheme::File
    }
}

fn default_blueprint_file() -> String {
    "project.blueprint.yml".to_string()
}

/// Request-side value describing where to fetch the blueprint document from.
/// Never persisted in its raw form — only its derived `location()` string is.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintDocumentInfo {
    #[serde(default)]
    pub file_source_scheme: FileSourceScheme,
    pub directory: String,
    #[serde(default = "default_blueprint_file")]
    pub blueprint_file: String,
    #[serde(default)]
    pub location_metadata: std::collections::BTreeMap<String, serde_json::Value>,
}

impl BlueprintDocumentInfo {
    /// `"<scheme>://<dir-no-trailing-slash>/<file-no-leading-slash>"`, used for
    /// display/persistence only (spec.md §4.6).
    pub fn location(&self) -> String {
        let dir = self.directory.trim_end_matches('/');
        let file = self.blueprint_file.trim_start_matches('/');
        format!("{}://{}/{}", self.file_source_scheme.as_str(), dir, file)
    }

    /// Document format inferred from the file extension, passed to
    /// `BlueprintContainerFactory::load` (spec.md §4.2).
    pub fn format(&self) -> &'static str {
        let lower = self.blueprint_file.to_ascii_lowercase();
        if lower.ends_with(".json") {
            "json"
        } else {
            "yaml"
        }
    }
}

fn default_file_source_scheme_str() -> String {
    "file".to_string()
}

/// The wire-level counterpart of `BlueprintDocumentInfo`. `file_source_scheme`
/// stays a raw `String` here (rather than the domain enum) so an unrecognized
/// value surfaces as a `422 oneof` validation error instead of failing at
/// JSON deserialization with an opaque 400 (spec.md §4.1, §8 invariant 6).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintDocumentInfoRequest {
    #[serde(default = "default_file_source_scheme_str")]
    #[validate(custom = "validate_file_source_scheme")]
    pub file_source_scheme: String,
    #[validate(length(min = 1, message = "directory must not be empty"))]
    pub directory: String,
    #[serde(default = "default_blueprint_file")]
    pub blueprint_file: String,
    #[serde(default)]
    pub location_metadata: std::collections::BTreeMap<String, serde_json::Value>,
}

impl BlueprintDocumentInfoRequest {
    /// Only call after `.validate()` has passed; an unrecognized scheme
    /// defaults to `file` here since validation already rejected it.
    pub fn into_domain(self) -> BlueprintDocumentInfo {
        let file_source_scheme = match self.file_source_scheme.as_str() {
            "s3" => FileSourceScheme::S3,
            "gcs" => FileSourceScheme::Gcs,
            "azureblob" => FileSourceScheme::Azureblob,
            "https" => FileSourceScheme::Https,
            _ => FileSourceScheme::File,
        };
        BlueprintDocumentInfo {
            file_source_scheme,
            directory: self.directory,
            blueprint_file: self.blueprint_file,
            location_metadata: self.location_metadata,
        }
    }
}

fn validate_file_source_scheme(value: &str) -> Result<(), ValidationError> {
    match value {
        "file" | "s3" | "gcs" | "azureblob" | "https" => Ok(()),
        _ => {
            let mut error = ValidationError::new("oneof");
            error.message = Some(
                "the value must be one of the following: file s3 gcs azureblob https".into(),
            );
            Err(error)
        }
    }
}

/// Lifecycle status of a Validation operation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Starting,
    Running,
    Validated,
    Failed,
}

impl ValidationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ValidationStatus::Validated | ValidationStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRecord {
    pub id: Uuid,
    pub status: ValidationStatus,
    pub blueprint_location: String,
    pub created: DateTime<Utc>,
}

/// Lifecycle status of a Changeset operation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangesetStatus {
    Starting,
    Staging,
    ChangesStaged,
    Failed,
}

impl ChangesetStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChangesetStatus::ChangesStaged | ChangesetStatus::Failed
        )
    }

    /// Invariant 4: monotonic {starting -> staging -> (changes_staged|failed)}.
    /// Backwards transitions are rejected by `advance`.
    pub fn can_advance_to(&self, next: ChangesetStatus) -> bool {
        use ChangesetStatus::*;
        matches!(
            (self, next),
            (Starting, Staging)
                | (Staging, ChangesStaged)
                | (Staging, Failed)
                | (Starting, Failed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesetRecord {
    pub id: Uuid,
    pub instance_id: Option<Uuid>,
    pub destroy: bool,
    pub status: ChangesetStatus,
    pub blueprint_location: String,
    pub computed_changes: Option<serde_json::Value>,
    pub created: DateTime<Utc>,
}

/// Coarse instance status. The Instance record itself is owned by an
/// external state container (spec.md §3); this core only reads
/// `instance_id`/`status`/`exports`/`last_status_update_ts` and writes a
/// coarse status hint when it accepts a deploy/destroy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Preparing,
    Deploying,
    Deployed,
    Destroying,
    Destroyed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub id: Uuid,
    pub status: InstanceStatus,
    pub exports: std::collections::BTreeMap<String, serde_json::Value>,
    pub last_status_update_ts: DateTime<Utc>,
}

impl InstanceRecord {
    /// Controller's 202 response on destroy overrides `status` with a
    /// `destroying` hint without mutating the stored record (spec.md §4.1).
    pub fn with_status_hint(&self, status: InstanceStatus) -> InstanceRecord {
        InstanceRecord {
            status,
            ..self.clone()
        }
    }
}

/// A structured authoring/validation finding (spec.md §3, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub message: String,
    pub severity: DiagnosticSeverity,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// One entry of the 422 input-validation error body (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFieldError {
    pub location: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

// --- Request bodies (spec.md §4.1, §6, §8's S1-S6) ---

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateValidationRequest {
    #[validate]
    #[serde(flatten)]
    pub blueprint_document: BlueprintDocumentInfoRequest,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChangesetRequest {
    #[validate]
    #[serde(flatten)]
    pub blueprint_document: BlueprintDocumentInfoRequest,
    #[serde(default)]
    pub instance_id: Option<Uuid>,
    #[serde(default)]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub destroy: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    #[validate]
    #[serde(flatten)]
    pub blueprint_document: BlueprintDocumentInfoRequest,
    pub change_set_id: Uuid,
    #[serde(default)]
    pub plugin_config: serde_json::Value,
    #[serde(default)]
    pub rollback: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DestroyInstanceRequest {
    pub change_set_id: Uuid,
    #[serde(default)]
    pub plugin_config: serde_json::Value,
}
