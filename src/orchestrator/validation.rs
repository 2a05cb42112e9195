//! Validation job (spec.md §4.2).

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::save_event;
use crate::events::{ChannelType, EventType};
use crate::models::{DiagnosticSeverity, ValidationStatus};
use crate::state::AppState;

pub fn spawn_validation(state: AppState, validation_id: Uuid, source: String, format: String, params: Value) {
    tokio::spawn(run(state, validation_id, source, format, params));
}

async fn run(state: AppState, validation_id: Uuid, source: String, format: String, params: Value) {
    mark_running(&state, validation_id).await;

    let timeout = *crate::config::VALIDATION_TIMEOUT;
    let diagnostics = match tokio::time::timeout(timeout, validate(&state, &source, &format, &params)).await {
        Ok(outcome) => outcome,
        Err(_elapsed) => {
            tracing::warn!(%validation_id, "validation job timed out");
            crate::diagnostics::general_diagnostic("validation job timed out".to_string())
        }
    };

    let failed = diagnostics
        .iter()
        .any(|d| d.severity == DiagnosticSeverity::Error);
    let terminal = if failed {
        ValidationStatus::Failed
    } else {
        ValidationStatus::Validated
    };

    write_terminal_status(&state, validation_id, terminal).await;
    emit_diagnostics(&state, validation_id, diagnostics).await;
}

/// Calls `Validate` and flattens diagnostics: validation-result diagnostics
/// first, then any extracted from a non-nil error (spec.md §4.2(e)). Both
/// `drop_runtime_only` and `fallback_to_general_diagnostic` are set (spec.md
/// §7: validation is a validation context, and needs at least one diagnostic
/// to report on an unstructured error).
async fn validate(
    state: &AppState,
    source: &str,
    format: &str,
    params: &Value,
) -> Vec<crate::models::Diagnostic> {
    let container = match state.containers.load(source, format).await {
        Ok(container) => container,
        Err(err) => return err.diagnostics(true, true),
    };

    match container.validate(source, format, params).await {
        Ok(outcome) => outcome.diagnostics,
        Err(err) => err.diagnostics(true, true),
    }
}

async fn mark_running(state: &AppState, validation_id: Uuid) {
    if let Ok(mut record) = state.validations.get(validation_id).await {
        record.status = ValidationStatus::Running;
        if let Err(err) = state.validations.save(record).await {
            tracing::warn!(?err, %validation_id, "failed to persist running status");
        }
    }
}

async fn write_terminal_status(state: &AppState, validation_id: Uuid, status: ValidationStatus) {
    match state.validations.get(validation_id).await {
        Ok(mut record) => {
            record.status = status;
            if let Err(err) = state.validations.save(record).await {
                tracing::warn!(?err, %validation_id, "failed to persist terminal status");
            }
        }
        Err(err) => tracing::warn!(?err, %validation_id, "validation record missing at terminal write"),
    }
}

async fn emit_diagnostics(state: &AppState, validation_id: Uuid, diagnostics: Vec<crate::models::Diagnostic>) {
    if diagnostics.is_empty() {
        save_event(
            state,
            EventType::Diagnostic,
            ChannelType::Validation,
            validation_id,
            serde_json::json!({ "diagnostics": Vec::<crate::models::Diagnostic>::new(), "timestamp": Utc::now() }),
            true,
        )
        .await;
        return;
    }

    let last = diagnostics.len() - 1;
    for (i, diagnostic) in diagnostics.into_iter().enumerate() {
        save_event(
            state,
            EventType::Diagnostic,
            ChannelType::Validation,
            validation_id,
            serde_json::json!({ "diagnostic": diagnostic, "timestamp": Utc::now() }),
            i == last,
        )
        .await;
    }
}
