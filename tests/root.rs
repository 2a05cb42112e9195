//! End-to-end scenarios against the assembled HTTP API, built on the scripted
//! `FakeBlueprintContainer` in place of a real blueprint loader.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use blueprint_orchestrator::blueprint::fake::{
    DeployOutcome, DeployScript, FakeBlueprintContainer, FakeBlueprintContainerFactory,
    StageChangesScript, StageOutcome,
};
use blueprint_orchestrator::events::store::InMemoryEventStore;
use blueprint_orchestrator::models::{InstanceRecord, InstanceStatus};
use blueprint_orchestrator::resolver::file::LocalFilesystemHandler;
use blueprint_orchestrator::resolver::Resolver;
use blueprint_orchestrator::state::AppState;
use blueprint_orchestrator::stores::changesets::{ChangesetStore, InMemoryChangesetStore};
use blueprint_orchestrator::stores::instances::{InMemoryInstanceStore, InstanceStore};
use blueprint_orchestrator::stores::validations::InMemoryValidationStore;

fn build_state(container: FakeBlueprintContainer) -> AppState {
    AppState {
        events: Arc::new(InMemoryEventStore::new()),
        validations: Arc::new(InMemoryValidationStore::new()),
        changesets: Arc::new(InMemoryChangesetStore::new()),
        instances: Arc::new(InMemoryInstanceStore::new()),
        resolver: Arc::new(Resolver::new(Arc::new(LocalFilesystemHandler))),
        containers: Arc::new(FakeBlueprintContainerFactory { container }),
    }
}

fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(blueprint_orchestrator::api_routes())
        .layer(Extension(state))
}

/// Writes a blueprint file to a fresh temp directory so the default local
/// filesystem resolver can resolve it, and returns the directory (kept alive
/// for the lifetime of the caller) plus its path.
fn write_blueprint() -> (tempfile::TempDir, String, &'static str) {
    let dir = tempfile::tempdir().unwrap();
    let file_name = "test.blueprint.yaml";
    std::fs::write(dir.path().join(file_name), b"name: demo").unwrap();
    let directory = dir.path().to_string_lossy().into_owned();
    (dir, directory, file_name)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Parses an SSE response body into `(event, data, id)` triples. The wire
/// format carries no `end` flag of its own (that's internal Stream
/// Multiplexer bookkeeping, spec.md §4.4) — the final frame of a terminated
/// stream is the one that carried `end=true` server-side.
async fn collect_sse(app: &Router, uri: &str, last_event_id: Option<Uuid>) -> Vec<(String, Value, String)> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(id) = last_event_id {
        builder = builder.header("Last-Event-ID", id.to_string());
    }
    let response = app.clone().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    let mut frames = Vec::new();
    let mut event_name = String::new();
    let mut event_id = String::new();
    let mut data = String::new();
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event_name = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("id:") {
            event_id = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data = rest.trim().to_string();
        } else if line.is_empty() && !event_name.is_empty() {
            let value: Value = serde_json::from_str(&data).unwrap_or(Value::Null);
            frames.push((event_name.clone(), value, event_id.clone()));
            event_name.clear();
            event_id.clear();
            data.clear();
        }
    }
    frames
}

#[tokio::test]
async fn root_responds_ok() {
    let app = build_app(build_state(FakeBlueprintContainer::default()));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// S1 — Create Changeset, happy path.
#[tokio::test]
async fn create_changeset_happy_path_streams_to_completion() {
    let (_dir, directory, file_name) = write_blueprint();
    let container = FakeBlueprintContainer {
        stage_changes: StageChangesScript {
            resource_changes: vec![json!({"added": 1})],
            child_changes: vec![json!({"added": 1})],
            link_changes: vec![json!({"added": 1})],
            outcome: Some(StageOutcome::Complete(json!({"resources": {}}))),
        },
        ..Default::default()
    };
    let app = build_app(build_state(container));

    let (status, body) = send(
        &app,
        post_json(
            "/deployments/changes",
            json!({
                "fileSourceScheme": "file",
                "directory": directory,
                "blueprintFile": file_name,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "starting");
    assert_eq!(
        body["blueprintLocation"],
        format!("file://{}/{}", directory.trim_end_matches('/'), file_name)
    );
    let id: Uuid = body["id"].as_str().unwrap().parse().unwrap();

    let frames = collect_sse(&app, &format!("/deployments/changes/{id}/stream"), None).await;
    let kinds: Vec<&str> = frames.iter().map(|(name, _, _)| name.as_str()).collect();
    assert_eq!(
        kinds,
        vec!["resourceChanges", "childChanges", "linkChanges", "changeStagingComplete"]
    );
    // The stream terminates right after the frame carrying end=true; that
    // frame is, by construction, the last one collected.

    // Invariant 1: GET after the 202 returns a record whose id matches.
    let (get_status, get_body) = send(
        &app,
        Request::builder()
            .uri(format!("/deployments/changes/{id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(get_status, StatusCode::OK);
    assert_eq!(get_body["id"], id.to_string());
    // Invariant 5: terminal status after end=true.
    assert_eq!(get_body["status"], "changes_staged");
}

/// S2 — Create Changeset, invalid scheme.
#[tokio::test]
async fn create_changeset_invalid_scheme_fails_422() {
    let app = build_app(build_state(FakeBlueprintContainer::default()));

    let (status, body) = send(
        &app,
        post_json(
            "/deployments/changes",
            json!({
                "fileSourceScheme": "files",
                "directory": "/test/dir",
                "blueprintFile": "test.blueprint.yaml",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "request body input validation failed");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["location"], ".fileSourceScheme");
    assert_eq!(
        errors[0]["message"],
        "the value must be one of the following: file s3 gcs azureblob https"
    );
    assert_eq!(errors[0]["type"], "oneof");
}

/// S3 — Create Instance, missing changeset.
#[tokio::test]
async fn create_instance_missing_changeset_fails_400() {
    let (_dir, directory, file_name) = write_blueprint();
    let app = build_app(build_state(FakeBlueprintContainer::default()));

    let (status, body) = send(
        &app,
        post_json(
            "/deployments/instances",
            json!({
                "fileSourceScheme": "file",
                "directory": directory,
                "blueprintFile": file_name,
                "changeSetId": Uuid::now_v7().to_string(),
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "requested change set is missing");
}

/// S4 — Destroy, happy path.
#[tokio::test]
async fn destroy_happy_path_streams_to_finish() {
    let container = FakeBlueprintContainer {
        destroy: DeployScript {
            resources: vec![("res".into(), "destroyed".into())],
            outcome: Some(DeployOutcome::Finish {
                instance_id: String::new(),
                status: "destroyed".into(),
                exports: json!({}),
            }),
            ..Default::default()
        },
        ..Default::default()
    };
    let state = build_state(container);

    let instance_id = Uuid::now_v7();
    state
        .instances
        .save(InstanceRecord {
            id: instance_id,
            status: InstanceStatus::Deployed,
            exports: Default::default(),
            last_status_update_ts: Utc::now(),
        })
        .await
        .unwrap();
    let changeset_id = {
        use blueprint_orchestrator::models::{ChangesetRecord, ChangesetStatus};
        let record = ChangesetRecord {
            id: Uuid::now_v7(),
            instance_id: Some(instance_id),
            destroy: true,
            status: ChangesetStatus::ChangesStaged,
            blueprint_location: "file:///test/dir/test.blueprint.yaml".into(),
            computed_changes: Some(json!({})),
            created: Utc::now(),
        };
        state.changesets.save(record.clone()).await.unwrap();
        record.id
    };

    let app = build_app(state);

    let (status, body) = send(
        &app,
        post_json(
            &format!("/deployments/instances/{instance_id}/destroy"),
            json!({ "changeSetId": changeset_id.to_string() }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "destroying");

    let frames = collect_sse(&app, &format!("/deployments/instances/{instance_id}/stream"), None).await;
    assert_eq!(frames.last().unwrap().0, "finish");
}

/// S5 — Validation with diagnostics-carrying error.
#[tokio::test]
async fn validation_with_diagnostics_reports_failed() {
    use blueprint_orchestrator::models::{Diagnostic, DiagnosticSeverity};

    let (_dir, directory, file_name) = write_blueprint();
    let diagnostics = vec![
        Diagnostic {
            message: "first problem".into(),
            severity: DiagnosticSeverity::Error,
            line: 3,
            column: 1,
        },
        Diagnostic {
            message: "second problem".into(),
            severity: DiagnosticSeverity::Error,
            line: 8,
            column: 4,
        },
    ];
    let container = FakeBlueprintContainer {
        validate_outcome: Some(Ok(diagnostics)),
        ..Default::default()
    };
    let app = build_app(build_state(container));

    let (status, body) = send(
        &app,
        post_json(
            "/validations",
            json!({
                "fileSourceScheme": "file",
                "directory": directory,
                "blueprintFile": file_name,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id: Uuid = body["id"].as_str().unwrap().parse().unwrap();

    let frames = collect_sse(&app, &format!("/validations/{id}/stream"), None).await;
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|(name, _, _)| name == "diagnostic"));
    assert_eq!(frames[0].1["message"], "first problem");
    assert_eq!(frames[1].1["message"], "second problem");

    let (get_status, get_body) = send(
        &app,
        Request::builder()
            .uri(format!("/validations/{id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(get_status, StatusCode::OK);
    assert_eq!(get_body["status"], "failed");
}

/// S6 — Stream resume.
#[tokio::test]
async fn stream_resume_yields_exact_suffix() {
    let (_dir, directory, file_name) = write_blueprint();
    let container = FakeBlueprintContainer {
        stage_changes: StageChangesScript {
            resource_changes: vec![json!({"a": 1})],
            child_changes: vec![json!({"a": 1})],
            link_changes: vec![json!({"a": 1})],
            outcome: Some(StageOutcome::Complete(json!({}))),
        },
        ..Default::default()
    };
    let app = build_app(build_state(container));

    let (_status, body) = send(
        &app,
        post_json(
            "/deployments/changes",
            json!({
                "fileSourceScheme": "file",
                "directory": directory,
                "blueprintFile": file_name,
            }),
        ),
    )
    .await;
    let id: Uuid = body["id"].as_str().unwrap().parse().unwrap();

    let full = collect_sse(&app, &format!("/deployments/changes/{id}/stream"), None).await;
    assert_eq!(full.len(), 4);

    let cursor_id: Uuid = full[1].2.parse().unwrap();

    let suffix = collect_sse(&app, &format!("/deployments/changes/{id}/stream"), Some(cursor_id)).await;
    assert_eq!(suffix.len(), 2);
    assert_eq!(suffix[0].0, "linkChanges");
    assert_eq!(suffix[1].0, "changeStagingComplete");
}

/// Invariant 6: enum completeness for every Create* endpoint that embeds a
/// blueprint location.
#[tokio::test]
async fn invalid_scheme_fails_422_on_validations_too() {
    let app = build_app(build_state(FakeBlueprintContainer::default()));

    let (status, body) = send(
        &app,
        post_json(
            "/validations",
            json!({
                "fileSourceScheme": "ftp",
                "directory": "/test/dir",
                "blueprintFile": "test.blueprint.yaml",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors[0]["location"], ".fileSourceScheme");
    assert_eq!(errors[0]["type"], "oneof");
}
