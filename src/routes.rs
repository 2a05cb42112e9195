use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers::{changesets, cleanup, health, instances, validations};

pub fn api_routes() -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/validations", post(validations::create))
        .route("/validations/:id", get(validations::get))
        .route("/validations/:id/stream", get(validations::stream))
        .route("/validations/cleanup", post(cleanup::cleanup_validations))
        .route("/deployments/changes", post(changesets::create))
        .route("/deployments/changes/:id", get(changesets::get))
        .route("/deployments/changes/:id/stream", get(changesets::stream))
        .route("/deployments/changes/cleanup", post(cleanup::cleanup_changesets))
        .route("/deployments/instances", post(instances::create))
        .route(
            "/deployments/instances/:id",
            patch(instances::update).get(instances::get),
        )
        .route("/deployments/instances/:id/exports", get(instances::exports))
        .route("/deployments/instances/:id/stream", get(instances::stream))
        .route("/deployments/instances/:id/destroy", post(instances::destroy))
        .route("/events/cleanup", post(cleanup::cleanup_events))
}
