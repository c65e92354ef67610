use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::buckets;
use super::health;
use super::revisions;
use super::state::AppState;
use super::workflows;

/// Create the bucket and workflow catalog router
pub fn create_buckets_router() -> Router<AppState> {
    Router::new()
        .route("/", post(buckets::create_bucket).get(buckets::list_buckets))
        .route("/{bucket_id}", get(buckets::get_bucket))
        .route(
            "/{bucket_id}/workflows",
            post(workflows::create_workflows).get(workflows::list_workflows),
        )
        .route(
            "/{bucket_id}/workflows/{workflow_id}",
            get(workflows::get_workflows).delete(workflows::delete_workflow),
        )
        .route(
            "/{bucket_id}/workflows/{workflow_id}/revisions",
            post(revisions::create_revision).get(revisions::list_revisions),
        )
        .route(
            "/{bucket_id}/workflows/{workflow_id}/revisions/{revision_number}",
            get(revisions::get_revision),
        )
}

/// Create the full router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Catalog API
        .nest("/buckets", create_buckets_router())
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
