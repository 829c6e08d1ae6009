use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use super::services::{
    cancel_job, events, get_artifact, get_job, health, list_jobs, media_info, remove_job,
    save_job, submit_job,
};
use super::state::AppState;

/// Build the full grabbox router.
pub fn router(state: AppState) -> Router {
    let max_body = state.config.server.max_request_bytes.as_u64() as usize;

    Router::new()
        .route("/jobs", post(submit_job).get(list_jobs))
        .route("/jobs/{job_id}", get(get_job).delete(remove_job))
        .route("/jobs/{job_id}/cancel", post(cancel_job))
        .route("/jobs/{job_id}/save", post(save_job))
        .route("/jobs/{job_id}/artifact", get(get_artifact))
        .route("/media-info", post(media_info))
        .route("/events", get(events))
        .route("/health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
}
