use std::convert::Infallible;

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tokio_util::io::ReaderStream;

use crate::manager::job::{JobStatus, SubmitRequest};

use super::error::ApiError;
use super::models::{
    HealthResponse, JobListResponse, ListJobsParams, MediaInfoRequest, SavedResponse,
};
use super::state::AppState;

/// Submission endpoint (`POST /jobs`).
///
/// Resolves the source, validates the encoding selector against the resolved
/// catalog, and queues a new job. Validation and resolution failures reject
/// the submission outright; no job record or event is produced for them.
/// Returns 202 Accepted: the job is queued, not done.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.manager.submit(request).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// List jobs, newest first (`GET /jobs`, optional `?status=` filter).
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListJobsParams>,
) -> Json<JobListResponse> {
    let jobs = match params.status {
        Some(status) => state.manager.list_by_status(status).await,
        None => state.manager.list().await,
    };
    Json(jobs.into())
}

/// Job status endpoint (`GET /jobs/{job_id}`).
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.manager.get(&job_id).await?;
    Ok(Json(job))
}

/// Cancel a queued or downloading job (`POST /jobs/{job_id}/cancel`).
///
/// Cancelling does not abort an in-flight transfer; it marks the record so
/// the transfer's eventual outcome is discarded.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.manager.cancel(&job_id).await?;
    Ok(Json(job))
}

/// Delete a job record and, best-effort, its artifact file
/// (`DELETE /jobs/{job_id}`).
pub async fn remove_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.manager.remove(&job_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("job {job_id}")))
    }
}

/// Copy a completed job's artifact into the media library
/// (`POST /jobs/{job_id}/save`).
pub async fn save_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.manager.get(&job_id).await?;
    let library_path = state.exporter.save_to_library(&job).await?;
    Ok(Json(SavedResponse {
        job_id: job.id,
        library_path,
    }))
}

/// Stream a completed job's artifact bytes (`GET /jobs/{job_id}/artifact`).
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.manager.get(&job_id).await?;

    let path = match (&job.status, &job.artifact_path) {
        (JobStatus::Completed, Some(path)) => path.clone(),
        _ => {
            return Err(ApiError::Conflict(format!(
                "job {job_id} has no artifact to serve"
            )));
        }
    };

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("artifact unreadable: {e}")))?;

    let headers = [
        (header::CONTENT_TYPE, job.encoding.kind.mime_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", job.file_name()),
        ),
    ];
    let body = Body::from_stream(ReaderStream::new(file));
    Ok((headers, body))
}

/// Proxy the resolver's format catalog (`POST /media-info`) so consumers can
/// pick an encoding before submitting.
pub async fn media_info(
    State(state): State<AppState>,
    Json(request): Json<MediaInfoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let info = state.resolver.resolve(&request.source_url).await?;
    Ok(Json(info))
}

/// Lifecycle event stream (`GET /events`), one SSE event per bus message,
/// named after the topic (`job-added`, `job-progress`, ...). Subscribers
/// that fall too far behind see a gap and should re-`list()`.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.manager.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        let event = msg.ok()?;
        let sse = Event::default()
            .event(event.name())
            .json_data(&event)
            .ok()?;
        Some(Ok(sse))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Health endpoint (`GET /health`).
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    use std::collections::HashMap;

    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert("store".to_string(), "healthy".to_string());
    components.insert("manager".to_string(), "healthy".to_string());

    let response = HealthResponse {
        status: "healthy".to_string(),
        components,
        active_downloads: state.manager.active_count(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}
