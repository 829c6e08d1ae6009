//! Request/response bodies for the grabbox HTTP surface.
//!
//! Job records serialize directly as responses; these types cover the
//! remaining envelopes. Submission example:
//!
//! ```json
//! {
//!   "source_url": "https://media.example/watch?v=abc123",
//!   "format_id": "18",
//!   "kind": "video"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::manager::job::{Job, JobStatus};

/// Body for `POST /media-info`.
#[derive(Debug, Deserialize)]
pub struct MediaInfoRequest {
    pub source_url: String,
}

/// Optional filter for `GET /jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsParams {
    pub status: Option<JobStatus>,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
    pub count: usize,
}

impl From<Vec<Job>> for JobListResponse {
    fn from(jobs: Vec<Job>) -> Self {
        let count = jobs.len();
        Self { jobs, count }
    }
}

/// Response for `POST /jobs/{id}/save`.
#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub job_id: String,
    pub library_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub active_downloads: usize,
    pub version: String,
}
