//! Download job data model.
//!
//! A [`Job`] tracks one user-requested download from submission to a terminal
//! state. Only `status`, `progress`, `error`, `artifact_path` and `updated_at`
//! change after creation; everything else is fixed at submission time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

pub type JobId = String;

/// What kind of media the job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaKind::Video => "video/mp4",
            MediaKind::Audio => "audio/mpeg",
        }
    }
}

/// Job lifecycle states. Transitions are governed by the manager:
/// `queued -> downloading -> completed | failed`, with `cancelled`
/// reachable from `queued` and `downloading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// The encoding the user picked from the resolved format catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingSelector {
    pub format_id: String,
    pub kind: MediaKind,
}

/// A download submission. Metadata (title, thumbnail) is resolved from the
/// source before any job is created.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub source_url: String,
    pub format_id: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub source_url: String,
    pub title: String,
    pub thumbnail: String,
    pub encoding: EncodingSelector,
    pub status: JobStatus,
    /// Fraction in `[0.0, 1.0]`; meaningful only while `downloading`
    /// (and forced to 1.0 on completion).
    pub progress: f64,
    /// Present iff `status == failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present iff `status == completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a fresh queued job. UUIDv7 ids are time-sortable, which keeps
    /// FIFO admission cheap even when created_at collides.
    pub fn new(request: &SubmitRequest, title: String, thumbnail: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            source_url: request.source_url.clone(),
            title,
            thumbnail,
            encoding: EncodingSelector {
                format_id: request.format_id.clone(),
                kind: request.kind,
            },
            status: JobStatus::Queued,
            progress: 0.0,
            error: None,
            artifact_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Filesystem-safe name for this job's artifact, derived from the title.
    pub fn file_name(&self) -> String {
        let mut stem: String = self
            .title
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        stem.truncate(50);
        if stem.is_empty() {
            stem.push_str("untitled");
        }
        format!(
            "{}_{}.{}",
            stem,
            self.created_at.timestamp_millis(),
            self.encoding.kind.extension()
        )
    }
}
