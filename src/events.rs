//! In-process lifecycle event fan-out.
//!
//! Every mutation of a job publishes a [`JobEvent`] carrying the job snapshot
//! at the time of the event. Delivery uses a tokio broadcast channel: any
//! number of subscribers, best-effort, no cross-restart guarantees. A slow or
//! panicking subscriber only affects its own receiver, never the emitter or
//! the other subscribers; a lagged receiver just observes a `Lagged` gap and
//! should call `list()` to resynchronize.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::manager::job::{Job, JobId};

pub const DEFAULT_CAPACITY: usize = 256;

/// One lifecycle notification. Serialized with dashed topic names
/// (`job-added`, `job-progress`, ...) so API consumers see stable tags.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum JobEvent {
    #[serde(rename = "job-added")]
    Added { job: Job },
    #[serde(rename = "job-updated")]
    Updated { job: Job },
    #[serde(rename = "job-progress")]
    Progress { job_id: JobId, fraction: f64 },
    #[serde(rename = "job-completed")]
    Completed { job: Job },
    #[serde(rename = "job-error")]
    Failed { job: Job },
    #[serde(rename = "job-removed")]
    Removed { job: Job },
}

impl JobEvent {
    /// Topic name, matching the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Added { .. } => "job-added",
            JobEvent::Updated { .. } => "job-updated",
            JobEvent::Progress { .. } => "job-progress",
            JobEvent::Completed { .. } => "job-completed",
            JobEvent::Failed { .. } => "job-error",
            JobEvent::Removed { .. } => "job-removed",
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::Added { job }
            | JobEvent::Updated { job }
            | JobEvent::Completed { job }
            | JobEvent::Failed { job }
            | JobEvent::Removed { job } => &job.id,
            JobEvent::Progress { job_id, .. } => job_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JobEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers. Emitting with no
    /// subscribers is not an error.
    pub fn emit(&self, event: JobEvent) {
        tracing::trace!(topic = event.name(), job_id = event.job_id(), "Emitting event");
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
