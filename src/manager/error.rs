use thiserror::Error;

use crate::manager::job::JobStatus;
use crate::resolver::ResolveError;

/// Failures surfaced to callers of the manager. Transfer and integrity
/// failures never appear here: those are captured internally and turn into
/// a terminal `failed` state plus an event.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolveError),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job {id} is already {status}")]
    NotCancellable { id: String, status: JobStatus },
}
