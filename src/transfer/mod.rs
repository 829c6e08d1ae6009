//! Byte-transfer collaborator.
//!
//! The manager drives transfers through a narrow contract: begin one
//! transfer, observe progress fractions, receive exactly one terminal
//! outcome. Fractions must be non-decreasing and within `[0, 1]`; the
//! manager additionally clamps and drops regressions, so a sloppy executor
//! cannot violate the progress ordering consumers observe.

pub mod http;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::manager::job::Job;

pub use http::HttpTransfer;

/// Channel the executor reports progress fractions on. The receiving side
/// lives in the manager; a closed receiver just means nobody is listening
/// anymore and sends may be discarded.
pub type ProgressSender = mpsc::Sender<f64>;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transfer request failed: {0}")]
    RequestFailed(String),

    #[error("source rejected the download: {0}")]
    Rejected(String),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Run one job's transfer to completion. On success returns the path of
    /// the fully-written output file.
    async fn begin(&self, job: &Job, progress: ProgressSender) -> Result<PathBuf, TransferError>;
}
