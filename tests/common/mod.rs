//! Shared test doubles: a scripted resolver and a manually-driven transfer
//! executor, so tests control exactly when a transfer starts, reports
//! progress, and reaches its terminal outcome.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};

use grabbox::events::EventBus;
use grabbox::manager::job::{Job, MediaKind, SubmitRequest};
use grabbox::manager::{DownloadManager, JobRegistry};
use grabbox::resolver::{MediaFormat, MediaInfo, MediaResolver, ResolveError};
use grabbox::store::JobStore;
use grabbox::transfer::{ProgressSender, TransferError, TransferExecutor};

/// Resolver returning a fixed two-entry catalog, or failing outright.
pub struct ScriptResolver {
    pub fail: bool,
}

#[async_trait]
impl MediaResolver for ScriptResolver {
    async fn resolve(&self, source_url: &str) -> Result<MediaInfo, ResolveError> {
        if self.fail {
            return Err(ResolveError::Rejected(format!(
                "no media at {source_url}"
            )));
        }
        Ok(MediaInfo {
            title: "Test Clip".to_string(),
            thumbnail: "https://img.example/t.jpg".to_string(),
            formats: vec![
                MediaFormat {
                    id: "18".to_string(),
                    kind: MediaKind::Video,
                    quality_label: "360p".to_string(),
                    mime_type: "video/mp4".to_string(),
                    size_hint: None,
                },
                MediaFormat {
                    id: "140".to_string(),
                    kind: MediaKind::Audio,
                    quality_label: "128kbps".to_string(),
                    mime_type: "audio/mp4".to_string(),
                    size_hint: None,
                },
            ],
        })
    }
}

/// A transfer the executor has begun; the test decides its fate.
pub struct StartedTransfer {
    pub job_id: String,
    progress: ProgressSender,
    done: oneshot::Sender<Result<PathBuf, TransferError>>,
}

impl StartedTransfer {
    pub async fn send_progress(&self, fraction: f64) {
        let _ = self.progress.send(fraction).await;
    }

    /// Write `contents` to a file and report success with its path.
    /// Dropping the progress sender here lets the manager's pump drain.
    pub async fn succeed_with_file(self, dir: &Path, contents: &[u8]) -> PathBuf {
        let StartedTransfer { job_id, progress, done } = self;
        drop(progress);
        let path = dir.join(format!("{job_id}.out"));
        tokio::fs::write(&path, contents).await.unwrap();
        let _ = done.send(Ok(path.clone()));
        path
    }

    /// Report success pointing at a path that was never written.
    pub fn succeed_with_missing_file(self, dir: &Path) {
        let StartedTransfer { job_id, done, .. } = self;
        let _ = done.send(Ok(dir.join(format!("{job_id}.gone"))));
    }

    pub fn fail(self, message: &str) {
        let StartedTransfer { done, .. } = self;
        let _ = done.send(Err(TransferError::RequestFailed(message.to_string())));
    }
}

/// Executor that parks every transfer until the test resolves it.
pub struct ManualTransfer {
    started: mpsc::UnboundedSender<StartedTransfer>,
}

impl ManualTransfer {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<StartedTransfer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { started: tx }), rx)
    }
}

#[async_trait]
impl TransferExecutor for ManualTransfer {
    async fn begin(&self, job: &Job, progress: ProgressSender) -> Result<PathBuf, TransferError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.started
            .send(StartedTransfer {
                job_id: job.id.clone(),
                progress,
                done: done_tx,
            })
            .expect("test dropped the started-transfer receiver");
        done_rx.await.expect("test dropped a StartedTransfer without resolving it")
    }
}

pub fn video_request(source_url: &str) -> SubmitRequest {
    SubmitRequest {
        source_url: source_url.to_string(),
        format_id: "18".to_string(),
        kind: MediaKind::Video,
    }
}

/// Manager wired against the scripted resolver and manual executor.
pub fn build_manager(
    temp: &TempDir,
    max_concurrent: usize,
    fail_resolution: bool,
) -> (Arc<DownloadManager>, mpsc::UnboundedReceiver<StartedTransfer>) {
    let store = JobStore::open(temp.path().join("jobs")).unwrap();
    let registry = JobRegistry::new(store, Arc::new(ScriptResolver { fail: fail_resolution }));
    let (executor, started_rx) = ManualTransfer::new();
    let manager = DownloadManager::new(registry, executor, EventBus::default(), max_concurrent);
    (manager, started_rx)
}

pub async fn recv_started(
    rx: &mut mpsc::UnboundedReceiver<StartedTransfer>,
) -> StartedTransfer {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a transfer to start")
        .expect("executor channel closed")
}

pub async fn assert_no_start(rx: &mut mpsc::UnboundedReceiver<StartedTransfer>) {
    let waited = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(waited.is_err(), "unexpected transfer was admitted");
}

/// Poll the manager until the job reaches `predicate` or the deadline hits.
pub async fn wait_for_job<F>(manager: &Arc<DownloadManager>, id: &str, predicate: F) -> Job
where
    F: Fn(&Job) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if let Ok(job) = manager.get(id).await {
            if predicate(&job) {
                return job;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("job {id} did not reach the expected state in time");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
