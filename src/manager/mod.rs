//! Download job manager: admission control plus the job state machine.
//!
//! One [`DownloadManager`] instance owns the registry, bounds concurrent
//! transfers to `max_concurrent`, drives every status transition, and
//! publishes lifecycle events. Transfers run as spawned tasks; each holds a
//! slot guard whose drop releases the concurrency slot unconditionally, so
//! `active <= max_concurrent` holds no matter how a transfer ends.
//!
//! Cancellation is a status request, not an abort: a cancelled job stops
//! being treated as active, but an in-flight transfer runs on and its late
//! terminal report is discarded by the transition guard.

pub mod error;
pub mod job;
pub mod registry;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::events::{EventBus, JobEvent};
use crate::transfer::{TransferError, TransferExecutor};

pub use error::ManagerError;
pub use job::{Job, JobStatus, SubmitRequest};
pub use registry::{JobRegistry, TransitionOutcome};

pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Releases one concurrency slot on drop. Every admission creates exactly
/// one guard, so increments and decrements always pair up.
struct SlotGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct DownloadManager {
    registry: JobRegistry,
    executor: Arc<dyn TransferExecutor>,
    events: EventBus,
    max_concurrent: usize,
    active: Arc<AtomicUsize>,
    accepting: AtomicBool,
}

impl DownloadManager {
    pub fn new(
        registry: JobRegistry,
        executor: Arc<dyn TransferExecutor>,
        events: EventBus,
        max_concurrent: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            executor,
            events,
            max_concurrent: max_concurrent.max(1),
            active: Arc::new(AtomicUsize::new(0)),
            accepting: AtomicBool::new(true),
        })
    }

    /// Startup recovery: requeue jobs left `downloading` by a dead process,
    /// then start admitting.
    pub async fn start(self: &Arc<Self>) {
        let reset = self.registry.reset_interrupted().await;
        if reset > 0 {
            info!(count = reset, "Requeued interrupted downloads");
        }
        self.admit().await;
    }

    /// Stop admitting new transfers. In-flight transfers run to completion.
    pub fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        info!("Download manager stopped admitting new transfers");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Accept a new download. Resolution happens here, synchronously from
    /// the caller's point of view; a resolution or validation failure
    /// rejects the whole submission with no job created and no event.
    pub async fn submit(self: &Arc<Self>, request: SubmitRequest) -> Result<Job, ManagerError> {
        let job = self.registry.create(request).await?;
        info!(job_id = %job.id, title = %job.title, "Job queued");
        self.events.emit(JobEvent::Added { job: job.clone() });
        self.admit().await;
        Ok(job)
    }

    pub async fn get(&self, id: &str) -> Result<Job, ManagerError> {
        self.registry
            .get(id)
            .await
            .ok_or_else(|| ManagerError::NotFound(id.to_string()))
    }

    /// All jobs, newest first.
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs = self.registry.list().await;
        jobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        jobs
    }

    pub async fn list_by_status(&self, status: JobStatus) -> Vec<Job> {
        let mut jobs = self.list().await;
        jobs.retain(|j| j.status == status);
        jobs
    }

    /// Mark a queued or downloading job cancelled. Does not interrupt an
    /// in-flight transfer; its eventual terminal report will be discarded.
    pub async fn cancel(&self, id: &str) -> Result<Job, ManagerError> {
        let outcome = self
            .registry
            .try_transition(
                id,
                &[JobStatus::Queued, JobStatus::Downloading],
                JobStatus::Cancelled,
                |_| {},
            )
            .await;

        match outcome {
            TransitionOutcome::Applied(job) => {
                info!(job_id = %job.id, "Job cancelled");
                self.events.emit(JobEvent::Updated { job: job.clone() });
                Ok(job)
            }
            TransitionOutcome::Refused(status) => Err(ManagerError::NotCancellable {
                id: id.to_string(),
                status,
            }),
            TransitionOutcome::NotFound => Err(ManagerError::NotFound(id.to_string())),
        }
    }

    /// Delete a job record in any state. A completed job's artifact file is
    /// deleted best-effort; failing to delete it never fails the removal.
    /// Returns whether a job existed, and is safe to call twice.
    pub async fn remove(&self, id: &str) -> bool {
        let Some(job) = self.registry.remove(id).await else {
            return false;
        };

        if let Some(path) = &job.artifact_path {
            if let Err(e) = tokio::fs::remove_file(path).await {
                debug!(job_id = %job.id, error = %e, "Artifact delete failed");
            }
        }

        info!(job_id = %job.id, "Job removed");
        self.events.emit(JobEvent::Removed { job });
        true
    }

    /// Admission control: start queued transfers until the concurrency limit
    /// is reached or the queue is empty. Re-invoked after every submission
    /// and after every terminal outcome, which keeps the pipeline flowing
    /// without a polling loop.
    pub async fn admit(self: &Arc<Self>) {
        if !self.accepting.load(Ordering::SeqCst) {
            return;
        }

        loop {
            // Reserve a slot first; the guard gives it back if nothing is queued.
            let reserved = self.active.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_concurrent).then_some(n + 1)
            });
            if reserved.is_err() {
                break;
            }
            let slot = SlotGuard {
                active: Arc::clone(&self.active),
            };

            let Some(job) = self.registry.claim_next_queued().await else {
                drop(slot);
                break;
            };

            debug!(job_id = %job.id, active = self.active_count(), "Admitted job");
            self.events.emit(JobEvent::Updated { job: job.clone() });
            self.spawn_transfer(job, slot);
        }
    }

    fn spawn_transfer(self: &Arc<Self>, job: Job, slot: SlotGuard) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let slot = slot;
            let (tx, mut rx) = mpsc::channel::<f64>(32);

            // Progress is applied by a single consumer, which preserves
            // per-job ordering; the terminal transition waits for it to
            // drain so the terminal event always comes last.
            let pump = {
                let manager = Arc::clone(&manager);
                let job_id = job.id.clone();
                tokio::spawn(async move {
                    while let Some(fraction) = rx.recv().await {
                        manager.record_progress(&job_id, fraction).await;
                    }
                })
            };

            let outcome = manager.executor.begin(&job, tx).await;
            let _ = pump.await;

            manager.finish_transfer(&job, outcome).await;

            drop(slot);
            manager.admit().await;
        });
    }

    async fn record_progress(&self, id: &str, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        let updated = self
            .registry
            .update(id, |job| {
                // only meaningful while downloading, and never regressing
                if job.status != JobStatus::Downloading || fraction < job.progress {
                    return false;
                }
                job.progress = fraction;
                true
            })
            .await;

        if let Some(job) = updated {
            self.events.emit(JobEvent::Progress {
                job_id: job.id.clone(),
                fraction: job.progress,
            });
        }
    }

    async fn finish_transfer(
        &self,
        job: &Job,
        outcome: Result<std::path::PathBuf, TransferError>,
    ) {
        match outcome {
            Ok(path) => match verify_artifact(&path).await {
                Ok(()) => self.complete_job(job, path).await,
                Err(reason) => {
                    // reported success but the output is unusable
                    discard_file(&path).await;
                    self.fail_job(&job.id, reason).await;
                }
            },
            Err(e) => self.fail_job(&job.id, e.to_string()).await,
        }
    }

    async fn complete_job(&self, job: &Job, path: std::path::PathBuf) {
        let outcome = self
            .registry
            .try_transition(&job.id, &[JobStatus::Downloading], JobStatus::Completed, |j| {
                j.progress = 1.0;
                j.artifact_path = Some(path.clone());
            })
            .await;

        match outcome {
            TransitionOutcome::Applied(job) => {
                info!(job_id = %job.id, artifact = %path.display(), "Job completed");
                self.events.emit(JobEvent::Completed { job });
            }
            TransitionOutcome::Refused(status) => {
                // cancelled (or otherwise moved on) while the transfer ran;
                // the record wins, the orphaned output goes away
                debug!(job_id = %job.id, %status, "Discarding late transfer success");
                discard_file(&path).await;
            }
            TransitionOutcome::NotFound => {
                debug!(job_id = %job.id, "Job removed mid-transfer, discarding output");
                discard_file(&path).await;
            }
        }
    }

    async fn fail_job(&self, id: &str, reason: String) {
        let outcome = self
            .registry
            .try_transition(id, &[JobStatus::Downloading], JobStatus::Failed, |j| {
                j.error = Some(reason.clone());
            })
            .await;

        match outcome {
            TransitionOutcome::Applied(job) => {
                warn!(job_id = %job.id, error = %reason, "Job failed");
                self.events.emit(JobEvent::Failed { job });
            }
            TransitionOutcome::Refused(status) => {
                debug!(job_id = id, %status, "Discarding late transfer failure");
            }
            TransitionOutcome::NotFound => {
                debug!(job_id = id, "Job removed mid-transfer, dropping failure");
            }
        }
    }
}

/// A transfer that claims success must have produced a non-empty file.
async fn verify_artifact(path: &std::path::Path) -> Result<(), String> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(format!("downloaded file is empty: {}", path.display())),
        Err(e) => Err(format!(
            "downloaded file is missing: {}: {e}",
            path.display()
        )),
    }
}

async fn discard_file(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!(path = %path.display(), error = %e, "Stray output cleanup failed");
    }
}
