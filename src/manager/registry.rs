//! Authoritative in-memory view of all jobs, write-through to the job store.
//!
//! Every mutation updates memory and persists before releasing the write
//! lock (a fjall insert is a memtable write, cheap enough to hold the lock
//! across), so the store never lags memory while the lock is free. A store
//! write failure is logged and the operation continues: memory stays
//! authoritative, and readers that consult the store merge by `updated_at`
//! so a stale store record can never revive an older job state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::manager::error::ManagerError;
use crate::manager::job::{Job, JobStatus, SubmitRequest};
use crate::resolver::MediaResolver;
use crate::store::JobStore;

/// Result of a guarded status transition.
#[derive(Debug)]
pub enum TransitionOutcome {
    /// The transition was applied; carries the updated snapshot.
    Applied(Job),
    /// The job exists but is not in an allowed source state.
    Refused(JobStatus),
    NotFound,
}

pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Job>>,
    store: JobStore,
    resolver: Arc<dyn MediaResolver>,
}

impl JobRegistry {
    /// Build a registry hydrated from the store. A hydration failure degrades
    /// to an empty job set rather than blocking startup.
    pub fn new(store: JobStore, resolver: Arc<dyn MediaResolver>) -> Self {
        let jobs = match store.list_all() {
            Ok(loaded) => {
                debug!(count = loaded.len(), "Hydrated jobs from store");
                loaded.into_iter().map(|j| (j.id.clone(), j)).collect()
            }
            Err(e) => {
                warn!(error = %e, "Failed to hydrate jobs from store, starting empty");
                HashMap::new()
            }
        };

        Self {
            jobs: RwLock::new(jobs),
            store,
            resolver,
        }
    }

    fn write_through(&self, job: &Job) {
        if let Err(e) = self.store.set(job) {
            warn!(job_id = %job.id, error = %e, "Store write failed, memory remains authoritative");
        }
    }

    /// Validate and resolve a submission, then create a queued job.
    /// Resolution runs before any insert, so a failure creates nothing.
    pub async fn create(&self, request: SubmitRequest) -> Result<Job, ManagerError> {
        let parsed = Url::parse(&request.source_url)
            .map_err(|e| ManagerError::Validation(format!("bad source URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ManagerError::Validation(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }
        if request.format_id.trim().is_empty() {
            return Err(ManagerError::Validation("empty format id".to_string()));
        }

        let info = self.resolver.resolve(&request.source_url).await?;
        if info.find_format(request.kind, &request.format_id).is_none() {
            return Err(ManagerError::Validation(format!(
                "format {} is not available as {:?}",
                request.format_id, request.kind
            )));
        }

        let job = Job::new(&request, info.title, info.thumbnail);
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id.clone(), job.clone());
        self.write_through(&job);
        drop(jobs);
        Ok(job)
    }

    /// Read a job, falling back to the store for records created by a prior
    /// process lifetime that were never hydrated; store hits are cached.
    pub async fn get(&self, id: &str) -> Option<Job> {
        if let Some(job) = self.jobs.read().await.get(id) {
            return Some(job.clone());
        }

        match self.store.get(id) {
            Ok(Some(job)) => {
                self.jobs.write().await.insert(job.id.clone(), job.clone());
                Some(job)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(job_id = id, error = %e, "Store lookup failed");
                None
            }
        }
    }

    /// Snapshot of all jobs, refreshed from the store first so out-of-band
    /// store changes become visible. The refresh merges by `updated_at`: a
    /// store record only wins when it is strictly newer, so it can never
    /// revert a job whose latest state lives in memory (for instance after
    /// a failed write-through). Order is unspecified; callers sort.
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs = self.jobs.write().await;
        match self.store.list_all() {
            Ok(loaded) => {
                for job in loaded {
                    match jobs.get(&job.id) {
                        Some(current) if current.updated_at >= job.updated_at => {}
                        _ => {
                            jobs.insert(job.id.clone(), job);
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Store refresh failed, serving in-memory snapshot");
            }
        }
        jobs.values().cloned().collect()
    }

    /// Apply a mutation if `mutate` reports it applies; stamps `updated_at`
    /// and persists. Returns the updated snapshot, or None when the job is
    /// missing or the mutation did not apply.
    pub async fn update<F>(&self, id: &str, mutate: F) -> Option<Job>
    where
        F: FnOnce(&mut Job) -> bool,
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id)?;
        if !mutate(job) {
            return None;
        }
        job.touch();
        let snapshot = job.clone();
        self.write_through(&snapshot);
        Some(snapshot)
    }

    /// Move a job to `to` only from one of the `allowed` states. This is the
    /// single gate every status change goes through, so stale terminal
    /// reports (a transfer finishing after a cancel) cannot clobber state.
    pub async fn try_transition<F>(
        &self,
        id: &str,
        allowed: &[JobStatus],
        to: JobStatus,
        apply: F,
    ) -> TransitionOutcome
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(id) else {
            return TransitionOutcome::NotFound;
        };
        if !allowed.contains(&job.status) {
            return TransitionOutcome::Refused(job.status);
        }
        job.status = to;
        apply(job);
        job.touch();
        let snapshot = job.clone();
        self.write_through(&snapshot);
        TransitionOutcome::Applied(snapshot)
    }

    /// Claim the oldest queued job for download, if any. FIFO by creation
    /// time, id as tie-break.
    pub async fn claim_next_queued(&self) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let next_id = jobs
            .values()
            .filter(|j| j.status == JobStatus::Queued)
            .min_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|j| j.id.clone())?;

        let job = jobs.get_mut(&next_id)?;
        job.status = JobStatus::Downloading;
        job.touch();
        let snapshot = job.clone();
        self.write_through(&snapshot);
        Some(snapshot)
    }

    /// Requeue jobs persisted as `downloading`: that status only ever
    /// reflects a live in-process transfer, so after a restart it means the
    /// prior process died mid-transfer. Returns how many were reset.
    pub async fn reset_interrupted(&self) -> usize {
        let mut jobs = self.jobs.write().await;
        let mut reset = 0;
        for job in jobs.values_mut() {
            if job.status == JobStatus::Downloading {
                job.status = JobStatus::Queued;
                job.progress = 0.0;
                job.touch();
                let snapshot = job.clone();
                self.write_through(&snapshot);
                reset += 1;
            }
        }
        reset
    }

    /// Remove a job from memory and store. The store delete happens under
    /// the write lock so a concurrent list refresh cannot resurrect the
    /// record in between. Returns the removed record.
    pub async fn remove(&self, id: &str) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.remove(id)?;
        if let Err(e) = self.store.delete(id) {
            warn!(job_id = id, error = %e, "Store delete failed");
        }
        Some(job)
    }
}
