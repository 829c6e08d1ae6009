use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use crate::manager::job::Job;

use super::error::Result;
use super::keys::{decode_job_key, encode_job_key};

/// Fjall-backed persistent storage for job records.
#[derive(Clone)]
pub struct JobStore {
    keyspace: Keyspace,
    jobs: PartitionHandle,
}

impl JobStore {
    /// Open or create a job store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening job store");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let jobs = keyspace.open_partition("jobs", PartitionCreateOptions::default())?;

        Ok(Self { keyspace, jobs })
    }

    /// Insert or overwrite a job record.
    pub fn set(&self, job: &Job) -> Result<()> {
        let key = encode_job_key(&job.id);
        let value = serde_json::to_vec(job)?;
        self.jobs.insert(key, value)?;
        debug!(job_id = %job.id, status = %job.status, "Persisted job");
        Ok(())
    }

    /// Fetch a job record by id.
    pub fn get(&self, job_id: &str) -> Result<Option<Job>> {
        let key = encode_job_key(job_id);
        match self.jobs.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Delete a job record. Returns whether a record existed.
    pub fn delete(&self, job_id: &str) -> Result<bool> {
        let key = encode_job_key(job_id);
        let existed = self.jobs.contains_key(&key)?;
        if existed {
            self.jobs.remove(key)?;
            debug!(job_id, "Deleted job record");
        }
        Ok(existed)
    }

    /// Load every job record. Records that fail to decode are skipped with a
    /// warning rather than poisoning the whole load.
    pub fn list_all(&self) -> Result<Vec<Job>> {
        let mut out = Vec::new();
        for item in self.jobs.iter() {
            let (key, value) = item?;
            match serde_json::from_slice::<Job>(&value) {
                Ok(job) => out.push(job),
                Err(e) => {
                    let job_id = decode_job_key(&key)
                        .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());
                    tracing::warn!(%job_id, error = %e, "Skipping undecodable job record");
                }
            }
        }
        Ok(out)
    }

    /// Flush pending writes to disk.
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::job::{JobStatus, MediaKind, SubmitRequest};
    use tempfile::TempDir;

    fn create_test_store() -> (JobStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JobStore::open(temp_dir.path().join("jobs")).unwrap();
        (store, temp_dir)
    }

    fn create_test_job(title: &str) -> Job {
        let request = SubmitRequest {
            source_url: "https://media.example/watch?v=abc".to_string(),
            format_id: "140".to_string(),
            kind: MediaKind::Audio,
        };
        Job::new(&request, title.to_string(), String::new())
    }

    #[test]
    fn set_and_get_round_trip() {
        let (store, _temp) = create_test_store();
        let job = create_test_job("first");

        store.set(&job).unwrap();
        let loaded = store.get(&job.id).unwrap().unwrap();
        assert_eq!(loaded.id, job.id);
        assert_eq!(loaded.title, "first");
        assert_eq!(loaded.status, JobStatus::Queued);
    }

    #[test]
    fn get_missing_returns_none() {
        let (store, _temp) = create_test_store();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn delete_reports_existence() {
        let (store, _temp) = create_test_store();
        let job = create_test_job("gone");
        store.set(&job).unwrap();

        assert!(store.delete(&job.id).unwrap());
        assert!(!store.delete(&job.id).unwrap());
        assert!(store.get(&job.id).unwrap().is_none());
    }

    #[test]
    fn list_all_returns_every_record() {
        let (store, _temp) = create_test_store();
        for i in 0..3 {
            store.set(&create_test_job(&format!("job {i}"))).unwrap();
        }
        assert_eq!(store.list_all().unwrap().len(), 3);
    }

    #[test]
    fn list_all_skips_undecodable_records() {
        let (store, _temp) = create_test_store();
        store.set(&create_test_job("good")).unwrap();
        store
            .jobs
            .insert(encode_job_key("corrupt"), b"not json")
            .unwrap();

        let jobs = store.list_all().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "good");
    }

    #[test]
    fn records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jobs");
        let job = create_test_job("durable");

        {
            let store = JobStore::open(&path).unwrap();
            store.set(&job).unwrap();
            store.persist().unwrap();
        }

        let store = JobStore::open(&path).unwrap();
        let loaded = store.get(&job.id).unwrap().unwrap();
        assert_eq!(loaded.title, "durable");
    }
}
