//! Artifact export: copy a completed job's output into the media library.
//!
//! Export is strictly a post-completion action. It never touches job state;
//! a failed export leaves the job `completed` with its artifact intact.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::manager::job::{Job, JobStatus};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("job is not completed or has no artifact")]
    NotExportable,

    #[error("artifact file is missing: {0}")]
    Missing(String),

    #[error("copy failed: {0}")]
    Io(#[from] std::io::Error),
}

pub struct ArtifactExporter {
    library_dir: PathBuf,
}

impl ArtifactExporter {
    pub fn new(library_dir: PathBuf) -> Self {
        Self { library_dir }
    }

    /// Copy the job's artifact into the library directory, returning the
    /// library path. The original artifact stays in place so the job record
    /// remains valid.
    pub async fn save_to_library(&self, job: &Job) -> Result<PathBuf, ExportError> {
        let source = match (&job.status, &job.artifact_path) {
            (JobStatus::Completed, Some(path)) => path,
            _ => return Err(ExportError::NotExportable),
        };

        match tokio::fs::metadata(source).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(ExportError::Missing(source.display().to_string())),
        }

        tokio::fs::create_dir_all(&self.library_dir).await?;
        let dest = self.library_dir.join(job.file_name());
        tokio::fs::copy(source, &dest).await?;

        info!(job_id = %job.id, dest = %dest.display(), "Saved artifact to library");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::job::{MediaKind, SubmitRequest};
    use tempfile::TempDir;

    fn completed_job(artifact: Option<PathBuf>) -> Job {
        let request = SubmitRequest {
            source_url: "https://media.example/watch?v=abc".to_string(),
            format_id: "18".to_string(),
            kind: MediaKind::Video,
        };
        let mut job = Job::new(&request, "clip".to_string(), String::new());
        job.status = JobStatus::Completed;
        job.artifact_path = artifact;
        job
    }

    #[tokio::test]
    async fn copies_artifact_into_library() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("clip.mp4");
        tokio::fs::write(&artifact, b"media bytes").await.unwrap();

        let exporter = ArtifactExporter::new(temp.path().join("library"));
        let job = completed_job(Some(artifact.clone()));

        let dest = exporter.save_to_library(&job).await.unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"media bytes");
        // original stays in place
        assert!(artifact.exists());
    }

    #[tokio::test]
    async fn refuses_jobs_without_artifact() {
        let temp = TempDir::new().unwrap();
        let exporter = ArtifactExporter::new(temp.path().join("library"));

        let mut job = completed_job(None);
        assert!(matches!(
            exporter.save_to_library(&job).await,
            Err(ExportError::NotExportable)
        ));

        job.status = JobStatus::Failed;
        job.artifact_path = Some(temp.path().join("x.mp4"));
        assert!(matches!(
            exporter.save_to_library(&job).await,
            Err(ExportError::NotExportable)
        ));
    }

    #[tokio::test]
    async fn reports_missing_artifact_file() {
        let temp = TempDir::new().unwrap();
        let exporter = ArtifactExporter::new(temp.path().join("library"));
        let job = completed_job(Some(temp.path().join("vanished.mp4")));

        assert!(matches!(
            exporter.save_to_library(&job).await,
            Err(ExportError::Missing(_))
        ));
    }
}
