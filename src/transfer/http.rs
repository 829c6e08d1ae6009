//! Streaming HTTP transfer against the companion resolver service.
//!
//! Two-step flow, matching the service contract: `POST /api/download` with
//! the source URL and chosen encoding returns a relative `downloadUrl`; the
//! bytes are then streamed from that URL into a temp file under the download
//! directory, with progress computed from the reported content length.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::manager::job::Job;

use super::{ProgressSender, TransferError, TransferExecutor};

#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub endpoint: Url,
    pub download_dir: PathBuf,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

pub struct HttpTransfer {
    client: Client,
    endpoint: Url,
    download_dir: PathBuf,
}

impl HttpTransfer {
    pub fn new(config: TransferConfig) -> Result<Self, TransferError> {
        std::fs::create_dir_all(&config.download_dir)?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TransferError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
            download_dir: config.download_dir,
        })
    }

    /// Ask the service to prepare the media and hand back its download URL.
    async fn request_download_url(&self, job: &Job) -> Result<Url, TransferError> {
        let request_url = self
            .endpoint
            .join("api/download")
            .map_err(|e| TransferError::RequestFailed(e.to_string()))?;

        let response = self
            .client
            .post(request_url)
            .json(&json!({
                "mediaUrl": job.source_url,
                "itag": job.encoding.format_id,
                "mediaType": job.encoding.kind,
            }))
            .send()
            .await
            .map_err(|e| TransferError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return Err(TransferError::Rejected(detail));
        }

        let prepared: PreparedDownload = response
            .json()
            .await
            .map_err(|e| TransferError::RequestFailed(format!("bad download payload: {e}")))?;

        if prepared.download_url.is_empty() {
            return Err(TransferError::Rejected(
                "service returned no download URL".to_string(),
            ));
        }

        // downloadUrl is relative to the service endpoint
        self.endpoint
            .join(&prepared.download_url)
            .map_err(|e| TransferError::RequestFailed(e.to_string()))
    }

    async fn stream_to_file(
        &self,
        url: Url,
        dest: &Path,
        progress: &ProgressSender,
    ) -> Result<u64, TransferError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransferError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::RequestFailed(format!(
                "HTTP {} while fetching media",
                status.as_u16()
            )));
        }

        let total = response.content_length().unwrap_or(0);
        let mut file = File::create(dest).await?;
        let mut written: u64 = 0;
        let mut response = response;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TransferError::RequestFailed(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            if total > 0 {
                let _ = progress.send(written as f64 / total as f64).await;
            }
        }

        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl TransferExecutor for HttpTransfer {
    async fn begin(&self, job: &Job, progress: ProgressSender) -> Result<PathBuf, TransferError> {
        let dest = self.download_dir.join(job.file_name());
        debug!(job_id = %job.id, dest = %dest.display(), "Starting transfer");

        let download_url = self.request_download_url(job).await?;
        let written = self.stream_to_file(download_url, &dest, &progress).await?;

        info!(job_id = %job.id, bytes = written, "Transfer finished");
        Ok(dest)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreparedDownload {
    #[serde(default)]
    download_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepared_download_parses_service_payload() {
        let p: PreparedDownload = serde_json::from_str(
            r#"{"downloadUrl": "/api/files/abc.mp4", "mimeType": "video/mp4", "contentLength": "123"}"#,
        )
        .unwrap();
        assert_eq!(p.download_url, "/api/files/abc.mp4");

        let empty: PreparedDownload = serde_json::from_str("{}").unwrap();
        assert!(empty.download_url.is_empty());
    }
}
