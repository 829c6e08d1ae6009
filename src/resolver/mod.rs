//! Media resolution collaborator.
//!
//! Given a source URL, a resolver returns display metadata (title, thumbnail)
//! and the catalog of available encodings. Resolution happens exactly once,
//! at submission time; a resolution failure rejects the submission before any
//! job is created.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::humanize::ByteSize;
use crate::manager::job::MediaKind;

pub use http::HttpResolver;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid source URL: {0}")]
    InvalidSource(String),

    #[error("resolver request failed: {0}")]
    RequestFailed(String),

    #[error("source rejected: {0}")]
    Rejected(String),
}

/// One entry in the resolved format catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFormat {
    pub id: String,
    pub kind: MediaKind,
    pub quality_label: String,
    pub mime_type: String,
    /// Approximate content size when the source reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_hint: Option<ByteSize>,
}

/// Metadata resolved for a source URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    pub thumbnail: String,
    pub formats: Vec<MediaFormat>,
}

impl MediaInfo {
    /// Look up a format by kind and id; used to validate encoding selectors.
    pub fn find_format(&self, kind: MediaKind, format_id: &str) -> Option<&MediaFormat> {
        self.formats
            .iter()
            .find(|f| f.kind == kind && f.id == format_id)
    }
}

#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, source_url: &str) -> Result<MediaInfo, ResolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MediaInfo {
        MediaInfo {
            title: "t".into(),
            thumbnail: String::new(),
            formats: vec![
                MediaFormat {
                    id: "18".into(),
                    kind: MediaKind::Video,
                    quality_label: "360p".into(),
                    mime_type: "video/mp4".into(),
                    size_hint: Some(ByteSize(1024)),
                },
                MediaFormat {
                    id: "140".into(),
                    kind: MediaKind::Audio,
                    quality_label: "128kbps".into(),
                    mime_type: "audio/mp4".into(),
                    size_hint: None,
                },
            ],
        }
    }

    #[test]
    fn find_format_matches_kind_and_id() {
        let info = catalog();
        assert!(info.find_format(MediaKind::Video, "18").is_some());
        assert!(info.find_format(MediaKind::Audio, "140").is_some());
        // same id under the wrong kind is not a match
        assert!(info.find_format(MediaKind::Audio, "18").is_none());
        assert!(info.find_format(MediaKind::Video, "999").is_none());
    }
}
