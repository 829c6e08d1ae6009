//! HTTP resolver talking to the companion resolver service.
//!
//! Wire contract: `POST {endpoint}/api/media-info` with `{"mediaUrl": ...}`
//! returns `{title, thumbnail, formats: {video: [...], audio: [...]}}`;
//! errors come back as `{error, details}` with a non-2xx status.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::humanize::ByteSize;
use crate::manager::job::MediaKind;

use super::{MediaFormat, MediaInfo, MediaResolver, ResolveError};

pub struct HttpResolver {
    client: Client,
    endpoint: Url,
}

impl HttpResolver {
    pub fn new(endpoint: Url, timeout: Duration, user_agent: &str) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ResolveError::RequestFailed(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    fn media_info_url(&self) -> Result<Url, ResolveError> {
        self.endpoint
            .join("api/media-info")
            .map_err(|e| ResolveError::RequestFailed(e.to_string()))
    }
}

#[async_trait]
impl MediaResolver for HttpResolver {
    async fn resolve(&self, source_url: &str) -> Result<MediaInfo, ResolveError> {
        debug!(source_url, "Resolving media info");

        let response = self
            .client
            .post(self.media_info_url()?)
            .json(&json!({ "mediaUrl": source_url }))
            .send()
            .await
            .map_err(|e| ResolveError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Surface the service's own error detail verbatim when present
            let detail = match response.json::<WireError>().await {
                Ok(err) if !err.details.is_empty() => err.details,
                Ok(err) => err.error,
                Err(_) => format!("HTTP {}", status.as_u16()),
            };
            return if status.is_client_error() {
                Err(ResolveError::Rejected(detail))
            } else {
                Err(ResolveError::RequestFailed(detail))
            };
        }

        let wire: WireInfo = response
            .json()
            .await
            .map_err(|e| ResolveError::RequestFailed(format!("bad resolver payload: {e}")))?;

        Ok(wire.into())
    }
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    details: String,
}

#[derive(Debug, Deserialize)]
struct WireInfo {
    title: String,
    #[serde(default)]
    thumbnail: String,
    #[serde(default)]
    formats: WireFormats,
}

#[derive(Debug, Default, Deserialize)]
struct WireFormats {
    #[serde(default)]
    video: Vec<WireFormat>,
    #[serde(default)]
    audio: Vec<WireFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFormat {
    #[serde(deserialize_with = "string_or_number")]
    itag: String,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default)]
    quality_label: Option<String>,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    content_length: Option<ByteSize>,
}

impl WireFormat {
    fn into_format(self, kind: MediaKind) -> MediaFormat {
        MediaFormat {
            id: self.itag,
            kind,
            quality_label: self
                .quality_label
                .or(self.quality)
                .unwrap_or_else(|| "unknown".to_string()),
            mime_type: self.mime_type,
            size_hint: self.content_length.filter(|s| s.as_u64() > 0),
        }
    }
}

impl From<WireInfo> for MediaInfo {
    fn from(wire: WireInfo) -> Self {
        let mut formats = Vec::with_capacity(wire.formats.video.len() + wire.formats.audio.len());
        formats.extend(
            wire.formats
                .video
                .into_iter()
                .map(|f| f.into_format(MediaKind::Video)),
        );
        formats.extend(
            wire.formats
                .audio
                .into_iter()
                .map(|f| f.into_format(MediaKind::Audio)),
        );
        MediaInfo {
            title: wire.title,
            thumbnail: wire.thumbnail,
            formats,
        }
    }
}

/// The service reports itags as numbers; accept both numbers and strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Num(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_wire_payload_into_catalog() {
        let payload = serde_json::json!({
            "title": "Some Clip",
            "thumbnail": "https://img.example/1.jpg",
            "duration": "213",
            "formats": {
                "video": [
                    {"itag": 18, "quality": "360p", "qualityLabel": "360p",
                     "mimeType": "video/mp4", "contentLength": "1048576",
                     "hasAudio": true, "hasVideo": true, "container": "mp4"}
                ],
                "audio": [
                    {"itag": "140", "mimeType": "audio/mp4", "contentLength": "0",
                     "hasAudio": true, "hasVideo": false, "container": "m4a"}
                ]
            }
        });

        let wire: WireInfo = serde_json::from_value(payload).unwrap();
        let info = MediaInfo::from(wire);

        assert_eq!(info.title, "Some Clip");
        assert_eq!(info.formats.len(), 2);

        let video = info.find_format(MediaKind::Video, "18").unwrap();
        assert_eq!(video.quality_label, "360p");
        assert_eq!(video.size_hint.unwrap().as_u64(), 1024 * 1024);

        let audio = info.find_format(MediaKind::Audio, "140").unwrap();
        assert_eq!(audio.quality_label, "unknown");
        // zero content length means the source did not report a size
        assert!(audio.size_hint.is_none());
    }

    #[test]
    fn tolerates_missing_format_sections() {
        let wire: WireInfo =
            serde_json::from_value(serde_json::json!({"title": "bare"})).unwrap();
        let info = MediaInfo::from(wire);
        assert!(info.formats.is_empty());
        assert!(info.thumbnail.is_empty());
    }
}
