use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_max_request_bytes() -> ByteSize {
    ByteSize(1024 * 1024) // 1 MB
}

/// Job store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/jobs")
}

/// Resolver service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Base URL of the companion resolver service
    #[serde(default = "default_resolver_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_resolve_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: default_resolver_endpoint(),
            timeout_secs: default_resolve_timeout_secs(),
        }
    }
}

fn default_resolver_endpoint() -> String {
    "http://127.0.0.1:3000/".to_string()
}

fn default_resolve_timeout_secs() -> u64 {
    30
}

/// Transfer and admission configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    /// Upper bound on simultaneous transfers
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Where in-progress and completed artifacts are written
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Where `save` exports completed artifacts to
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Whole-transfer deadline; media files are large, keep this generous
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            download_dir: default_download_dir(),
            library_dir: default_library_dir(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    crate::manager::DEFAULT_MAX_CONCURRENT
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("data/downloads")
}

fn default_library_dir() -> PathBuf {
    PathBuf::from("data/library")
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    600
}

fn default_user_agent() -> String {
    format!("grabbox/{}", env!("CARGO_PKG_VERSION"))
}

/// Event bus configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Broadcast channel capacity; slow subscribers past this lag get gaps
    #[serde(default = "default_events_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_events_capacity(),
        }
    }
}

fn default_events_capacity() -> usize {
    256
}
