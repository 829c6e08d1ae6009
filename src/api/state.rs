use std::sync::Arc;

use crate::config::Config;
use crate::export::ArtifactExporter;
use crate::manager::DownloadManager;
use crate::resolver::MediaResolver;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub manager: Arc<DownloadManager>,
    pub resolver: Arc<dyn MediaResolver>,
    pub exporter: Arc<ArtifactExporter>,
}

impl AppState {
    pub fn new(
        config: Config,
        manager: Arc<DownloadManager>,
        resolver: Arc<dyn MediaResolver>,
        exporter: ArtifactExporter,
    ) -> Self {
        Self {
            config: Arc::new(config),
            manager,
            resolver,
            exporter: Arc::new(exporter),
        }
    }
}
