use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{info, warn};
use url::Url;

use grabbox::api::{AppState, router};
use grabbox::config::Config;
use grabbox::events::EventBus;
use grabbox::export::ArtifactExporter;
use grabbox::manager::{DownloadManager, JobRegistry};
use grabbox::resolver::{HttpResolver, MediaResolver};
use grabbox::store::JobStore;
use grabbox::transfer::{HttpTransfer, TransferExecutor, http::TransferConfig};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(address_override: Option<SocketAddr>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = Config::load().map_err(|e| format!("failed to load config: {e}"))?;
    let address = address_override.unwrap_or(config.server.bind_addr);

    // endpoint already validated by config validation
    let endpoint = Url::parse(&config.resolver.endpoint)?;

    info!(path = %config.store.path.display(), "Opening job store");
    let store =
        JobStore::open(&config.store.path).map_err(|e| format!("failed to open job store: {e}"))?;

    let resolver: Arc<dyn MediaResolver> = Arc::new(HttpResolver::new(
        endpoint.clone(),
        config.resolve_timeout(),
        &config.downloads.user_agent,
    )?);

    let executor: Arc<dyn TransferExecutor> = Arc::new(HttpTransfer::new(TransferConfig {
        endpoint,
        download_dir: config.downloads.download_dir.clone(),
        connect_timeout: Duration::from_secs(config.downloads.connect_timeout_secs),
        request_timeout: Duration::from_secs(config.downloads.request_timeout_secs),
        user_agent: config.downloads.user_agent.clone(),
    })?);

    let registry = JobRegistry::new(store.clone(), Arc::clone(&resolver));
    let events = EventBus::new(config.events.capacity);
    let manager = DownloadManager::new(
        registry,
        executor,
        events,
        config.downloads.max_concurrent,
    );

    // recover jobs interrupted by a previous process and start admitting
    manager.start().await;

    let exporter = ArtifactExporter::new(config.downloads.library_dir.clone());
    let state = AppState::new(config, Arc::clone(&manager), resolver, exporter);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "grabbox API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // stop admitting, then make sure everything written so far is durable
    manager.shutdown();
    if let Err(e) = store.persist() {
        warn!(error = %e, "Final store flush failed");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
