//! Main entry point for the media generation orchestrator

use std::sync::Arc;

use mediagen_orchestrator::{
    api,
    artifact::ArtifactDownloader,
    config::Settings,
    ledger::Ledger,
    models::catalog,
    notify::LogNotifier,
    orchestrator::GenerationService,
    provider::{kie::KieProvider, poyo::PoyoProvider, ProviderRegistry},
    storage::{MemoryStore, Store},
    supervisor::TaskSupervisor,
    AppState,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .init();

    info!("Starting media generation orchestrator");

    // Load configuration
    let settings = Settings::load()?;
    settings.validate()?;
    info!(
        "Loaded configuration: server={}:{}",
        settings.server.host, settings.server.port
    );

    // Persistence and ledger
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    catalog::seed_default_models(&store).await?;
    let ledger = Ledger::new(store.clone());

    // Provider registry from configuration
    let providers = Arc::new(ProviderRegistry::new());
    if settings.providers.kie.enabled {
        providers.register(Arc::new(KieProvider::new(&settings.providers.kie)?));
    }
    if settings.providers.poyo.enabled {
        providers.register(Arc::new(PoyoProvider::new(&settings.providers.poyo)?));
    }
    info!(providers = ?providers.names(), "Provider registry ready");

    let downloader = Arc::new(ArtifactDownloader::new(
        settings.storage.base_path.clone(),
        settings.storage.download_timeout_ms,
    )?);

    let supervisor = Arc::new(TaskSupervisor::new());

    let generations = Arc::new(GenerationService::new(
        store.clone(),
        ledger.clone(),
        providers,
        supervisor,
        downloader,
        Arc::new(LogNotifier),
        settings.polling.clone(),
    ));

    // Create application state
    let app_state = Arc::new(AppState {
        settings: settings.clone(),
        store,
        ledger,
        generations,
    });

    // Build the router
    let app = api::routes::create_router(app_state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
