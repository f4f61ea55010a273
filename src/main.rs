//! wordfeud-sync server entry point.
//!
//! Resolves credentials, wires the sync engine to its collaborators, starts
//! the incremental-run scheduler and serves the HTTP trigger API.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use wordfeud_sync::api;
use wordfeud_sync::app_state::AppState;
use wordfeud_sync::config::SyncConfig;
use wordfeud_sync::credentials::CredentialSource;
use wordfeud_sync::persistence::{
    CheckpointStore, InMemoryCheckpointStore, PostgresCheckpointStore,
};
use wordfeud_sync::scheduler;
use wordfeud_sync::service::{CleanupWorkflow, DatapointEmitter, Initializer, SyncService};
use wordfeud_sync::sink::{
    CdfClient, InMemoryTimeSeries, LogMonitor, PipelineMonitor, TimeSeriesBackend,
};
use wordfeud_sync::source::{CompletedMatchFetcher, HttpMatchSource, MatchSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = SyncConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting wordfeud-sync");

    // Resolve credentials once
    let credential_source = match &config.credentials_file {
        Some(path) => CredentialSource::LocalFile(path.clone()),
        None => CredentialSource::from_env(),
    };
    let credentials = credential_source
        .resolve()
        .with_context(|| format!("resolving credentials from {}", credential_source.kind()))?;
    let username: Arc<str> = Arc::from(credentials.username.as_str());
    tracing::info!(username = %username, source = credential_source.kind(), "credentials resolved");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()
        .context("building HTTP client")?;

    // Checkpoint store
    let store: Arc<dyn CheckpointStore> = if config.persistence_enabled {
        let postgres = PostgresCheckpointStore::connect(&config)
            .await
            .context("connecting to the checkpoint database")?;
        Arc::new(postgres)
    } else {
        tracing::warn!("persistence disabled, checkpoints are kept in memory only");
        Arc::new(InMemoryCheckpointStore::new())
    };

    // Time-series backend and run monitoring
    let (backend, monitor): (Arc<dyn TimeSeriesBackend>, Arc<dyn PipelineMonitor>) =
        match &config.cdf_token {
            Some(token) => {
                let cdf = Arc::new(CdfClient::new(
                    http.clone(),
                    &config.cdf_base_url,
                    &config.cdf_project,
                    token,
                ));
                (Arc::clone(&cdf) as Arc<dyn TimeSeriesBackend>, cdf as Arc<dyn PipelineMonitor>)
            }
            None => {
                tracing::warn!("CDF_TOKEN not set, datapoints go to an in-memory backend");
                (Arc::new(InMemoryTimeSeries::new()), Arc::new(LogMonitor))
            }
        };

    // Build service layer
    let source: Arc<dyn MatchSource> =
        Arc::new(HttpMatchSource::new(http, &config.game_api_url, credentials));
    let sync_service = Arc::new(SyncService::new(
        store,
        CompletedMatchFetcher::new(source, config.retry.clone()),
        DatapointEmitter::new(Arc::clone(&backend), config.retry.clone()),
        Arc::clone(&monitor),
        &config,
    ));
    let initializer = Arc::new(Initializer::new(
        Arc::clone(&backend),
        monitor,
        config.retry.clone(),
        &config.series_namespace,
        config.data_set_id,
    ));
    let cleanup = Arc::new(CleanupWorkflow::new(
        backend,
        config.retry.clone(),
        &config.series_namespace,
    ));

    // Start scheduler
    let (stop, shutdown) = watch::channel(false);
    let scheduler = config.scheduler_enabled.then(|| {
        scheduler::spawn(
            Arc::clone(&sync_service),
            Arc::clone(&username),
            config.sync_interval(),
            shutdown,
        )
    });

    // Build application state
    let app_state = AppState {
        username,
        sync_service,
        initializer,
        cleanup,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("serving HTTP")?;

    let _ = stop.send(true);
    if let Some(handle) = scheduler {
        let _ = handle.await;
    }

    Ok(())
}
