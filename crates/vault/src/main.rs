//! Entry point for the vault sync gateway: loads configuration, wires every
//! collaborator together behind a shared `AppState`, starts the sync engine
//! and the HTTP surface, and waits on Ctrl-C/SIGTERM for a graceful shutdown.

mod config;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use config::VaultConfig;
use vault_catalog::Catalog;
use vault_gateway::auth_limiter::AuthLimiter;
use vault_gateway::health::HealthAuditor;
use vault_gateway::AppState;
use vault_store::{build_object_store, CircuitBreaker, ObjectStoreClient};
use vault_sync::{PathCoordinator, SyncContext, SyncEngine};
use vault_telemetry::MetricsRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = VaultConfig::from_env();
    if let Err(err) = vault_telemetry::init_logging(&config.log_level, config.json_logs) {
        eprintln!("failed to initialize logging: {err}");
        std::process::exit(1);
    }

    if let Err(err) = config.validate() {
        error!(error = %err, "invalid configuration");
        std::process::exit(1);
    }

    info!(
        http_addr = %config.http.addr(),
        collections_root = %config.collections_root.display(),
        "starting vault sync gateway"
    );

    if let Err(err) = run(config).await {
        error!(error = %err, "vault exited with an error");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(config: VaultConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.collections_root).await?;

    let catalog = Arc::new(
        Catalog::connect(&config.catalog.database_url, config.catalog.max_connections).await?,
    );

    let store = {
        let backend = build_object_store(&config.object_store.location)?;
        let breaker = CircuitBreaker::new(config.circuit_breaker.clone());
        Arc::new(ObjectStoreClient::new(backend, breaker))
    };

    let coordinator = PathCoordinator::new(config.coordinator.clone());
    let metrics = Arc::new(MetricsRegistry::new());
    let auth_limiter = Arc::new(AuthLimiter::new(config.auth_limiter.clone()));

    let sync_context = Arc::new(SyncContext {
        collections_root: config.collections_root.clone(),
        catalog: catalog.clone(),
        store: store.clone(),
        coordinator: coordinator.clone(),
        metrics: metrics.clone(),
    });

    let engine = SyncEngine::new(sync_context, config.watcher.clone());
    let shutdown = CancellationToken::new();

    engine.start(shutdown.clone()).await?;

    let health = Arc::new(HealthAuditor::new(
        config.collections_root.clone(),
        catalog.clone(),
        store.clone(),
        engine.watcher.clone(),
        coordinator.clone(),
        metrics.clone(),
        config.health.clone(),
    ));

    let consistency_handle = health.clone().spawn_consistency_loop(shutdown.clone());
    let cleanup_handle = tokio::spawn(vault_gateway::auth_limiter::cleanup_task(
        auth_limiter.clone(),
        std::time::Duration::from_secs(60),
        shutdown.clone(),
    ));

    let state = AppState {
        collections_root: config.collections_root.clone(),
        catalog,
        store,
        coordinator,
        watcher: engine.watcher.clone(),
        auth_limiter,
        health,
        metrics,
    };

    let http_addr = config.http.addr();
    let server_shutdown = shutdown.clone();
    let server_handle =
        tokio::spawn(async move { vault_gateway::serve(http_addr, state, server_shutdown).await });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping gateway");
    shutdown.cancel();

    if let Err(err) = server_handle.await? {
        error!(error = %err, "gateway server exited with an error");
    }
    consistency_handle.await.ok();
    cleanup_handle.await.ok();

    info!("vault sync gateway stopped");
    Ok(())
}

/// Waits for Ctrl-C or, on Unix, SIGTERM — whichever arrives first. Mirrors
/// the teacher's single `ctrl_c()` wait, extended to the signal a container
/// orchestrator actually sends on shutdown.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => error!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
