//! Filesystem-to-object-store reconciliation: the path coordinator, the
//! ingestion/deletion pipelines, the polling watcher, the startup scanner,
//! the read-side sync barrier, and the watcher supervisor.

mod coordinator;
mod delete;
mod ingest;
mod key_file;
mod scanner;
mod supervisor;
mod watcher;

pub mod barrier;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vault_catalog::Catalog;
use vault_store::ObjectStoreClient;
use vault_telemetry::MetricsRegistry;

pub use coordinator::{CoordinatorConfig, InFlightGuard, PathCoordinator};
pub use delete::delete_path;
pub use ingest::ingest_path;
pub use watcher::{CollectionWatcher, RawEvent, WatcherConfig};

/// Bundle of explicit collaborators every pipeline stage needs. Constructed
/// once at boot and shared by `Arc`, never reached for through a global.
pub struct SyncContext {
    pub collections_root: PathBuf,
    pub catalog: Arc<Catalog>,
    pub store: Arc<ObjectStoreClient>,
    pub coordinator: Arc<PathCoordinator>,
    pub metrics: Arc<MetricsRegistry>,
}

impl SyncContext {
    /// Parses `(collection, name)` out of an absolute path, requiring it sit
    /// exactly one directory level below the collections root (no nested
    /// recursion within a collection).
    pub fn parse_collection_and_name(&self, path: &Path) -> Option<(String, String)> {
        let relative = path.strip_prefix(&self.collections_root).ok()?;
        let mut components = relative.components();
        let collection = components.next()?.as_os_str().to_str()?.to_string();
        let name_component = components.next()?.as_os_str().to_str()?.to_string();
        if components.next().is_some() {
            return None; // nested beneath a collection directory: not an object
        }
        Some((collection, name_component))
    }
}

/// Everything needed to run the sync engine as a set of background tasks.
pub struct SyncEngine {
    pub watcher: Arc<CollectionWatcher>,
    context: Arc<SyncContext>,
}

impl SyncEngine {
    pub fn new(context: Arc<SyncContext>, watcher_config: WatcherConfig) -> Self {
        let watcher = CollectionWatcher::new(context.collections_root.clone(), watcher_config);
        Self { watcher, context }
    }

    /// Runs the startup scan, arms the watcher, then spawns the dispatch loop
    /// and the supervisor. Returns once the scan completes and the watcher is
    /// live; the spawned tasks run until `shutdown` is cancelled.
    pub async fn start(&self, shutdown: CancellationToken) -> Result<(), vault_types::VaultError> {
        scanner::scan_existing(&self.context).await?;

        let rx = self
            .watcher
            .start()
            .map_err(|e| vault_types::VaultError::Transient(e.to_string()))?;

        let (rewire_tx, rewire_rx) = mpsc::channel(1);

        tokio::spawn(dispatch_loop(self.context.clone(), rx, rewire_rx, shutdown.clone()));
        tokio::spawn(supervisor::run(
            self.watcher.clone(),
            self.context.metrics.clone(),
            rewire_tx,
            shutdown,
        ));

        info!("sync engine started");
        Ok(())
    }
}

async fn dispatch_loop(
    ctx: Arc<SyncContext>,
    mut rx: mpsc::Receiver<RawEvent>,
    mut rewire_rx: mpsc::Receiver<mpsc::Receiver<RawEvent>>,
    shutdown: CancellationToken,
) {
    loop {
        ctx.metrics.watcher_channel_backlog.set(rx.len() as i64);
        ctx.metrics.in_flight_paths.set(ctx.coordinator.in_flight_count() as i64);
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("dispatch loop stopping");
                return;
            }
            new_rx = rewire_rx.recv() => {
                if let Some(new_rx) = new_rx {
                    warn!("watcher restarted, rewiring event channel");
                    rx = new_rx;
                }
            }
            event = rx.recv() => {
                match event {
                    Some(raw) => handle_event(&ctx, raw).await,
                    None => {
                        warn!("watcher event channel closed");
                        return;
                    }
                }
            }
        }
    }
}

async fn handle_event(ctx: &Arc<SyncContext>, raw: RawEvent) {
    match raw {
        RawEvent::Created(path) => {
            if is_new_collection_dir(ctx, &path).await {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if let Err(err) = ingest::ensure_collection(ctx, name).await {
                        warn!(collection = name, error = %err, "collection directory registration failed");
                    }
                }
                return;
            }
            ingest_with_gate(ctx, &path).await;
        }
        RawEvent::Modified(path) => {
            ingest_with_gate(ctx, &path).await;
        }
        RawEvent::Removed(path) => {
            if let Some(_guard) = ctx.coordinator.gate_for_delete(&path) {
                if let Err(err) = delete::delete_path(ctx, &path).await {
                    warn!(path = %path.display(), error = %err, "deletion pipeline failed");
                }
            }
        }
    }
}

async fn ingest_with_gate(ctx: &Arc<SyncContext>, path: &Path) {
    if let Some(_guard) = ctx.coordinator.gate_for_ingest(path) {
        if let Err(err) = ingest::ingest_path(ctx, path).await {
            warn!(path = %path.display(), error = %err, "ingestion pipeline failed");
        }
    }
}

/// True when `path` is a directory that is an immediate child of the
/// collections root, i.e. a just-created collection rather than a file or a
/// path nested deeper inside one.
async fn is_new_collection_dir(ctx: &SyncContext, path: &Path) -> bool {
    if path.parent() != Some(ctx.collections_root.as_path()) {
        return false;
    }
    matches!(tokio::fs::metadata(path).await, Ok(meta) if meta.is_dir())
}

/// Records circuit-breaker fallout from a failed object-store call: a
/// fail-fast rejection is counted separately from a failure that tripped the
/// breaker open just now.
pub(crate) fn record_breaker_failure(ctx: &SyncContext, err: &vault_types::VaultError, was_open: bool) {
    use vault_store::CircuitState;
    match err {
        vault_types::VaultError::CircuitOpen { .. } => {
            ctx.metrics.circuit_breaker_rejections_total.inc();
        }
        _ if !was_open && ctx.store.breaker().state() == CircuitState::Open => {
            ctx.metrics.circuit_breaker_opens_total.inc();
        }
        _ => {}
    }
}
