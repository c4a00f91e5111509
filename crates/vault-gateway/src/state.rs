use std::sync::Arc;

use vault_catalog::Catalog;
use vault_store::ObjectStoreClient;
use vault_sync::{CollectionWatcher, PathCoordinator};
use vault_telemetry::MetricsRegistry;

use crate::auth_limiter::AuthLimiter;
use crate::health::HealthAuditor;

/// Everything an HTTP handler needs, bundled once at boot and cloned cheaply
/// (every field is an `Arc`). Mirrors the teacher's `AppState` idiom, with the
/// RPC dispatch table swapped for the concrete collaborators this gateway needs.
#[derive(Clone)]
pub struct AppState {
    pub collections_root: std::path::PathBuf,
    pub catalog: Arc<Catalog>,
    pub store: Arc<ObjectStoreClient>,
    pub coordinator: Arc<PathCoordinator>,
    pub watcher: Arc<CollectionWatcher>,
    pub auth_limiter: Arc<AuthLimiter>,
    pub health: Arc<HealthAuditor>,
    pub metrics: Arc<MetricsRegistry>,
}
