//! Environment-driven configuration, one section per collaborator. Grounded
//! on the teacher's `GatewayConfig`: a `Default` impl carrying every numeric
//! default from the design, a `from_env()` that overlays `VAULT_*` variables
//! on top of it, and a `validate()` that rejects impossible combinations
//! before the process ever tries to bind a socket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use vault_gateway::auth_limiter::AuthLimiterConfig;
use vault_gateway::health::HealthAuditorConfig;
use vault_store::CircuitBreakerConfig;
use vault_sync::{CoordinatorConfig, WatcherConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate or invalid http bind address")]
    InvalidHttpAddr,
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("collections_root must not be empty")]
    EmptyCollectionsRoot,
    #[error("catalog.max_connections must be at least 1")]
    InvalidMaxConnections,
}

#[derive(Debug, Clone)]
pub struct HttpSection {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
        }
    }
}

impl HttpSection {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct CatalogSection {
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./vault.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectStoreSection {
    pub location: String,
}

impl Default for ObjectStoreSection {
    fn default() -> Self {
        Self {
            location: "./vault-objects".to_string(),
        }
    }
}

/// One section per collaborator, following the teacher's `GatewayConfig`
/// layout. Every field maps to a `VAULT_*` environment variable.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub http: HttpSection,
    pub collections_root: PathBuf,
    pub catalog: CatalogSection,
    pub object_store: ObjectStoreSection,
    pub coordinator: CoordinatorConfig,
    pub watcher: WatcherConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub auth_limiter: AuthLimiterConfig,
    pub health: HealthAuditorConfig,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            http: HttpSection::default(),
            collections_root: PathBuf::from("./collections"),
            catalog: CatalogSection::default(),
            object_store: ObjectStoreSection::default(),
            coordinator: CoordinatorConfig::default(),
            watcher: WatcherConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            auth_limiter: AuthLimiterConfig::default(),
            health: HealthAuditorConfig::default(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl VaultConfig {
    /// Overlay `VAULT_*` environment variables on top of the defaults.
    ///
    /// Recognized variables: `VAULT_HTTP_HOST`, `VAULT_HTTP_PORT`,
    /// `VAULT_COLLECTIONS_ROOT`, `VAULT_DATABASE_URL`, `VAULT_MAX_CONNECTIONS`,
    /// `VAULT_OBJECT_STORE_LOCATION`, `VAULT_DEBOUNCE_WINDOW_SECS`,
    /// `VAULT_PROCESSING_TIMEOUT_SECS`, `VAULT_WATCHER_POLL_INTERVAL_SECS`,
    /// `VAULT_BREAKER_FAILURE_THRESHOLD`, `VAULT_BREAKER_SUCCESS_THRESHOLD`,
    /// `VAULT_BREAKER_COOLDOWN_SECS`, `VAULT_AUTH_MAX_FAILURES`,
    /// `VAULT_AUTH_WINDOW_SECS`, `VAULT_AUTH_BLOCK_DURATION_SECS`,
    /// `VAULT_LOG_LEVEL` (or `RUST_LOG`), `VAULT_JSON_LOGS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("VAULT_HTTP_HOST") {
            if let Ok(host) = v.parse() {
                config.http.host = host;
            }
        }
        if let Some(port) = env_parsed("VAULT_HTTP_PORT") {
            config.http.port = port;
        }
        if let Ok(v) = std::env::var("VAULT_COLLECTIONS_ROOT") {
            config.collections_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("VAULT_DATABASE_URL") {
            config.catalog.database_url = v;
        }
        if let Some(v) = env_parsed("VAULT_MAX_CONNECTIONS") {
            config.catalog.max_connections = v;
        }
        if let Ok(v) = std::env::var("VAULT_OBJECT_STORE_LOCATION") {
            config.object_store.location = v;
        }
        if let Some(secs) = env_parsed("VAULT_DEBOUNCE_WINDOW_SECS") {
            config.coordinator.debounce_window = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parsed("VAULT_PROCESSING_TIMEOUT_SECS") {
            config.coordinator.processing_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parsed("VAULT_WATCHER_POLL_INTERVAL_SECS") {
            config.watcher.poll_interval = Duration::from_secs(secs);
        }
        if let Some(v) = env_parsed("VAULT_BREAKER_FAILURE_THRESHOLD") {
            config.circuit_breaker.failure_threshold = v;
        }
        if let Some(v) = env_parsed("VAULT_BREAKER_SUCCESS_THRESHOLD") {
            config.circuit_breaker.success_threshold = v;
        }
        if let Some(secs) = env_parsed("VAULT_BREAKER_COOLDOWN_SECS") {
            config.circuit_breaker.cooldown = Duration::from_secs(secs);
        }
        if let Some(v) = env_parsed("VAULT_AUTH_MAX_FAILURES") {
            config.auth_limiter.max_failures = v;
        }
        if let Some(secs) = env_parsed("VAULT_AUTH_WINDOW_SECS") {
            config.auth_limiter.window = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parsed("VAULT_AUTH_BLOCK_DURATION_SECS") {
            config.auth_limiter.block_duration = Duration::from_secs(secs);
        }
        config.log_level = std::env::var("VAULT_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());
        config.json_logs = std::env::var("VAULT_JSON_LOGS")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        config
    }

    /// Rejects combinations that would make the process nonfunctional before
    /// it ever binds a socket or opens the catalog.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collections_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyCollectionsRoot);
        }
        if self.catalog.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections);
        }
        if self.coordinator.debounce_window.is_zero() {
            return Err(ConfigError::ZeroValue("coordinator.debounce_window"));
        }
        if self.coordinator.processing_timeout.is_zero() {
            return Err(ConfigError::ZeroValue("coordinator.processing_timeout"));
        }
        if self.watcher.poll_interval.is_zero() {
            return Err(ConfigError::ZeroValue("watcher.poll_interval"));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::ZeroValue("circuit_breaker.failure_threshold"));
        }
        if self.circuit_breaker.success_threshold == 0 {
            return Err(ConfigError::ZeroValue("circuit_breaker.success_threshold"));
        }
        if self.auth_limiter.max_failures == 0 {
            return Err(ConfigError::ZeroValue("auth_limiter.max_failures"));
        }
        if self.http.port == 0 {
            return Err(ConfigError::InvalidHttpAddr);
        }
        Ok(())
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        VaultConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_max_connections_is_rejected() {
        let mut config = VaultConfig::default();
        config.catalog.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxConnections)));
    }

    #[test]
    fn zero_http_port_is_rejected() {
        let mut config = VaultConfig::default();
        config.http.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHttpAddr)));
    }
}
