use std::time::Duration;

use thiserror::Error;

/// Closed error hierarchy shared by every vault crate.
///
/// Workers catch this once at the top of a pipeline and the HTTP surface maps
/// each variant to a status code; no other error type should cross a crate
/// boundary in this workspace.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("not found")]
    NotFound,

    #[error("authentication failed")]
    AuthFailed,

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("circuit open, retry after {time_remaining:?}")]
    CircuitOpen { time_remaining: Duration },

    #[error("object store failure: {0}")]
    StoreFailure(String),

    #[error("catalog failure: {0}")]
    CatalogFailure(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl VaultError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        VaultError::StoreFailure(err.to_string())
    }

    pub fn catalog(err: impl std::fmt::Display) -> Self {
        VaultError::CatalogFailure(err.to_string())
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
