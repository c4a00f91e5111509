use std::sync::Arc;

use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use vault_types::VaultError;

/// Builds the backing `object_store` implementation from a simple URL-ish
/// configuration value, so swapping S3/GCS/Azure/local/in-memory is a
/// configuration change rather than a code change.
///
/// Supported forms: `memory://`, `file:///abs/path`, or a bare filesystem path.
/// Cloud backends (`s3://`, `gs://`, `az://`) are constructed the same way by
/// callers that need bucket-specific credentials; this helper covers the
/// common local/dev cases used by the default configuration and tests.
pub fn build_object_store(location: &str) -> Result<Arc<dyn ObjectStore>, VaultError> {
    if location == "memory://" {
        return Ok(Arc::new(InMemory::new()));
    }
    let path = location.strip_prefix("file://").unwrap_or(location);
    std::fs::create_dir_all(path).map_err(VaultError::store)?;
    let fs = LocalFileSystem::new_with_prefix(path).map_err(VaultError::store)?;
    Ok(Arc::new(fs))
}
