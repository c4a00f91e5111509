use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutPayload};
use tokio::io::AsyncReadExt;
use vault_types::{VaultError, CHUNK_SIZE};

use crate::circuit_breaker::CircuitBreaker;

/// Bucket-scoped client over an `object_store` backend, with mutating calls
/// routed through a circuit breaker. Reads are not breaker-guarded: a failing
/// GET affects one caller, not the ingestion pipeline's throughput.
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    breaker: CircuitBreaker,
}

impl ObjectStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>, breaker: CircuitBreaker) -> Self {
        Self { store, breaker }
    }

    /// Local/in-memory backends are already "created"; cloud backends are
    /// expected to be provisioned out of band. This probes reachability.
    pub async fn ensure_bucket(&self) -> Result<(), VaultError> {
        match self.store.list(None).next().await {
            Some(Err(err)) => Err(VaultError::store(err)),
            _ => Ok(()),
        }
    }

    /// Streams a local file to `key` in `CHUNK_SIZE` chunks, through the breaker.
    pub async fn put(&self, key: &str, local_path: &std::path::Path) -> Result<(), VaultError> {
        let store = self.store.clone();
        let path = StorePath::from(key);
        let local_path = local_path.to_path_buf();
        self.breaker
            .call(|| async move {
                let mut file = tokio::fs::File::open(&local_path)
                    .await
                    .map_err(VaultError::store)?;
                let mut upload = store.put_multipart(&path).await.map_err(VaultError::store)?;
                let mut buf = vec![0u8; CHUNK_SIZE];
                loop {
                    let n = file.read(&mut buf).await.map_err(VaultError::store)?;
                    if n == 0 {
                        break;
                    }
                    upload
                        .put_part(PutPayload::from(Bytes::copy_from_slice(&buf[..n])))
                        .await
                        .map_err(VaultError::store)?;
                }
                upload.complete().await.map_err(VaultError::store)?;
                Ok(())
            })
            .await
    }

    /// Deletes `key`. A missing key is not a failure: returns `Ok(false)`.
    pub async fn delete(&self, key: &str) -> Result<bool, VaultError> {
        let store = self.store.clone();
        let path = StorePath::from(key);
        self.breaker
            .call(|| async move {
                match store.delete(&path).await {
                    Ok(()) => Ok(true),
                    Err(object_store::Error::NotFound { .. }) => Ok(false),
                    Err(err) => Err(VaultError::store(err)),
                }
            })
            .await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, VaultError> {
        let path = StorePath::from(key);
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(VaultError::store(err)),
        }
    }

    pub async fn stat(&self, key: &str) -> Result<Option<object_store::ObjectMeta>, VaultError> {
        let path = StorePath::from(key);
        match self.store.head(&path).await {
            Ok(meta) => Ok(Some(meta)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(err) => Err(VaultError::store(err)),
        }
    }

    /// Streaming byte reader for `key`, for the download handler.
    pub async fn open(
        &self,
        key: &str,
    ) -> Result<impl Stream<Item = Result<Bytes, VaultError>>, VaultError> {
        let path = StorePath::from(key);
        let result = self.store.get(&path).await.map_err(|err| match err {
            object_store::Error::NotFound { .. } => VaultError::NotFound,
            other => VaultError::store(other),
        })?;
        Ok(result.into_stream().map(|chunk| chunk.map_err(VaultError::store)))
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}
