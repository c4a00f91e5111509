//! SHA-256 hashing and collection API key handling.
//!
//! Grounded on the streaming-hasher shape used across the workspace's crypto
//! helpers, but built on `sha2` rather than `blake3`: read endpoints and the
//! original source both key on SHA-256 hex digests, so that's what's kept.

use std::path::Path;

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::io::AsyncReadExt;

/// Chunk size for streaming file/object hashing (8 MiB).
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Stateful SHA-256 hasher for incremental input.
#[derive(Default)]
pub struct Sha256Hasher {
    inner: Sha256,
    len: u64,
}

impl Sha256Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self.len += data.len() as u64;
        self
    }

    /// Consume the hasher, returning the lowercase hex digest and total byte count.
    pub fn finalize(self) -> (String, u64) {
        let digest = self.inner.finalize();
        (hex::encode(digest), self.len)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("io error hashing file: {0}")]
    Io(#[from] std::io::Error),
}

/// Stream a file in `CHUNK_SIZE` chunks, returning its hex SHA-256 digest and size in bytes.
pub async fn hash_file(path: impl AsRef<Path>) -> Result<(String, u64), HashError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Hex SHA-256 digest of an in-memory buffer, not chunked (used for short secrets, not files).
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Generate a fresh collection API key: 32 random bytes, hex-encoded (mirrors `secrets.token_hex(32)`).
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a presented API key the same way a stored key is hashed, for catalog comparison.
pub fn hash_api_key(key: &str) -> String {
    hash_bytes(key.as_bytes())
}

/// Constant-time comparison of two hex digests, padding to equal length first so the
/// comparison never short-circuits on a length mismatch.
pub fn constant_time_eq_hex(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let padded_len = a.len().max(b.len()).max(1);
    let mut pa = vec![0u8; padded_len];
    let mut pb = vec![0u8; padded_len];
    pa[..a.len()].copy_from_slice(a);
    pb[..b.len()].copy_from_slice(b);
    let lengths_match = (a.len() as u64).ct_eq(&(b.len() as u64));
    let contents_match = pa.ct_eq(&pb);
    bool::from(lengths_match & contents_match)
}

/// Verify a presented plaintext API key against a stored hex digest.
pub fn verify_api_key(presented: &str, stored_hash: &str) -> bool {
    constant_time_eq_hex(&hash_api_key(presented), stored_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README.md");
        tokio::fs::write(&path, b"hello\n").await.unwrap();
        let (hash, size) = hash_file(&path).await.unwrap();
        assert_eq!(
            hash,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
        assert_eq!(size, 6);
    }

    #[test]
    fn generated_keys_are_unique_and_verifiable() {
        let key = generate_api_key();
        assert_eq!(key.len(), 64);
        let hash = hash_api_key(&key);
        assert!(verify_api_key(&key, &hash));
        assert!(!verify_api_key("wrong-key", &hash));
    }

    #[test]
    fn constant_time_eq_rejects_length_mismatch() {
        assert!(!constant_time_eq_hex("abcd", "abcdef"));
        assert!(constant_time_eq_hex("abcd", "abcd"));
    }
}
