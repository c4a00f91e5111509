//! Domain entities and the shared error hierarchy for the vault sync gateway.
//!
//! This crate has no I/O of its own: it is the vocabulary every other vault
//! crate (catalog, store, sync, gateway) builds on, so that a `VaultError`
//! or an `Object` means the same thing regardless of which crate produced it.

mod error;
mod model;

pub use error::{VaultError, VaultResult};
pub use model::{Collection, Object, ObjectStatus};

/// Chunk size used everywhere a file or blob is streamed (hashing, upload, download).
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Basenames ingestion never treats as an object.
pub const IGNORED_BASENAMES: &[&str] = &[".vault_key", ".DS_Store"];

/// True if `name` should never be ingested as an object (hidden file, key file, etc).
pub fn is_ignored_basename(name: &str) -> bool {
    name.starts_with('.') || IGNORED_BASENAMES.contains(&name)
}

/// Build the object-store key for a (collection, name) pair.
pub fn object_key(collection: &str, name: &str) -> String {
    format!("{collection}/{name}")
}
