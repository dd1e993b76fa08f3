//! Blob storage used as the rendezvous point for discovery.
//!
//! [`BlobStore`] is the backend seam; [`StorageClient`] wraps whichever backend the
//! current configuration points at and speaks the crate's error taxonomy.
use async_trait::async_trait;
use std::fmt;

pub mod client;
pub mod connector;
pub mod fs;
pub mod memory;

pub use client::StorageClient;
pub use connector::StoreConnector;
pub use fs::FsBlobStore;
pub use memory::{MemoryBlobStore, StoreCall};

/// Backend-level failures
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// Container creation lost a race with another node
    AlreadyExists,
    NotFound,
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::AlreadyExists => write!(f, "already exists"),
            StoreError::NotFound => write!(f, "not found"),
            StoreError::Backend(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Generic object store: containers holding keyed byte blobs
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn container_exists(&self, container: &str) -> StoreResult<bool>;

    /// Must report [`StoreError::AlreadyExists`] when the container is already there
    async fn create_container(&self, container: &str) -> StoreResult<()>;

    /// Create or overwrite an object
    async fn put_object(&self, container: &str, key: &str, body: &[u8]) -> StoreResult<()>;

    async fn get_object(&self, container: &str, key: &str) -> StoreResult<Vec<u8>>;

    async fn delete_object(&self, container: &str, key: &str) -> StoreResult<()>;

    /// Keys starting with `prefix`, in the backend's listing order
    async fn list_objects(&self, container: &str, prefix: &str) -> StoreResult<Vec<String>>;
}
