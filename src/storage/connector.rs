use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

use super::{BlobStore, FsBlobStore, MemoryBlobStore};
use crate::config_error;
use crate::error::Result;

pub const MEMORY_SCHEME: &str = "memory";
pub const FILE_SCHEME: &str = "file";

/// Turns a connection string into a store handle.
///
/// * `memory://<namespace>`: an in-process store; every connection to the same namespace
///   through clones of one connector shares the same objects.
/// * `file:///<path>`: a directory-backed store rooted at `<path>`.
#[derive(Clone, Debug, Default)]
pub struct StoreConnector {
    memory: Arc<Mutex<HashMap<String, MemoryBlobStore>>>,
}

impl StoreConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register a memory namespace, so callers keep a handle for inspection
    pub async fn register_memory(&self, namespace: &str, store: MemoryBlobStore) {
        self.memory
            .lock()
            .await
            .insert(namespace.to_string(), store);
    }

    pub async fn connect(&self, connection_string: &str) -> Result<Arc<dyn BlobStore>> {
        let url = Url::parse(connection_string.trim())?;
        match url.scheme() {
            MEMORY_SCHEME => {
                let namespace = url
                    .host_str()
                    .filter(|h| !h.is_empty())
                    .ok_or_else(|| config_error!("memory connection string needs a namespace"))?;
                let store = self
                    .memory
                    .lock()
                    .await
                    .entry(namespace.to_string())
                    .or_default()
                    .clone();
                Ok(Arc::new(store))
            }
            FILE_SCHEME => {
                let root = url.to_file_path().map_err(|_| {
                    config_error!("'{}' is not a valid file path", connection_string)
                })?;
                Ok(Arc::new(FsBlobStore::new(root)))
            }
            other => Err(config_error!(
                "unsupported storage scheme '{}' (expected '{}' or '{}')",
                other,
                MEMORY_SCHEME,
                FILE_SCHEME
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_namespaces_are_shared() {
        let connector = StoreConnector::new();
        let a = connector.connect("memory://cluster-a").await.unwrap();
        let b = connector.clone().connect("memory://cluster-a").await.unwrap();
        let other = connector.connect("memory://cluster-b").await.unwrap();

        a.create_container("c").await.unwrap();
        assert!(b.container_exists("c").await.unwrap());
        assert!(!other.container_exists("c").await.unwrap());
    }

    #[tokio::test]
    async fn test_registered_memory_store() {
        let connector = StoreConnector::new();
        let store = MemoryBlobStore::new();
        connector.register_memory("shared", store.clone()).await;

        let handle = connector.connect("memory://shared").await.unwrap();
        handle.create_container("c").await.unwrap();
        assert!(store.container_exists("c").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_directory_path(dir.path()).unwrap();
        let store = StoreConnector::new().connect(url.as_str()).await.unwrap();
        store.create_container("c").await.unwrap();
        assert!(dir.path().join("c").is_dir());
    }

    #[tokio::test]
    async fn test_rejected_connection_strings() {
        let connector = StoreConnector::new();
        assert!(connector.connect("not a url").await.is_err());
        assert!(connector.connect("https://account.example").await.is_err());
        assert!(connector.connect("memory://").await.is_err());
    }
}
