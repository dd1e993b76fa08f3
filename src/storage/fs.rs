use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::{BlobStore, StoreError, StoreResult};

/// Store backed by a directory, typically on a mount every node shares.
///
/// Each container is a subdirectory of `root` and each object a file in it. Objects are
/// written to a hidden temporary file and renamed into place so readers never observe a
/// partially written record.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn container_path(&self, container: &str) -> StoreResult<PathBuf> {
        validate_name("container", container)?;
        Ok(self.root.join(container))
    }

    fn object_path(&self, container: &str, key: &str) -> StoreResult<PathBuf> {
        validate_name("key", key)?;
        Ok(self.container_path(container)?.join(key))
    }
}

/// Names map directly onto path components; hidden names are reserved for staging files
pub(crate) fn is_valid_name(name: &str) -> bool {
    !(name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0'))
}

fn validate_name(kind: &str, name: &str) -> StoreResult<()> {
    if !is_valid_name(name) {
        return Err(StoreError::Backend(format!("invalid {} name '{}'", kind, name)));
    }
    Ok(())
}

fn map_io(err: std::io::Error) -> StoreError {
    match err.kind() {
        ErrorKind::NotFound => StoreError::NotFound,
        ErrorKind::AlreadyExists => StoreError::AlreadyExists,
        _ => StoreError::Backend(err.to_string()),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn container_exists(&self, container: &str) -> StoreResult<bool> {
        let path = self.container_path(container)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io(e)),
        }
    }

    async fn create_container(&self, container: &str) -> StoreResult<()> {
        let path = self.container_path(container)?;
        tokio::fs::create_dir_all(&self.root).await.map_err(map_io)?;
        tokio::fs::create_dir(&path).await.map_err(map_io)
    }

    async fn put_object(&self, container: &str, key: &str, body: &[u8]) -> StoreResult<()> {
        let path = self.object_path(container, key)?;
        let staging = self
            .container_path(container)?
            .join(format!(".{}.{}.partial", key, std::process::id()));
        tokio::fs::write(&staging, body).await.map_err(map_io)?;
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(map_io(e));
        }
        Ok(())
    }

    async fn get_object(&self, container: &str, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.object_path(container, key)?;
        tokio::fs::read(&path).await.map_err(map_io)
    }

    async fn delete_object(&self, container: &str, key: &str) -> StoreResult<()> {
        let path = self.object_path(container, key)?;
        tokio::fs::remove_file(&path).await.map_err(map_io)
    }

    async fn list_objects(&self, container: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let path = self.container_path(container)?;
        let mut entries = tokio::fs::read_dir(&path).await.map_err(map_io)?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(map_io)? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || !name.starts_with(prefix) {
                continue;
            }
            if entry.file_type().await.map_err(map_io)?.is_file() {
                keys.push(name);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
