use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::{BlobStore, StoreError, StoreResult};

/// Operations seen by a [`MemoryBlobStore`], in call order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    ContainerExists(String),
    CreateContainer(String),
    Put(String),
    Get(String),
    Delete(String),
    List(String),
}

#[derive(Debug, Default)]
struct Faults {
    reads: AtomicBool,
    writes: AtomicBool,
    container: AtomicBool,
    keys: Mutex<HashSet<String>>,
}

/// In-process store shared by every clone. Faults can be switched on per operation class
/// to simulate a node that has lost part of its access to storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryBlobStore {
    containers: Arc<RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>>,
    faults: Arc<Faults>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `get_object` and `list_objects`
    pub fn fail_reads(&self, fail: bool) {
        self.faults.reads.store(fail, Ordering::SeqCst);
    }

    /// Fail `put_object` and `delete_object`
    pub fn fail_writes(&self, fail: bool) {
        self.faults.writes.store(fail, Ordering::SeqCst);
    }

    /// Fail `container_exists` and `create_container`
    pub fn fail_container(&self, fail: bool) {
        self.faults.container.store(fail, Ordering::SeqCst);
    }

    /// Fail `get_object` for one key only
    pub async fn fail_key(&self, key: &str, fail: bool) {
        let mut keys = self.faults.keys.lock().await;
        if fail {
            keys.insert(key.to_string());
        } else {
            keys.remove(key);
        }
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Direct peek at an object, bypassing faults and the call log
    pub async fn object(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.containers
            .read()
            .await
            .get(container)
            .and_then(|objects| objects.get(key).cloned())
    }

    /// Direct write, bypassing faults and the call log
    pub async fn insert_object(&self, container: &str, key: &str, body: &[u8]) {
        self.containers
            .write()
            .await
            .entry(container.to_string())
            .or_default()
            .insert(key.to_string(), body.to_vec());
    }

    async fn record(&self, call: StoreCall) {
        self.calls.lock().await.push(call);
    }

    fn check(flag: &AtomicBool, operation: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Backend(format!("simulated {} failure", operation)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn container_exists(&self, container: &str) -> StoreResult<bool> {
        self.record(StoreCall::ContainerExists(container.to_string()))
            .await;
        Self::check(&self.faults.container, "container")?;
        Ok(self.containers.read().await.contains_key(container))
    }

    async fn create_container(&self, container: &str) -> StoreResult<()> {
        self.record(StoreCall::CreateContainer(container.to_string()))
            .await;
        Self::check(&self.faults.container, "container")?;
        let mut containers = self.containers.write().await;
        if containers.contains_key(container) {
            return Err(StoreError::AlreadyExists);
        }
        containers.insert(container.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn put_object(&self, container: &str, key: &str, body: &[u8]) -> StoreResult<()> {
        self.record(StoreCall::Put(key.to_string())).await;
        Self::check(&self.faults.writes, "write")?;
        let mut containers = self.containers.write().await;
        let objects = containers.get_mut(container).ok_or(StoreError::NotFound)?;
        objects.insert(key.to_string(), body.to_vec());
        Ok(())
    }

    async fn get_object(&self, container: &str, key: &str) -> StoreResult<Vec<u8>> {
        self.record(StoreCall::Get(key.to_string())).await;
        Self::check(&self.faults.reads, "read")?;
        if self.faults.keys.lock().await.contains(key) {
            return Err(StoreError::Backend(format!("simulated read failure for '{}'", key)));
        }
        self.containers
            .read()
            .await
            .get(container)
            .and_then(|objects| objects.get(key).cloned())
            .ok_or(StoreError::NotFound)
    }

    async fn delete_object(&self, container: &str, key: &str) -> StoreResult<()> {
        self.record(StoreCall::Delete(key.to_string())).await;
        Self::check(&self.faults.writes, "write")?;
        let mut containers = self.containers.write().await;
        containers
            .get_mut(container)
            .and_then(|objects| objects.remove(key))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_objects(&self, container: &str, prefix: &str) -> StoreResult<Vec<String>> {
        self.record(StoreCall::List(prefix.to_string())).await;
        Self::check(&self.faults.reads, "read")?;
        let containers = self.containers.read().await;
        let objects = containers.get(container).ok_or(StoreError::NotFound)?;
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryBlobStore::new();
        assert!(!store.container_exists("c").await.unwrap());
        store.create_container("c").await.unwrap();
        assert_eq!(
            store.create_container("c").await,
            Err(StoreError::AlreadyExists)
        );

        store.put_object("c", "node-b", b"b").await.unwrap();
        store.put_object("c", "node-a", b"a").await.unwrap();
        store.put_object("c", "other", b"x").await.unwrap();

        assert_eq!(
            store.list_objects("c", "node-").await.unwrap(),
            vec!["node-a".to_string(), "node-b".to_string()]
        );
        assert_eq!(store.get_object("c", "node-a").await.unwrap(), b"a");

        store.delete_object("c", "node-a").await.unwrap();
        assert_eq!(
            store.get_object("c", "node-a").await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_key_fault() {
        let store = MemoryBlobStore::new();
        store.create_container("c").await.unwrap();
        store.put_object("c", "node-a", b"a").await.unwrap();
        store.put_object("c", "node-b", b"b").await.unwrap();

        store.fail_key("node-a", true).await;
        assert!(matches!(
            store.get_object("c", "node-a").await,
            Err(StoreError::Backend(_))
        ));
        assert_eq!(store.get_object("c", "node-b").await.unwrap(), b"b");
        assert_eq!(store.list_objects("c", "node-").await.unwrap().len(), 2);

        store.fail_key("node-a", false).await;
        assert_eq!(store.get_object("c", "node-a").await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_put_into_missing_container() {
        let store = MemoryBlobStore::new();
        assert_eq!(
            store.put_object("missing", "k", b"v").await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_faults_and_call_log() {
        let store = MemoryBlobStore::new();
        store.create_container("c").await.unwrap();
        store.fail_reads(true);

        assert!(store.put_object("c", "k", b"v").await.is_ok());
        assert!(matches!(
            store.get_object("c", "k").await,
            Err(StoreError::Backend(_))
        ));
        assert!(store.list_objects("c", "").await.is_err());
        assert_eq!(store.object("c", "k").await, Some(b"v".to_vec()));

        let calls = store.calls().await;
        assert_eq!(calls[0], StoreCall::CreateContainer("c".to_string()));
        assert_eq!(calls[1], StoreCall::Put("k".to_string()));
        assert_eq!(calls.len(), 4);
    }
}
