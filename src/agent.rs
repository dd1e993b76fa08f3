//! Standalone host loop: drives the directory's lifecycle on a timer and publishes
//! what it learns for the status API.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cluster::{DiscoveryInput, DiscoveryOutput, MembershipDirectory};
use crate::record::ClusterNodeAddress;

pub type SharedStatus = Arc<RwLock<DiscoveryStatus>>;

/// Snapshot of the last completed discovery cycle
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DiscoveryStatus {
    pub node_id: String,
    pub own_address: Option<ClusterNodeAddress>,
    pub published: bool,
    pub nodes: Vec<ClusterNodeAddress>,
    pub reload_interval_secs: u64,
    pub cycles: u64,
}

pub struct DiscoveryAgent {
    directory: MembershipDirectory,
    input: DiscoveryInput,
    status: SharedStatus,
    default_reload: Duration,
}

impl DiscoveryAgent {
    pub fn new(
        directory: MembershipDirectory,
        input: DiscoveryInput,
        default_reload: Duration,
    ) -> Self {
        let status = DiscoveryStatus {
            node_id: input.own_id.clone(),
            own_address: Some(input.own_address.clone()),
            ..Default::default()
        };
        Self {
            directory,
            input,
            status: Arc::new(RwLock::new(status)),
            default_reload,
        }
    }

    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    /// Run `init`, then `reload` on the reported interval until `shutdown` resolves,
    /// then `destroy`.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        info!(
            "[Node<{}>] Starting discovery for {}",
            self.input.own_id, self.input.own_address
        );
        let output = self.directory.init(&self.input).await;
        let mut interval = self.apply(output).await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(interval) => {
                    let output = self.directory.reload(&self.input).await;
                    interval = self.apply(output).await;
                }
            }
        }

        info!("[Node<{}>] Stopping discovery", self.input.own_id);
        self.directory.destroy(&self.input.own_id).await;
        self.status.write().await.published = false;
    }

    /// Record the outcome of one cycle and work out when the next one is due
    async fn apply(&self, output: DiscoveryOutput) -> Duration {
        let mut status = self.status.write().await;
        status.cycles += 1;
        status.published = self.directory.own_record().is_some();
        if let Some(nodes) = output.current_nodes {
            debug!(
                "[Node<{}>] Discovered {} nodes",
                self.input.own_id,
                nodes.len()
            );
            status.nodes = nodes;
        }
        if let Some(secs) = output.reload_interval_secs {
            status.reload_interval_secs = secs;
        }

        match status.reload_interval_secs {
            0 => self.default_reload,
            secs => Duration::from_secs(secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiscoveryConfig, StaticConfigSource};
    use crate::record::SystemClock;
    use crate::settings::{ConfigReloadPolicy, UnavailablePolicy};
    use crate::storage::{MemoryBlobStore, StorageClient, StoreConnector};

    #[tokio::test]
    async fn test_agent_lifecycle() {
        let config = DiscoveryConfig::new("memory://agent", "discovery", "node-", 0, 0).unwrap();
        let connector = StoreConnector::new();
        let store = MemoryBlobStore::new();
        connector.register_memory("agent", store.clone()).await;
        let storage = StorageClient::new(
            Arc::new(StaticConfigSource::new(config)),
            connector,
            ConfigReloadPolicy::KeepLastValid,
        );
        let directory =
            MembershipDirectory::new(storage, Arc::new(SystemClock), UnavailablePolicy::Skip);
        let input = DiscoveryInput::new("A", ClusterNodeAddress::new("127.0.0.1", 7800));

        let agent = DiscoveryAgent::new(directory, input, Duration::from_millis(10));
        let status = agent.status();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(agent.run(async move {
            let _ = rx.await;
        }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        {
            let status = status.read().await;
            assert!(status.published);
            assert!(status.cycles > 1);
            assert_eq!(status.nodes.len(), 1);
            assert_eq!(status.reload_interval_secs, 0);
        }
        assert!(store.object("discovery", "node-A").await.is_some());

        tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(store.object("discovery", "node-A").await.is_none());
        assert!(!status.read().await.published);
    }
}
