//! MembershipDirectory answers the host's discovery callbacks.
//!
//! Each node keeps its own presence record in the shared container fresh and reads
//! everyone else's. Records past the expiration window are dropped from the answer and
//! deleted opportunistically by whichever node sees them first.
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::plan::{plan_peers, FetchedObject, PeerPlan};
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::record::{Clock, ClusterNodeAddress, PresenceRecord};
use crate::settings::UnavailablePolicy;
use crate::storage::StorageClient;

/// What the host passes to every lifecycle call
#[derive(Clone, Debug)]
pub struct DiscoveryInput {
    pub own_id: String,
    pub own_address: ClusterNodeAddress,
}

impl DiscoveryInput {
    pub fn new(own_id: impl Into<String>, own_address: ClusterNodeAddress) -> Self {
        Self {
            own_id: own_id.into(),
            own_address,
        }
    }
}

/// What a lifecycle call hands back to the host.
///
/// `None` fields mean "no update this cycle": the host keeps its previous value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryOutput {
    pub current_nodes: Option<Vec<ClusterNodeAddress>>,
    pub reload_interval_secs: Option<u64>,
}

/// The record this node last published and the key it lives under
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnRecordHandle {
    pub key: String,
    pub record: PresenceRecord,
}

pub struct MembershipDirectory {
    storage: StorageClient,
    clock: Arc<dyn Clock>,
    unavailable_policy: UnavailablePolicy,
    own_record: Option<OwnRecordHandle>,
    last_known: Option<Vec<ClusterNodeAddress>>,
}

impl MembershipDirectory {
    pub fn new(
        storage: StorageClient,
        clock: Arc<dyn Clock>,
        unavailable_policy: UnavailablePolicy,
    ) -> Self {
        Self {
            storage,
            clock,
            unavailable_policy,
            own_record: None,
            last_known: None,
        }
    }

    pub fn own_record(&self) -> Option<&OwnRecordHandle> {
        self.own_record.as_ref()
    }

    /// First call after node start. Always publishes this node's record.
    pub async fn init(&mut self, input: &DiscoveryInput) -> DiscoveryOutput {
        self.cycle("Initialization", input, true).await
    }

    /// Periodic call. Republishes this node's record only once the update interval has passed.
    pub async fn reload(&mut self, input: &DiscoveryInput) -> DiscoveryOutput {
        self.cycle("Reload", input, false).await
    }

    /// Remove this node's record, if it ever published one. Failures are only logged.
    pub async fn destroy(&mut self, own_id: &str) {
        let Some(handle) = self.own_record.take() else {
            debug!("Node {} never published a record. Nothing to remove.", own_id);
            return;
        };
        match self.storage.delete(&handle.key).await {
            Ok(()) => debug!("Removed own presence record '{}'.", handle.key),
            Err(e) => warn!("Destroy of the discovery directory failed. {}", e),
        }
    }

    async fn cycle(
        &mut self,
        phase: &str,
        input: &DiscoveryInput,
        force_publish: bool,
    ) -> DiscoveryOutput {
        let mut output = DiscoveryOutput::default();

        let config = match self.storage.refresh_connection().await {
            Ok(config) => config,
            Err(e) => {
                warn!("{} of the discovery directory failed. {}", phase, e);
                return output;
            }
        };
        output.reload_interval_secs = Some(config.update_interval_secs);

        match self.publish_and_list(input, &config, force_publish).await {
            Ok(nodes) => output.current_nodes = Some(nodes),
            Err(e) => {
                warn!("{} of the discovery directory failed. {}", phase, e);
                if e.is_storage_failure() {
                    output.current_nodes = self.fallback_nodes();
                }
            }
        }
        output
    }

    async fn publish_and_list(
        &mut self,
        input: &DiscoveryInput,
        config: &DiscoveryConfig,
        force_publish: bool,
    ) -> Result<Vec<ClusterNodeAddress>> {
        self.ensure_container(config).await?;

        if force_publish || self.own_record_due(config) {
            self.publish_own(input, config).await?;
        }

        match self.list_peers(config).await {
            Ok(nodes) => {
                debug!("Found following node addresses: {:?}", nodes);
                self.last_known = Some(nodes.clone());
                Ok(nodes)
            }
            Err(e) => {
                warn!("Could not list presence records. {}", e);
                Ok(match self.unavailable_policy {
                    UnavailablePolicy::LastKnown => self.last_known.clone().unwrap_or_default(),
                    UnavailablePolicy::Skip | UnavailablePolicy::Empty => Vec::new(),
                })
            }
        }
    }

    async fn ensure_container(&self, config: &DiscoveryConfig) -> Result<()> {
        if !self.storage.container_exists().await? {
            info!(
                "Storage container '{}' doesn't exist. Creating it.",
                config.container_name
            );
            self.storage.create_container_if_absent().await?;
        }
        Ok(())
    }

    /// Own record is missing or older than the update interval
    fn own_record_due(&self, config: &DiscoveryConfig) -> bool {
        let now = self.clock.now_millis();
        self.own_record.as_ref().map_or(true, |handle| {
            handle
                .record
                .is_expired(config.update_interval_secs, now)
        })
    }

    async fn publish_own(&mut self, input: &DiscoveryInput, config: &DiscoveryConfig) -> Result<()> {
        let key = config.object_key(&input.own_id);
        let record = PresenceRecord::new(
            input.own_id.clone(),
            input.own_address.clone(),
            self.clock.now_millis(),
        )?;

        self.storage.put(&key, &record.encode()).await?;
        debug!("Updated own presence record '{}'.", key);
        self.own_record = Some(OwnRecordHandle { key, record });
        Ok(())
    }

    async fn list_peers(&self, config: &DiscoveryConfig) -> Result<Vec<ClusterNodeAddress>> {
        let keys = self.storage.list_by_prefix(&config.file_prefix).await?;

        let mut fetched = Vec::with_capacity(keys.len());
        for key in keys {
            match self.storage.get(&key).await {
                Ok(content) => fetched.push(FetchedObject { key, content }),
                Err(e) => warn!("An error occurred while downloading a presence record. {}", e),
            }
        }

        let plan = plan_peers(
            fetched,
            config.file_expiration_secs,
            self.clock.now_millis(),
        );
        for (key, reason) in &plan.skipped {
            debug!("Skipping presence record '{}': {}.", key, reason);
        }
        self.apply_plan(&plan).await;
        Ok(plan.live_addresses())
    }

    /// Delete expired records. Best effort; a failed delete is retried next cycle by
    /// whichever node notices the record again.
    async fn apply_plan(&self, plan: &PeerPlan) {
        for (key, record) in &plan.expired {
            debug!(
                "Presence record of node {} is expired. Record will be deleted.",
                record.node_id()
            );
            match self.storage.delete(key).await {
                Ok(()) => {}
                Err(DiscoveryError::NotFound { .. }) => {
                    debug!("Expired presence record '{}' was already removed.", key)
                }
                Err(e) => warn!("Could not delete expired presence record '{}'. {}", key, e),
            }
        }
    }

    fn fallback_nodes(&self) -> Option<Vec<ClusterNodeAddress>> {
        match self.unavailable_policy {
            UnavailablePolicy::Skip => None,
            UnavailablePolicy::LastKnown => self.last_known.clone(),
            UnavailablePolicy::Empty => Some(Vec::new()),
        }
    }
}
