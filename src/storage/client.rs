use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use super::{BlobStore, StoreConnector, StoreError};
use crate::config::{ConfigSource, DiscoveryConfig};
use crate::config_error;
use crate::error::{DiscoveryError, Result};
use crate::settings::ConfigReloadPolicy;
use crate::storage_error;

/// Storage adapter used by the membership directory.
///
/// Holds the last successfully loaded configuration and a store handle derived from it.
/// Every backend failure leaves here as a [`DiscoveryError`] carrying the operation and
/// key involved.
pub struct StorageClient {
    config_source: Arc<dyn ConfigSource>,
    connector: StoreConnector,
    reload_policy: ConfigReloadPolicy,
    config: Option<DiscoveryConfig>,
    store: Option<Arc<dyn BlobStore>>,
    connected_to: Option<String>,
}

impl StorageClient {
    pub fn new(
        config_source: Arc<dyn ConfigSource>,
        connector: StoreConnector,
        reload_policy: ConfigReloadPolicy,
    ) -> Self {
        Self {
            config_source,
            connector,
            reload_policy,
            config: None,
            store: None,
            connected_to: None,
        }
    }

    /// Reload the configuration and point the store handle at its connection target.
    pub async fn refresh_connection(&mut self) -> Result<DiscoveryConfig> {
        match self.config_source.load().await {
            Ok(config) => {
                self.config = Some(config);
            }
            Err(err) => match (self.reload_policy, self.config.is_some()) {
                (ConfigReloadPolicy::KeepLastValid, true) => {
                    warn!(
                        "Discovery configuration couldn't be loaded ({}). Using last valid configuration.",
                        err
                    );
                }
                (ConfigReloadPolicy::KeepLastValid, false) => {
                    return Err(config_error!(
                        "discovery configuration couldn't be loaded: {}",
                        err
                    ));
                }
                (ConfigReloadPolicy::Strict, _) => return Err(err),
            },
        }

        let config = self
            .config
            .clone()
            .ok_or_else(|| config_error!("no discovery configuration loaded"))?;

        if self.store.is_none() || self.connected_to.as_deref() != Some(config.connection_string.as_str())
        {
            let store = self.connector.connect(&config.connection_string).await?;
            if self.connected_to.is_some() {
                info!(
                    "Storage connection target changed. Connected to container '{}' with the new target.",
                    config.container_name
                );
            }
            self.store = Some(store);
            self.connected_to = Some(config.connection_string.clone());
        }
        Ok(config)
    }

    fn handle(&self) -> Result<(&Arc<dyn BlobStore>, &str)> {
        match (&self.store, &self.config) {
            (Some(store), Some(config)) => Ok((store, config.container_name.as_str())),
            _ => Err(config_error!("storage connection has not been established")),
        }
    }

    pub async fn container_exists(&self) -> Result<bool> {
        let (store, container) = self.handle()?;
        store
            .container_exists(container)
            .await
            .map_err(|e| storage_error!("container existence check", container, e))
    }

    /// Creating a container another node created first counts as success.
    pub async fn create_container_if_absent(&self) -> Result<()> {
        let (store, container) = self.handle()?;
        match store.create_container(container).await {
            Ok(()) => {
                trace!("Created container '{}'.", container);
                Ok(())
            }
            Err(StoreError::AlreadyExists) => {
                debug!(
                    "Cannot create container '{}' because the container already exists.",
                    container
                );
                Ok(())
            }
            Err(e) => Err(storage_error!("container creation", container, e)),
        }
    }

    pub async fn put(&self, key: &str, content: &str) -> Result<()> {
        let (store, container) = self.handle()?;
        store
            .put_object(container, key, content.as_bytes())
            .await
            .map_err(|e| map_store_error("upload", key, e))
    }

    pub async fn get(&self, key: &str) -> Result<String> {
        let (store, container) = self.handle()?;
        let body = store
            .get_object(container, key)
            .await
            .map_err(|e| map_store_error("download", key, e))?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let (store, container) = self.handle()?;
        store
            .delete_object(container, key)
            .await
            .map_err(|e| map_store_error("delete", key, e))
    }

    pub async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let (store, container) = self.handle()?;
        store
            .list_objects(container, prefix)
            .await
            .map_err(|e| map_store_error("listing", prefix, e))
    }
}

fn map_store_error(operation: &'static str, key: &str, err: StoreError) -> DiscoveryError {
    match err {
        StoreError::NotFound => DiscoveryError::NotFound {
            operation,
            key: key.to_string(),
        },
        other => storage_error!(operation, key, other),
    }
}
