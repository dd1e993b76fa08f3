//! Discovery protocol parameters and where they are loaded from.
//!
//! The parameters are re-read on every `init`/`reload` so an operator can retarget
//! the store or retune the intervals without restarting the node.
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod reader;

pub use reader::ConfigReader;

use crate::config_error;
use crate::error::Result;
use crate::storage::connector::FILE_SCHEME;
use crate::storage::fs::is_valid_name;

pub const DEFAULT_CONTAINER_NAME: &str = "hivemq-discovery";
pub const DEFAULT_FILE_PREFIX: &str = "hivemq-node";
pub const DEFAULT_FILE_EXPIRATION_SECS: u64 = 360;
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 180;

/// Validated discovery parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub connection_string: String,
    pub container_name: String,
    pub file_prefix: String,
    pub file_expiration_secs: u64,
    pub update_interval_secs: u64,
}

/// On-disk shape; every key is optional so defaults and validation happen in one place.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawDiscoveryConfig {
    connection_string: Option<String>,
    container_name: Option<String>,
    file_prefix: Option<String>,
    file_expiration: Option<i64>,
    update_interval: Option<i64>,
}

impl DiscoveryConfig {
    /// Build a config and check it, for callers that do not go through a file
    pub fn new(
        connection_string: impl Into<String>,
        container_name: impl Into<String>,
        file_prefix: impl Into<String>,
        file_expiration_secs: u64,
        update_interval_secs: u64,
    ) -> Result<Self> {
        let config = Self {
            connection_string: connection_string.into(),
            container_name: container_name.into(),
            file_prefix: file_prefix.into(),
            file_expiration_secs,
            update_interval_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawDiscoveryConfig = toml::from_str(content)?;

        let file_expiration = raw
            .file_expiration
            .map_or(Ok(DEFAULT_FILE_EXPIRATION_SECS), |v| {
                non_negative("file-expiration", v)
            })?;
        let update_interval = raw
            .update_interval
            .map_or(Ok(DEFAULT_UPDATE_INTERVAL_SECS), |v| {
                non_negative("update-interval", v)
            })?;

        let config = Self {
            connection_string: raw.connection_string.unwrap_or_default(),
            container_name: raw
                .container_name
                .unwrap_or_else(|| DEFAULT_CONTAINER_NAME.to_string()),
            file_prefix: raw
                .file_prefix
                .unwrap_or_else(|| DEFAULT_FILE_PREFIX.to_string()),
            file_expiration_secs: file_expiration,
            update_interval_secs: update_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Both intervals zero disables the heartbeat entirely. Otherwise both must be set and
    /// the update interval must be strictly shorter than the expiration window, or nodes
    /// would evict records that are still being refreshed.
    pub fn validate(&self) -> Result<()> {
        if self.connection_string.trim().is_empty() {
            return Err(config_error!("the connection string is empty"));
        }
        if self.container_name.trim().is_empty() {
            return Err(config_error!("the container name is empty"));
        }
        if self.targets_file_store() {
            // keys are prefix + node id, so the prefix decides whether a key is hidden
            if !is_valid_name(&self.container_name) {
                return Err(config_error!(
                    "container name '{}' cannot be used with a file:// target",
                    self.container_name
                ));
            }
            if !self.file_prefix.is_empty() && !is_valid_name(&self.file_prefix) {
                return Err(config_error!(
                    "file prefix '{}' cannot be used with a file:// target",
                    self.file_prefix
                ));
            }
        }

        let (update, expiration) = (self.update_interval_secs, self.file_expiration_secs);
        if update == 0 && expiration == 0 {
            return Ok(());
        }
        if update == expiration {
            return Err(config_error!(
                "the update interval is the same as the file expiration ({}s)",
                update
            ));
        }
        if update == 0 {
            return Err(config_error!(
                "the update interval is deactivated but the file expiration is set"
            ));
        }
        if expiration == 0 {
            return Err(config_error!(
                "the file expiration is deactivated but the update interval is set"
            ));
        }
        if update > expiration {
            return Err(config_error!(
                "the update interval ({}s) is larger than the file expiration ({}s)",
                update,
                expiration
            ));
        }
        Ok(())
    }

    fn targets_file_store(&self) -> bool {
        self.connection_string
            .trim()
            .to_ascii_lowercase()
            .starts_with(&format!("{}:", FILE_SCHEME))
    }

    /// Storage key of a node's presence record
    pub fn object_key(&self, node_id: &str) -> String {
        format!("{}{}", self.file_prefix, node_id)
    }
}

fn non_negative(key: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| config_error!("{} must not be negative, got {}", key, value))
}

/// Somewhere a fresh [`DiscoveryConfig`] can be loaded from on each cycle
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self) -> Result<DiscoveryConfig>;
}

/// In-memory config source; swapping or clearing the value simulates an operator edit.
#[derive(Clone, Debug, Default)]
pub struct StaticConfigSource {
    config: Arc<RwLock<Option<DiscoveryConfig>>>,
}

impl StaticConfigSource {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(Some(config))),
        }
    }

    pub async fn set(&self, config: DiscoveryConfig) {
        *self.config.write().await = Some(config);
    }

    pub async fn clear(&self) {
        *self.config.write().await = None;
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn load(&self) -> Result<DiscoveryConfig> {
        let config = self
            .config
            .read()
            .await
            .clone()
            .ok_or_else(|| config_error!("no configuration available"))?;
        config.validate()?;
        Ok(config)
    }
}
