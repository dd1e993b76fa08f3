use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::{ConfigSource, DiscoveryConfig};
use crate::config_error;
use crate::error::Result;

/// Current location of the discovery file, relative to the extension home folder
pub const CONFIG_PATH: &str = "conf/config.toml";
/// Location used by older releases; still honoured when it is the only file present
pub const LEGACY_CONFIG_PATH: &str = "blobDiscovery.toml";

/// Reads the discovery file from an extension home folder
#[derive(Clone, Debug)]
pub struct ConfigReader {
    home: PathBuf,
}

impl ConfigReader {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Prefer the current location, fall back to the legacy one if only it exists.
    pub async fn resolve(&self) -> PathBuf {
        let current = self.home.join(CONFIG_PATH);
        if is_file(&current).await {
            return current;
        }
        let legacy = self.home.join(LEGACY_CONFIG_PATH);
        if is_file(&legacy).await {
            warn!(
                "Using legacy configuration file '{}'. Please move it to '{}'.",
                legacy.display(),
                current.display()
            );
            return legacy;
        }
        current
    }

    pub async fn read_configuration(&self) -> Result<DiscoveryConfig> {
        let path = self.resolve().await;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(config_error!(
                    "could not find '{}'; please verify that the file is located under '{}'",
                    path.display(),
                    self.home.display()
                ));
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(config_error!(
                    "could not read '{}'; please verify the process has read permissions",
                    path.display()
                ));
            }
            Err(e) => {
                return Err(config_error!(
                    "error while reading '{}': {}",
                    path.display(),
                    e
                ));
            }
        };

        debug!("Reading discovery configuration '{}'.", path.display());
        let config = DiscoveryConfig::from_toml_str(&content)
            .map_err(|e| config_error!("'{}' is not valid: {}", path.display(), e))?;
        trace!("Read discovery configuration '{}' successfully.", path.display());
        Ok(config)
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[async_trait]
impl ConfigSource for ConfigReader {
    async fn load(&self) -> Result<DiscoveryConfig> {
        self.read_configuration().await
    }
}
