//! Agent settings and discovery policies
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::time::Duration;

use crate::record::ClusterNodeAddress;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const STANDARD_PORT_HTTP: u16 = 8420;
pub const DEFAULT_PORT_HTTP: &str = "8420";
pub const STANDARD_PORT_CLUSTER: u16 = 7800;
pub const DEFAULT_PORT_CLUSTER: &str = "7800";
/// Used when the discovery file disables the update interval
pub const DEFAULT_RELOAD_SECS: &str = "60";

/// What to do when a reload cannot load a valid discovery configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfigReloadPolicy {
    /// Fail the cycle
    Strict,
    /// Keep running on the last configuration that did load
    #[default]
    KeepLastValid,
}

impl std::fmt::Display for ConfigReloadPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigReloadPolicy::Strict => write!(f, "strict"),
            ConfigReloadPolicy::KeepLastValid => write!(f, "keep-last-valid"),
        }
    }
}

impl std::str::FromStr for ConfigReloadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ConfigReloadPolicy::Strict),
            "keep-last-valid" => Ok(ConfigReloadPolicy::KeepLastValid),
            _ => Err(format!("Invalid config reload policy: {}", s)),
        }
    }
}

/// Which node list to hand the host when storage cannot be reached
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnavailablePolicy {
    /// Deliver nothing; the host keeps whatever it had
    #[default]
    Skip,
    /// Deliver the last list this node computed
    LastKnown,
    /// Deliver an empty list
    Empty,
}

impl std::fmt::Display for UnavailablePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailablePolicy::Skip => write!(f, "skip"),
            UnavailablePolicy::LastKnown => write!(f, "last-known"),
            UnavailablePolicy::Empty => write!(f, "empty"),
        }
    }
}

impl std::str::FromStr for UnavailablePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(UnavailablePolicy::Skip),
            "last-known" => Ok(UnavailablePolicy::LastKnown),
            "empty" => Ok(UnavailablePolicy::Empty),
            _ => Err(format!("Invalid unavailable policy: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    // HTTP status API listen address
    pub listen_address: String,

    // HTTP status API listen port
    pub listen_port: u16,

    // Explicit node id; derived from the advertised address when absent
    pub node_id: Option<String>,

    // Address peers use to reach this node's cluster transport
    pub cluster_host: String,
    pub cluster_port: u16,

    // Folder holding conf/config.toml
    pub home: PathBuf,

    pub reload_policy: ConfigReloadPolicy,
    pub unavailable_policy: UnavailablePolicy,

    // Reload cadence when the discovery file reports an update interval of 0
    pub default_reload_secs: u64,
}

impl Settings {
    pub fn node_id(&self) -> String {
        match &self.node_id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => generate_node_id(&self.cluster_host, self.cluster_port),
        }
    }

    pub fn cluster_address(&self) -> ClusterNodeAddress {
        ClusterNodeAddress::new(self.cluster_host.clone(), self.cluster_port)
    }

    pub fn default_reload_interval(&self) -> Duration {
        Duration::from_secs(self.default_reload_secs.max(1))
    }
}

/// Node id derived from the advertised address. The digest depends on the toolchain's
/// hasher, so pass `--node-id` when ids must survive an upgrade.
pub fn generate_node_id(host: &str, port: u16) -> String {
    let mut s = DefaultHasher::new();
    host.hash(&mut s);
    port.hash(&mut s);
    format!("{:016X}", s.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(node_id: Option<&str>) -> Settings {
        Settings {
            listen_address: "127.0.0.1".to_string(),
            listen_port: STANDARD_PORT_HTTP,
            node_id: node_id.map(str::to_string),
            cluster_host: "10.0.0.4".to_string(),
            cluster_port: STANDARD_PORT_CLUSTER,
            home: PathBuf::from("."),
            reload_policy: ConfigReloadPolicy::default(),
            unavailable_policy: UnavailablePolicy::default(),
            default_reload_secs: 0,
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "strict".parse::<ConfigReloadPolicy>().unwrap(),
            ConfigReloadPolicy::Strict
        );
        assert_eq!(
            "Keep-Last-Valid".parse::<ConfigReloadPolicy>().unwrap(),
            ConfigReloadPolicy::KeepLastValid
        );
        assert_eq!(
            "last-known".parse::<UnavailablePolicy>().unwrap(),
            UnavailablePolicy::LastKnown
        );
        assert!("sometimes".parse::<UnavailablePolicy>().is_err());
        assert_eq!(UnavailablePolicy::Empty.to_string(), "empty");
    }

    #[test]
    fn test_node_id() {
        assert_eq!(settings(Some("node-1")).node_id(), "node-1");
        let derived = settings(None).node_id();
        assert_eq!(derived.len(), 16);
        assert_eq!(derived, settings(Some("  ")).node_id());
        assert_ne!(derived, generate_node_id("10.0.0.5", STANDARD_PORT_CLUSTER));
    }

    #[test]
    fn test_reload_interval_never_zero() {
        assert_eq!(settings(None).default_reload_interval(), Duration::from_secs(1));
    }
}
