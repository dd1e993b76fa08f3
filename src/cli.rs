//! CLI for this application
//!
use std::path::PathBuf;

use crate::settings;

#[derive(Clone, Debug, clap::Parser)]
#[command(name = settings::APP_NAME, version = settings::APP_VERSION)]
pub struct Cli {
    // Server listen address
    #[clap(
        long,
        default_value = "0.0.0.0",
        env("BLOBDISCO_LISTEN_ADDRESS"),
        help = "IP Address to listen on"
    )]
    pub listen_address: String,

    // HTTP API listen port
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_HTTP,
        env("BLOBDISCO_HTTP_LISTEN_PORT"),
        help = "Port to bind the status API server to"
    )]
    pub listen_port: u16,

    // Identity published to the container
    #[clap(
        long,
        env("BLOBDISCO_NODE_ID"),
        help = "Unique node id. Derived from the cluster address if omitted"
    )]
    pub node_id: Option<String>,

    // Address advertised to peers
    #[clap(
        long,
        default_value = "127.0.0.1",
        env("BLOBDISCO_CLUSTER_HOST"),
        help = "Host peers use to reach this node"
    )]
    pub cluster_host: String,

    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_CLUSTER,
        env("BLOBDISCO_CLUSTER_PORT"),
        help = "Cluster transport port peers use to reach this node"
    )]
    pub cluster_port: u16,

    // Folder holding the discovery config file
    #[clap(
        long,
        default_value = ".",
        env("BLOBDISCO_HOME"),
        help = "Home folder; the discovery file is read from <home>/conf/config.toml"
    )]
    pub home: PathBuf,

    #[clap(
        long,
        default_value = "keep-last-valid",
        env("BLOBDISCO_RELOAD_POLICY"),
        help = "reload-policy: 'strict' or 'keep-last-valid'"
    )]
    pub reload_policy: settings::ConfigReloadPolicy,

    #[clap(
        long,
        default_value = "skip",
        env("BLOBDISCO_UNAVAILABLE_POLICY"),
        help = "unavailable-policy: 'skip', 'last-known', or 'empty'"
    )]
    pub unavailable_policy: settings::UnavailablePolicy,

    // Fallback cadence when the discovery file disables updates
    #[clap(
        long,
        default_value = settings::DEFAULT_RELOAD_SECS,
        env("BLOBDISCO_DEFAULT_RELOAD_SECONDS"),
        help = "Seconds between reloads when update-interval is 0"
    )]
    pub default_reload_seconds: u64,
}

impl Cli {
    pub fn into_settings(self) -> settings::Settings {
        settings::Settings {
            listen_address: self.listen_address,
            listen_port: self.listen_port,
            node_id: self.node_id,
            cluster_host: self.cluster_host,
            cluster_port: self.cluster_port,
            home: self.home,
            reload_policy: self.reload_policy,
            unavailable_policy: self.unavailable_policy,
            default_reload_secs: self.default_reload_seconds,
        }
    }
}
