//! Presence records: one node's self-published claim to cluster membership.
//!
//! A record is stored as the base64 form of
//! `version § created_at_millis § node_id § host § port`.
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use crate::error::Result;
use crate::record_error;

/// Schema marker written into every record; records carrying any other value are ignored
pub const CONTENT_VERSION: &str = "4";
/// Field delimiter; node ids and hosts never contain it
pub const CONTENT_SEPARATOR: char = '§';
const FIELD_COUNT: usize = 5;

/// Address another node should use to reach this node's cluster transport
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct ClusterNodeAddress {
    pub host: String,
    pub port: u16,
}

impl ClusterNodeAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for ClusterNodeAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresenceRecord {
    node_id: String,
    address: ClusterNodeAddress,
    created_at_millis: i64,
}

impl PresenceRecord {
    pub fn new(
        node_id: impl Into<String>,
        address: ClusterNodeAddress,
        created_at_millis: i64,
    ) -> Result<Self> {
        let node_id = node_id.into();
        if node_id.trim().is_empty() {
            return Err(record_error!("node id must not be blank"));
        }
        if address.host.trim().is_empty() {
            return Err(record_error!("host of node {} must not be blank", node_id));
        }
        Ok(Self {
            node_id,
            address,
            created_at_millis,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn address(&self) -> &ClusterNodeAddress {
        &self.address
    }

    pub fn created_at_millis(&self) -> i64 {
        self.created_at_millis
    }

    pub fn is_expired(&self, window_secs: u64, now_millis: i64) -> bool {
        is_expired(self.created_at_millis, window_secs, now_millis)
    }

    pub fn encode(&self) -> String {
        let sep = CONTENT_SEPARATOR;
        let content = format!(
            "{}{sep}{}{sep}{}{sep}{}{sep}{}",
            CONTENT_VERSION,
            self.created_at_millis,
            self.node_id,
            self.address.host,
            self.address.port,
        );
        STANDARD.encode(content.as_bytes())
    }

    /// Decode a stored record, yielding `None` for anything malformed.
    ///
    /// # Panics
    /// If `content` is blank. Callers must skip empty objects before decoding.
    pub fn decode(content: &str) -> Option<Self> {
        assert!(
            !content.trim().is_empty(),
            "presence record content must not be blank"
        );
        Self::try_decode(content).ok()
    }

    /// Like [`PresenceRecord::decode`] but reports why a record was rejected.
    pub fn try_decode(content: &str) -> Result<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(record_error!("content is blank"));
        }
        let bytes = STANDARD
            .decode(content)
            .map_err(|e| record_error!("invalid base64: {}", e))?;
        let text = String::from_utf8(bytes).map_err(|e| record_error!("invalid utf-8: {}", e))?;

        let fields: Vec<&str> = text.split(CONTENT_SEPARATOR).collect();
        if fields.len() != FIELD_COUNT {
            return Err(record_error!(
                "expected {} fields, found {}",
                FIELD_COUNT,
                fields.len()
            ));
        }
        if let Some(pos) = fields.iter().position(|f| f.trim().is_empty()) {
            return Err(record_error!("field {} is blank", pos));
        }

        let (version, created_at, node_id, host, port) =
            (fields[0], fields[1], fields[2], fields[3], fields[4]);
        if version != CONTENT_VERSION {
            return Err(record_error!(
                "unsupported content version {} (expected {})",
                version,
                CONTENT_VERSION
            ));
        }
        let created_at_millis = created_at
            .parse::<i64>()
            .map_err(|_| record_error!("creation time '{}' is not a number", created_at))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| record_error!("port '{}' is not a valid port", port))?;

        Self::new(node_id, ClusterNodeAddress::new(host, port), created_at_millis)
    }
}

/// A record is stale once strictly more than `window_secs` have passed since it was written.
/// A window of zero disables expiration.
pub fn is_expired(created_at_millis: i64, window_secs: u64, now_millis: i64) -> bool {
    if window_secs == 0 {
        return false;
    }
    let window_millis = i64::try_from(window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    now_millis.saturating_sub(created_at_millis) > window_millis
}
