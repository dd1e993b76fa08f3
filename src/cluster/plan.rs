//! Classifying fetched peer records before anything is deleted
use crate::record::{ClusterNodeAddress, PresenceRecord};

/// A presence object as read from the store
#[derive(Clone, Debug)]
pub struct FetchedObject {
    pub key: String,
    pub content: String,
}

impl FetchedObject {
    pub fn new(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerVerdict {
    Live(PresenceRecord),
    Expired(PresenceRecord),
    Empty,
    Undecodable(String),
}

pub fn classify(content: &str, expiration_secs: u64, now_millis: i64) -> PeerVerdict {
    if content.trim().is_empty() {
        return PeerVerdict::Empty;
    }
    match PresenceRecord::try_decode(content) {
        Ok(record) if record.is_expired(expiration_secs, now_millis) => PeerVerdict::Expired(record),
        Ok(record) => PeerVerdict::Live(record),
        Err(e) => PeerVerdict::Undecodable(e.to_string()),
    }
}

/// Outcome of one listing round; each list keeps the store's listing order
#[derive(Clone, Debug, Default)]
pub struct PeerPlan {
    pub live: Vec<(String, PresenceRecord)>,
    pub expired: Vec<(String, PresenceRecord)>,
    /// Key and reason for objects that were empty or failed to decode
    pub skipped: Vec<(String, String)>,
}

impl PeerPlan {
    pub fn live_addresses(&self) -> Vec<ClusterNodeAddress> {
        self.live
            .iter()
            .map(|(_, record)| record.address().clone())
            .collect()
    }

    pub fn expired_keys(&self) -> impl Iterator<Item = &str> {
        self.expired.iter().map(|(key, _)| key.as_str())
    }
}

pub fn plan_peers(
    objects: impl IntoIterator<Item = FetchedObject>,
    expiration_secs: u64,
    now_millis: i64,
) -> PeerPlan {
    let mut plan = PeerPlan::default();
    for object in objects {
        match classify(&object.content, expiration_secs, now_millis) {
            PeerVerdict::Live(record) => plan.live.push((object.key, record)),
            PeerVerdict::Expired(record) => plan.expired.push((object.key, record)),
            PeerVerdict::Empty => plan
                .skipped
                .push((object.key, "object has no content".to_string())),
            PeerVerdict::Undecodable(reason) => plan.skipped.push((object.key, reason)),
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn encoded(id: &str, port: u16, created: i64) -> String {
        PresenceRecord::new(id, ClusterNodeAddress::new("10.0.0.1", port), created)
            .unwrap()
            .encode()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("", 10, NOW), PeerVerdict::Empty);
        assert!(matches!(
            classify("garbage", 10, NOW),
            PeerVerdict::Undecodable(_)
        ));
        assert!(matches!(
            classify(&encoded("a", 1, NOW), 10, NOW),
            PeerVerdict::Live(_)
        ));
        assert!(matches!(
            classify(&encoded("a", 1, NOW - 10_001), 10, NOW),
            PeerVerdict::Expired(_)
        ));
        // disabled expiration keeps ancient records alive
        assert!(matches!(
            classify(&encoded("a", 1, 0), 0, NOW),
            PeerVerdict::Live(_)
        ));
    }

    #[test]
    fn test_plan_preserves_listing_order() {
        let objects = vec![
            FetchedObject::new("node-c", encoded("c", 3, NOW)),
            FetchedObject::new("node-old", encoded("old", 9, NOW - 60_000)),
            FetchedObject::new("node-a", encoded("a", 1, NOW)),
            FetchedObject::new("node-bad", "bm9wZQ=="),
            FetchedObject::new("node-empty", "  "),
        ];

        let plan = plan_peers(objects, 30, NOW);
        let ports: Vec<u16> = plan.live_addresses().iter().map(|a| a.port).collect();
        assert_eq!(ports, vec![3, 1]);
        assert_eq!(plan.expired_keys().collect::<Vec<_>>(), vec!["node-old"]);
        let skipped: Vec<&str> = plan.skipped.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(skipped, vec!["node-bad", "node-empty"]);
    }
}
