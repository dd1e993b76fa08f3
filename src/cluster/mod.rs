// Storage-backed cluster membership
pub mod directory;
pub mod plan;

pub use directory::{DiscoveryInput, DiscoveryOutput, MembershipDirectory, OwnRecordHandle};
pub use plan::{classify, plan_peers, FetchedObject, PeerPlan, PeerVerdict};
