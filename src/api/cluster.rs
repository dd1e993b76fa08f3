use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::agent::SharedStatus;
use crate::error::{DiscoveryError, Result};
use crate::record::ClusterNodeAddress;

/// Member list delivered by the last discovery cycle
#[derive(Debug, Deserialize, Serialize)]
pub struct NodesResponse {
    pub node_id: String,
    pub nodes: Vec<ClusterNodeAddress>,
    pub reload_interval_secs: u64,
}

/// This node's own presence
#[derive(Debug, Deserialize, Serialize)]
pub struct SelfResponse {
    pub node_id: String,
    pub address: Option<ClusterNodeAddress>,
    pub published: bool,
    pub cycles: u64,
}

#[instrument(skip(state), level = "debug")]
pub async fn nodes(State(state): State<SharedStatus>) -> Result<Json<NodesResponse>> {
    let status = state.read().await;
    if status.cycles == 0 {
        return Err(DiscoveryError::NotReady(
            "no discovery cycle has completed".to_string(),
        ));
    }
    Ok(Json(NodesResponse {
        node_id: status.node_id.clone(),
        nodes: status.nodes.clone(),
        reload_interval_secs: status.reload_interval_secs,
    }))
}

#[instrument(skip(state), level = "debug")]
pub async fn own_node(State(state): State<SharedStatus>) -> Json<SelfResponse> {
    let status = state.read().await;
    Json(SelfResponse {
        node_id: status.node_id.clone(),
        address: status.own_address.clone(),
        published: status.published,
        cycles: status.cycles,
    })
}
