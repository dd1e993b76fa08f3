use axum::Json;
use serde::Serialize;
use tracing::instrument;

use crate::settings::{APP_NAME, APP_VERSION};

pub async fn root() -> String {
    format!("{} {}: see {} for peers", APP_NAME, APP_VERSION, super::paths::cluster::NODES)
}

pub async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
pub struct AboutResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub record_version: &'static str,
}

#[instrument(level = "debug")]
pub async fn about() -> Json<AboutResponse> {
    Json(AboutResponse {
        name: APP_NAME,
        version: APP_VERSION,
        record_version: crate::record::CONTENT_VERSION,
    })
}
