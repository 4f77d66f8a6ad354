//! Health and version endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::json_response;
use crate::server::AppState;

#[derive(Serialize)]
struct HealthResponse {
    healthy: bool,
    version: &'static str,
    uptime: u64,
    timestamp: String,
    #[serde(rename = "nodeId")]
    node_id: String,
    storage: String,
    #[serde(rename = "liveTopics")]
    live_topics: usize,
}

#[derive(Serialize)]
struct VersionResponse {
    version: &'static str,
    commit: &'static str,
    build_time: &'static str,
    service: &'static str,
}

/// Liveness probe
pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        node_id: state.args.node_id.to_string(),
        storage: state.args.storage.clone(),
        live_topics: state.hub.topic_count(),
    };
    json_response(StatusCode::OK, &response)
}

/// Version info for deployment verification
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "depot",
    };
    json_response(StatusCode::OK, &response)
}
