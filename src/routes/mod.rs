//! HTTP route handlers

pub mod health;
pub mod projects;

pub use health::{health_check, version_info};
pub use projects::{
    contribute, create_project, get_project, list_projects, list_templates, run_sweep,
};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{DepotError, Result};

/// JSON response with CORS headers
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(body)
        .unwrap_or_else(|_| r#"{"error": "serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Error response carrying the stable error code and, for over-contribution,
/// the remaining capacity
pub(crate) fn error_response(err: &DepotError) -> Response<Full<Bytes>> {
    let mut body = serde_json::json!({
        "error": err.to_string(),
        "code": err.code(),
    });
    if let Some(remaining) = err.remaining() {
        body["remaining"] = remaining.into();
    }
    json_response(err.status_code(), &body)
}

/// Collect and deserialize a JSON request body
pub(crate) async fn read_json_body<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T> {
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| DepotError::BadRequest(format!("body read failed: {}", e)))?
        .to_bytes();
    serde_json::from_slice(&bytes)
        .map_err(|e| DepotError::BadRequest(format!("invalid JSON body: {}", e)))
}
