//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling; WebSocket joins ride on
//! `with_upgrades`. Routing is a plain match over method and path.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::catalog::CatalogRegistry;
use crate::config::Args;
use crate::engine::ContributionEngine;
use crate::hub::BroadcastHub;
use crate::routes;
use crate::server::websocket;
use crate::store::ProjectStore;
use crate::sweeper;
use crate::types::{DepotError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn ProjectStore>,
    pub catalog: Arc<CatalogRegistry>,
    pub engine: Arc<ContributionEngine>,
    pub hub: Arc<BroadcastHub>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the catalog, engine, and hub around the chosen store
    pub fn new(args: Args, store: Arc<dyn ProjectStore>) -> Self {
        let catalog = Arc::new(CatalogRegistry::builtin());
        let hub = Arc::new(BroadcastHub::new(args.broadcast_capacity));
        let engine = Arc::new(ContributionEngine::new(
            Arc::clone(&store),
            Arc::clone(&hub),
        ));
        Self {
            args,
            store,
            catalog,
            engine,
            hub,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen)
        .await
        .map_err(|e| DepotError::Internal(format!("bind {} failed: {}", state.args.listen, e)))?;

    info!(
        "Depot listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    let _sweeper = sweeper::spawn_sweep_task(
        Arc::clone(&state.store),
        state.args.sweep_interval(),
        state.args.retention(),
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(&state),

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        // Template catalog
        (Method::GET, "/api/templates") => routes::list_templates(&state),

        // Create a project from a template
        (Method::POST, "/api/projects") => routes::create_project(req, Arc::clone(&state)).await,

        // Project snapshot
        (Method::GET, p) if p.starts_with("/api/projects/") => {
            match single_segment(p, "/api/projects/") {
                Some(id) => routes::get_project(Arc::clone(&state), id).await,
                None => not_found_response(p),
            }
        }

        // Contribute via REST (same validation as the WebSocket path)
        (Method::POST, p)
            if p.starts_with("/api/projects/") && p.ends_with("/contributions") =>
        {
            let id = p
                .strip_prefix("/api/projects/")
                .and_then(|s| s.strip_suffix("/contributions"))
                .unwrap_or("");
            routes::contribute(req, Arc::clone(&state), id).await
        }

        // Live project feed
        (Method::GET, p) if p.starts_with("/ws/projects/") => {
            match single_segment(p, "/ws/projects/") {
                Some(id) if hyper_tungstenite::is_upgrade_request(&req) => {
                    websocket::handle_project_upgrade(Arc::clone(&state), req, id).await
                }
                Some(_) => bad_request_response("WebSocket upgrade required for /ws/projects/{id}"),
                None => not_found_response(p),
            }
        }

        // Operator visibility and manual retention sweep
        (Method::GET, "/admin/projects") => routes::list_projects(Arc::clone(&state)).await,
        (Method::POST, "/admin/sweep") => routes::run_sweep(Arc::clone(&state)).await,

        _ => not_found_response(&path),
    };

    Ok(response)
}

/// Extract the single path segment after `prefix`, rejecting nested paths
fn single_segment<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}

fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "Content-Type")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(format!(
            r#"{{"error": "Not found: {}"}}"#,
            path
        ))))
        .unwrap()
}

fn bad_request_response(message: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(format!(
            r#"{{"error": "{}"}}"#,
            message
        ))))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_segment() {
        assert_eq!(single_segment("/api/projects/P1", "/api/projects/"), Some("P1"));
        assert_eq!(single_segment("/api/projects/", "/api/projects/"), None);
        assert_eq!(single_segment("/api/projects/P1/x", "/api/projects/"), None);
        assert_eq!(single_segment("/other", "/api/projects/"), None);
    }
}
