//! Live project WebSocket feed
//!
//! ## Protocol
//!
//! Connect: `ws://host/ws/projects/{id}`
//!
//! Messages (server -> client), tagged JSON:
//! - `project_data` - full snapshot, sent on join and after a lag resync
//! - `project_updated` - full snapshot after an accepted contribution
//! - `error` - request failure, delivered only to the offending connection
//! - `pong` - reply to a client `ping`
//!
//! Messages (client -> server):
//! - `contribute` - `{resource, amount, contributorName?}`
//! - `ping` - keep-alive
//!
//! A disconnect never cancels a contribution already handed to the engine;
//! it completes, persists, and reaches the remaining subscribers.

use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::engine::ANONYMOUS;
use crate::project::Project;
use crate::routes::error_response;
use crate::server::AppState;
use crate::types::{DepotError, Result};

/// WebSocket type after upgrade
type HyperWebSocket =
    hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>;

type WsSender = SplitSink<HyperWebSocket, WsMessage>;

/// Message sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full snapshot on join or resync
    ProjectData { project: Project },
    /// Full snapshot after an accepted contribution
    ProjectUpdated { project: Project },
    /// Failure answered to this connection only
    Error {
        message: String,
        code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        remaining: Option<u64>,
    },
    /// Keep-alive reply
    Pong { timestamp: String },
}

impl ServerMessage {
    fn from_error(err: &DepotError) -> Self {
        Self::Error {
            message: err.to_string(),
            code: err.code().to_string(),
            remaining: err.remaining(),
        }
    }
}

/// Message received from client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Contribute toward one resource
    Contribute {
        resource: String,
        amount: i64,
        #[serde(default, rename = "contributorName")]
        contributor_name: Option<String>,
    },
    /// Keep-alive ping
    Ping,
}

/// Handle WebSocket upgrade for a project feed
///
/// Joining a project that does not exist answers the requester with a 404
/// and touches no topic, so nothing can be broadcast.
pub async fn handle_project_upgrade(
    state: Arc<AppState>,
    req: Request<Incoming>,
    project_id: &str,
) -> Response<Full<Bytes>> {
    if let Err(e) = check_join(&state, project_id).await {
        return error_response(&e);
    }

    let (response, websocket) = match hyper_tungstenite::upgrade(req, None) {
        Ok(upgrade) => upgrade,
        Err(e) => {
            warn!("WebSocket upgrade failed for project {}: {}", project_id, e);
            return error_response(&DepotError::BadRequest(format!(
                "WebSocket upgrade failed: {}",
                e
            )));
        }
    };

    let project_id = project_id.to_string();
    tokio::spawn(async move {
        match websocket.await {
            Ok(ws) => {
                if let Err(e) = handle_project_connection(state, ws, project_id).await {
                    warn!("Project WebSocket error: {}", e);
                }
            }
            Err(e) => {
                error!("WebSocket connection failed: {}", e);
            }
        }
    });

    let (parts, _body) = response.into_parts();
    Response::from_parts(parts, Full::new(Bytes::new()))
}

/// Join precondition: the project must exist before the socket upgrades
///
/// A miss answers the requester alone and touches no topic, so a failed
/// join can never broadcast anything.
async fn check_join(state: &AppState, project_id: &str) -> Result<()> {
    state.store.get(project_id).await.map(|_| ())
}

/// Whether a queued update carries progress beyond an already-sent snapshot
///
/// Contributions only grow, so the total is a monotone progress counter; an
/// update at or below `seen_total` is already reflected in the snapshot.
fn supersedes(update: &Project, seen_total: u64) -> bool {
    update.total_contributed() > seen_total
}

/// Handle an established project feed connection
async fn handle_project_connection(
    state: Arc<AppState>,
    ws: HyperWebSocket,
    project_id: String,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (mut sender, mut receiver) = ws.split();

    info!(project = %project_id, "participant joined");

    // Subscribe before fetching the snapshot: anything published after this
    // point is queued, so the client never misses an update or sees a stale
    // join snapshot.
    let mut rx = state.hub.subscribe(&project_id);

    let project = match state.store.get(&project_id).await {
        Ok(project) => project,
        Err(e) => {
            // Swept between upgrade and join
            send_message(&mut sender, &ServerMessage::from_error(&e)).await?;
            let _ = sender.close().await;
            return Ok(());
        }
    };
    // Updates published in the subscribe-to-read window are already part of
    // this snapshot; the progress total lets the loop below drop them
    let mut seen_total = project.total_contributed();
    send_message(&mut sender, &ServerMessage::ProjectData { project }).await?;

    loop {
        tokio::select! {
            update = rx.recv() => {
                match update {
                    Ok(project) => {
                        if !supersedes(&project, seen_total) {
                            continue;
                        }
                        seen_total = project.total_contributed();
                        if send_message(&mut sender, &ServerMessage::ProjectUpdated { project })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Too slow for the buffer; resync with a fresh snapshot
                        // instead of replaying stale intermediate states
                        warn!(project = %project_id, skipped, "subscriber lagged, resyncing");
                        match state.store.get(&project_id).await {
                            Ok(project) => {
                                seen_total = project.total_contributed();
                                if send_message(
                                    &mut sender,
                                    &ServerMessage::ProjectData { project },
                                )
                                .await
                                .is_err()
                                {
                                    break;
                                }
                            }
                            Err(_) => break,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            frame = receiver.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_client_text(&state, &project_id, &text, &mut sender).await?;
                    }
                    Some(Ok(WsMessage::Close(_))) => break,
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = sender.send(WsMessage::Pong(data)).await;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
        }
    }

    // Dropping the receiver is the unsubscribe
    info!(project = %project_id, "participant disconnected");
    Ok(())
}

/// Handle one text frame from a participant
async fn handle_client_text(
    state: &AppState,
    project_id: &str,
    text: &str,
    sender: &mut WsSender,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(project = %project_id, "unparseable client message: {}", e);
            let err = DepotError::BadRequest(format!("invalid message: {}", e));
            send_message(sender, &ServerMessage::from_error(&err)).await?;
            return Ok(());
        }
    };

    match msg {
        ClientMessage::Contribute {
            resource,
            amount,
            contributor_name,
        } => {
            let contributor = contributor_name.as_deref().unwrap_or(ANONYMOUS);
            match state
                .engine
                .apply(project_id, &resource, amount, Some(contributor))
                .await
            {
                // Accepted: the update reaches this connection through the hub
                Ok(_) => {}
                Err(e) => {
                    send_message(sender, &ServerMessage::from_error(&e)).await?;
                }
            }
        }
        ClientMessage::Ping => {
            let pong = ServerMessage::Pong {
                timestamp: chrono::Utc::now().to_rfc3339(),
            };
            send_message(sender, &pong).await?;
        }
    }
    Ok(())
}

/// Serialize and send one server message
async fn send_message(
    sender: &mut WsSender,
    msg: &ServerMessage,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let json = serde_json::to_string(msg)?;
    sender.send(WsMessage::Text(json)).await?;
    Ok(())
}
