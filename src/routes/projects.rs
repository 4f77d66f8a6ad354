//! Project REST handlers
//!
//! Create, fetch, and contribute mirror the WebSocket path: one validation
//! pipeline through the engine, full snapshots on the wire.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{error_response, json_response, read_json_body};
use crate::project::{is_valid_project_id, Project};
use crate::server::AppState;
use crate::sweeper;
use crate::types::{DepotError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub template_key: String,
    /// Optional caller-chosen id (uppercase letters and digits); a UUID is
    /// generated when absent
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributeRequest {
    pub resource: String,
    pub amount: i64,
    #[serde(default)]
    pub contributor_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateInfo<'a> {
    key: &'a str,
    display_name: &'a str,
    required: &'a BTreeMap<String, u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SweepResponse {
    removed: usize,
    active_projects: usize,
}

/// GET /api/templates - catalog listing, largest template first
pub fn list_templates(state: &AppState) -> Response<Full<Bytes>> {
    let templates: Vec<TemplateInfo> = state
        .catalog
        .list()
        .iter()
        .map(|t| TemplateInfo {
            key: t.key,
            display_name: t.display_name,
            required: &t.required,
        })
        .collect();
    json_response(StatusCode::OK, &templates)
}

/// POST /api/projects - create a project from a template
pub async fn create_project(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    match try_create_project(req, state).await {
        Ok(project) => json_response(StatusCode::OK, &project),
        Err(e) => error_response(&e),
    }
}

async fn try_create_project(req: Request<Incoming>, state: Arc<AppState>) -> Result<Project> {
    let body: CreateProjectRequest = read_json_body(req).await?;

    let template = state
        .catalog
        .get(&body.template_key)
        .ok_or_else(|| DepotError::UnknownTemplate(body.template_key.clone()))?;

    let id = match body.project_id {
        Some(id) => {
            if !is_valid_project_id(&id) {
                return Err(DepotError::BadRequest(
                    "Project id may only contain uppercase letters and digits".to_string(),
                ));
            }
            id
        }
        None => Uuid::new_v4().to_string(),
    };

    state.store.create(Project::from_template(id, template)).await
}

/// GET /api/projects/{id} - current snapshot
pub async fn get_project(state: Arc<AppState>, id: &str) -> Response<Full<Bytes>> {
    match state.store.get(id).await {
        Ok(project) => json_response(StatusCode::OK, &project),
        Err(e) => error_response(&e),
    }
}

/// POST /api/projects/{id}/contributions - contribute toward one resource
///
/// On success the updated snapshot is returned here and broadcast to every
/// feed subscriber by the engine.
pub async fn contribute(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<Full<Bytes>> {
    let body: ContributeRequest = match read_json_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };

    match state
        .engine
        .apply(id, &body.resource, body.amount, body.contributor_name.as_deref())
        .await
    {
        Ok(project) => json_response(StatusCode::OK, &project),
        Err(e) => error_response(&e),
    }
}

/// GET /admin/projects - all live projects
pub async fn list_projects(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.store.list().await {
        Ok(projects) => json_response(StatusCode::OK, &projects),
        Err(e) => error_response(&e),
    }
}

/// POST /admin/sweep - run a retention sweep now
pub async fn run_sweep(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let removed = match sweeper::sweep(state.store.as_ref(), state.args.retention()).await {
        Ok(removed) => removed,
        Err(e) => return error_response(&e),
    };
    let active_projects = match state.store.list().await {
        Ok(projects) => projects.len(),
        Err(e) => return error_response(&e),
    };
    json_response(
        StatusCode::OK,
        &SweepResponse {
            removed,
            active_projects,
        },
    )
}
