//! File-backed project store
//!
//! One consolidated JSON index holding every project, rewritten on each
//! mutation via a temp file and rename so readers never observe a torn
//! write. A process-wide async mutex serializes all access: this is an
//! explicit single-writer constraint. Running multiple instances against the
//! same index is not safe; deployments needing that must front the index
//! with a store that offers real compare-and-swap.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Mutator, ProjectStore};
use crate::project::Project;
use crate::types::{DepotError, Result};

/// Durable store persisting all projects into a single JSON index
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (or prepare to create) the index at `path`
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(storage_err)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Index file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, Project>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| DepotError::StorageUnavailable(format!("corrupt index: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(storage_err(e)),
        }
    }

    async fn persist(&self, projects: &HashMap<String, Project>) -> Result<()> {
        let bytes = serde_json::to_vec(projects)
            .map_err(|e| DepotError::Internal(format!("index encode failed: {}", e)))?;

        // Write-then-rename keeps the index intact if we crash mid-write
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(storage_err)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(storage_err)
    }
}

fn storage_err(e: std::io::Error) -> DepotError {
    DepotError::StorageUnavailable(e.to_string())
}

#[async_trait]
impl ProjectStore for FileStore {
    async fn create(&self, project: Project) -> Result<Project> {
        let _guard = self.lock.lock().await;
        let mut projects = self.load().await?;
        if projects.contains_key(&project.id) {
            return Err(DepotError::AlreadyExists);
        }
        projects.insert(project.id.clone(), project.clone());
        self.persist(&projects).await?;
        debug!(project = %project.id, path = %self.path.display(), "project created");
        Ok(project)
    }

    async fn get(&self, id: &str) -> Result<Project> {
        let _guard = self.lock.lock().await;
        let projects = self.load().await?;
        projects.get(id).cloned().ok_or(DepotError::ProjectNotFound)
    }

    async fn update(&self, id: &str, mutate: Mutator) -> Result<Project> {
        let _guard = self.lock.lock().await;
        let mut projects = self.load().await?;
        let current = projects.get(id).ok_or(DepotError::ProjectNotFound)?;

        let mut next = current.clone();
        mutate(&mut next)?;
        projects.insert(id.to_string(), next.clone());
        self.persist(&projects).await?;
        Ok(next)
    }

    async fn list(&self) -> Result<Vec<Project>> {
        let _guard = self.lock.lock().await;
        let projects = self.load().await?;
        Ok(projects.into_values().collect())
    }

    async fn delete_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(max_age)
                .map_err(|e| DepotError::Internal(format!("retention window overflow: {}", e)))?;

        let _guard = self.lock.lock().await;
        let mut projects = self.load().await?;
        let before = projects.len();
        projects.retain(|_, project| !project.older_than(cutoff));
        let removed = before - projects.len();

        if removed > 0 {
            self.persist(&projects).await?;
            debug!(removed, path = %self.path.display(), "expired projects removed");
        }
        Ok(removed)
    }
}
