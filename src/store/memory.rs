//! In-memory project store
//!
//! Process-lifetime table backed by a DashMap. The per-key entry guard from
//! `get_mut` is held across the whole mutator call, which serializes updates
//! to the same project while leaving other projects fully independent.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use tracing::debug;

use super::{Mutator, ProjectStore};
use crate::project::Project;
use crate::types::{DepotError, Result};

/// Project table scoped to the process lifetime
pub struct MemoryStore {
    projects: DashMap<String, Project>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            projects: DashMap::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create(&self, project: Project) -> Result<Project> {
        match self.projects.entry(project.id.clone()) {
            Entry::Occupied(_) => Err(DepotError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(project.clone());
                debug!(project = %project.id, "project created");
                Ok(project)
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Project> {
        self.projects
            .get(id)
            .map(|entry| entry.clone())
            .ok_or(DepotError::ProjectNotFound)
    }

    async fn update(&self, id: &str, mutate: Mutator) -> Result<Project> {
        let mut entry = self
            .projects
            .get_mut(id)
            .ok_or(DepotError::ProjectNotFound)?;

        // Mutate a copy so a failed precondition leaves the record untouched
        let mut next = entry.clone();
        mutate(&mut next)?;
        *entry = next.clone();
        Ok(next)
    }

    async fn list(&self) -> Result<Vec<Project>> {
        Ok(self
            .projects
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(max_age)
                .map_err(|e| DepotError::Internal(format!("retention window overflow: {}", e)))?;

        // Count inside the predicate; concurrent creates make a
        // length-difference unreliable
        let mut removed = 0usize;
        self.projects.retain(|_, project| {
            let expired = project.older_than(cutoff);
            if expired {
                removed += 1;
            }
            !expired
        });

        if removed > 0 {
            debug!(removed, "expired projects removed");
        }
        Ok(removed)
    }
}
