//! Project persistence
//!
//! The engine, routes, and sweeper only see the [`ProjectStore`] trait; the
//! backend (process-lifetime memory table or durable JSON index) is chosen at
//! startup. All mutation flows through [`ProjectStore::update`], which is an
//! atomic read-modify-write per project id: no other update for the same id
//! can observe or persist a state between the read and the write.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::project::Project;
use crate::types::Result;

/// Mutation applied inside the atomic update critical section
///
/// Mutators validate first and only then write; if the mutator returns an
/// error, the backend persists nothing and the error is surfaced unchanged.
pub type Mutator = Box<dyn FnOnce(&mut Project) -> Result<()> + Send>;

/// Persistence contract for projects
///
/// Any operation may fail with `StorageUnavailable` when the backing medium
/// cannot be read or written.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Store a new project; fails with `AlreadyExists` if the id is taken
    async fn create(&self, project: Project) -> Result<Project>;

    /// Fetch a snapshot; fails with `ProjectNotFound`
    async fn get(&self, id: &str) -> Result<Project>;

    /// Atomically read, mutate, and persist one project, returning the new
    /// snapshot; fails with `ProjectNotFound` or the mutator's own error
    async fn update(&self, id: &str, mutate: Mutator) -> Result<Project>;

    /// All live projects, unordered
    async fn list(&self) -> Result<Vec<Project>>;

    /// Delete every project older than `max_age`, returning how many
    async fn delete_older_than(&self, max_age: Duration) -> Result<usize>;
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::catalog::Template;
    use crate::project::Project;
    use chrono::{Duration as ChronoDuration, Utc};

    /// Project with a single Gold:100 requirement
    pub fn gold_project(id: &str) -> Project {
        let template = Template::fixed("outpost", "Outpost", &[("Gold", 100)]);
        Project::from_template(id.to_string(), &template)
    }

    /// Same, but created `days` days in the past
    pub fn aged_project(id: &str, days: i64) -> Project {
        let mut project = gold_project(id);
        project.created_at = Utc::now() - ChronoDuration::days(days);
        project
    }
}
