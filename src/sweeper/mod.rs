//! Retention sweeper
//!
//! Periodic pass deleting projects older than the retention window. Safe to
//! run alongside in-flight contributions: a project removed mid-apply makes
//! that apply fail with `ProjectNotFound` on its next store read.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::ProjectStore;
use crate::types::Result;

/// Run a single retention sweep, returning how many projects were removed
pub async fn sweep(store: &dyn ProjectStore, max_age: Duration) -> Result<usize> {
    let removed = store.delete_older_than(max_age).await?;
    if removed > 0 {
        info!(removed, "retention sweep removed expired projects");
    } else {
        debug!("retention sweep found nothing to remove");
    }
    Ok(removed)
}

/// Spawn a background task sweeping the store on a fixed interval
///
/// Storage failures are logged and retried on the next tick; the task never
/// exits on its own.
pub fn spawn_sweep_task(
    store: Arc<dyn ProjectStore>,
    interval: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately; skip it so startup is quiet
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = sweep(store.as_ref(), max_age).await {
                warn!("retention sweep failed: {}", e);
            }
        }
    });
    info!(
        interval_secs = interval.as_secs(),
        retention_secs = max_age.as_secs(),
        "retention sweep task started"
    );
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::aged_project;
    use crate::store::MemoryStore;

    const THIRTY_DAYS: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let store = MemoryStore::new();
        store.create(aged_project("OLD1", 31)).await.unwrap();
        store.create(aged_project("OLD2", 90)).await.unwrap();
        store.create(aged_project("NEW1", 29)).await.unwrap();

        let removed = sweep(&store, THIRTY_DAYS).await.unwrap();
        assert_eq!(removed, 2);

        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["NEW1".to_string()]);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let store = MemoryStore::new();
        store.create(aged_project("OLD1", 31)).await.unwrap();

        assert_eq!(sweep(&store, THIRTY_DAYS).await.unwrap(), 1);
        assert_eq!(sweep(&store, THIRTY_DAYS).await.unwrap(), 0);
    }
}
