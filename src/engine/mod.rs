//! Contribution engine
//!
//! Validates a single contribution and applies it to the project record.
//! The remaining-capacity check and the increment run inside the store's
//! atomic update, so two concurrent contributions can never both pass the
//! check against a stale value and jointly overshoot a requirement.
//!
//! A per-project ordering lock is held across update + publish, which makes
//! the hub's per-topic snapshot order identical to apply-completion order.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::hub::BroadcastHub;
use crate::project::Project;
use crate::store::ProjectStore;
use crate::types::{DepotError, Result};

/// Label used when the contributor leaves their name blank
pub const ANONYMOUS: &str = "Anonymous";

/// Applies contributions against the store and fans out updated snapshots
pub struct ContributionEngine {
    store: Arc<dyn ProjectStore>,
    hub: Arc<BroadcastHub>,
    // Serializes update + publish per project id
    order_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ContributionEngine {
    pub fn new(store: Arc<dyn ProjectStore>, hub: Arc<BroadcastHub>) -> Self {
        Self {
            store,
            hub,
            order_locks: DashMap::new(),
        }
    }

    /// Validate and apply one contribution, returning the updated snapshot
    ///
    /// Failure modes, checked in order: `InvalidAmount` (non-positive),
    /// `ProjectNotFound`, `UnknownResource`, `OverContribution` (carrying the
    /// remaining capacity). On success the snapshot has already been
    /// published to every subscriber of the project.
    pub async fn apply(
        &self,
        project_id: &str,
        resource: &str,
        amount: i64,
        contributor: Option<&str>,
    ) -> Result<Project> {
        if amount <= 0 {
            return Err(DepotError::InvalidAmount);
        }
        let amount = amount as u64;

        let lock = self
            .order_locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let resource_key = resource.to_string();
        let updated = self
            .store
            .update(
                project_id,
                Box::new(move |project| {
                    let Some(&required) = project.required.get(&resource_key) else {
                        return Err(DepotError::UnknownResource(resource_key.clone()));
                    };
                    let contributed = project.contributed.get(&resource_key).copied().unwrap_or(0);
                    let remaining = required - contributed;
                    if amount > remaining {
                        return Err(DepotError::OverContribution { remaining });
                    }
                    *project.contributed.entry(resource_key.clone()).or_insert(0) += amount;
                    Ok(())
                }),
            )
            .await?;

        let delivered = self.hub.publish(project_id, updated.clone());

        info!(
            project = %project_id,
            resource,
            amount,
            contributor = contributor.unwrap_or(ANONYMOUS),
            complete = updated.is_complete(),
            delivered,
            "contribution applied"
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::gold_project;
    use crate::store::MemoryStore;

    fn engine_with_project() -> (ContributionEngine, Arc<MemoryStore>, Arc<BroadcastHub>) {
        let store = Arc::new(MemoryStore::new());
        let hub = Arc::new(BroadcastHub::default());
        let engine = ContributionEngine::new(
            Arc::clone(&store) as Arc<dyn ProjectStore>,
            Arc::clone(&hub),
        );
        (engine, store, hub)
    }

    #[tokio::test]
    async fn test_partial_then_complete() {
        let (engine, store, _hub) = engine_with_project();
        store.create(gold_project("P1")).await.unwrap();

        let after_forty = engine.apply("P1", "Gold", 40, Some("Jameson")).await.unwrap();
        assert_eq!(after_forty.contributed.get("Gold"), Some(&40));
        assert!(!after_forty.is_complete());

        let after_rest = engine.apply("P1", "Gold", 60, None).await.unwrap();
        assert_eq!(after_rest.contributed.get("Gold"), Some(&100));
        assert!(after_rest.is_complete());
    }

    #[tokio::test]
    async fn test_over_contribution_rejected_with_remaining() {
        let (engine, store, _hub) = engine_with_project();
        store.create(gold_project("P1")).await.unwrap();
        engine.apply("P1", "Gold", 40, None).await.unwrap();

        let err = engine.apply("P1", "Gold", 61, None).await.unwrap_err();
        assert!(matches!(err, DepotError::OverContribution { remaining: 60 }));

        // Rejection leaves state untouched
        let snapshot = store.get("P1").await.unwrap();
        assert_eq!(snapshot.contributed.get("Gold"), Some(&40));
    }

    #[tokio::test]
    async fn test_exact_fill_is_allowed() {
        let (engine, store, _hub) = engine_with_project();
        store.create(gold_project("P1")).await.unwrap();

        let snapshot = engine.apply("P1", "Gold", 100, None).await.unwrap();
        assert_eq!(snapshot.remaining("Gold"), Some(0));
        assert!(snapshot.is_complete());

        // Requirement is met; even one more unit is over-contribution
        let err = engine.apply("P1", "Gold", 1, None).await.unwrap_err();
        assert!(matches!(err, DepotError::OverContribution { remaining: 0 }));
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected_first() {
        let (engine, _store, _hub) = engine_with_project();

        // Amount validation precedes the project lookup
        let err = engine.apply("MISSING", "Gold", 0, None).await.unwrap_err();
        assert!(matches!(err, DepotError::InvalidAmount));
        let err = engine.apply("MISSING", "Gold", -5, None).await.unwrap_err();
        assert!(matches!(err, DepotError::InvalidAmount));
    }

    #[tokio::test]
    async fn test_missing_project() {
        let (engine, _store, _hub) = engine_with_project();
        let err = engine.apply("MISSING", "Gold", 10, None).await.unwrap_err();
        assert!(matches!(err, DepotError::ProjectNotFound));
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let (engine, store, _hub) = engine_with_project();
        store.create(gold_project("P1")).await.unwrap();

        let err = engine.apply("P1", "Tritium", 10, None).await.unwrap_err();
        match err {
            DepotError::UnknownResource(name) => assert_eq!(name, "Tritium"),
            other => panic!("expected UnknownResource, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_contributions_lose_nothing() {
        let (engine, store, _hub) = engine_with_project();
        store.create(gold_project("P1")).await.unwrap();
        let engine = Arc::new(engine);

        // 10 x 10 = 100 = exactly the requirement; all must succeed once
        let mut handles = Vec::new();
        for _ in 0..10 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine.apply("P1", "Gold", 10, None).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let snapshot = store.get("P1").await.unwrap();
        assert_eq!(snapshot.contributed.get("Gold"), Some(&100));
        assert!(snapshot.is_complete());
    }

    #[tokio::test]
    async fn test_subscribers_see_applies_in_completion_order() {
        let (engine, store, hub) = engine_with_project();
        store.create(gold_project("P1")).await.unwrap();

        let mut rx_a = hub.subscribe("P1");
        let mut rx_b = hub.subscribe("P1");

        engine.apply("P1", "Gold", 40, None).await.unwrap();
        engine.apply("P1", "Gold", 60, None).await.unwrap();

        for rx in [&mut rx_a, &mut rx_b] {
            let first = rx.recv().await.unwrap();
            let second = rx.recv().await.unwrap();
            assert_eq!(first.contributed.get("Gold"), Some(&40));
            assert_eq!(second.contributed.get("Gold"), Some(&100));
            assert!(second.is_complete());
        }
    }

    #[tokio::test]
    async fn test_rejected_contribution_publishes_nothing() {
        let (engine, store, hub) = engine_with_project();
        store.create(gold_project("P1")).await.unwrap();
        let mut rx = hub.subscribe("P1");

        engine.apply("P1", "Gold", 101, None).await.unwrap_err();
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }
}
