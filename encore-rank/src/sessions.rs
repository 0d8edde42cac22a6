//! Per-user ranking sessions
//!
//! One engine exists per user session; the registry hands out the
//! existing engine or creates a fresh one on first use. Engines are
//! independent — no ordering ever crosses user boundaries.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::engine::RankingEngine;

/// Registry mapping user ids to their session engines
pub struct SessionRegistry {
    event_capacity: usize,
    engines: RwLock<HashMap<String, Arc<RankingEngine>>>,
}

impl SessionRegistry {
    /// Create an empty registry; new engines get `event_capacity` event
    /// buffers
    pub fn new(event_capacity: usize) -> Self {
        Self {
            event_capacity,
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Engine for `user_id`, created on first use
    pub async fn engine_for(&self, user_id: &str) -> Arc<RankingEngine> {
        if let Some(engine) = self.engines.read().await.get(user_id) {
            return Arc::clone(engine);
        }
        let mut engines = self.engines.write().await;
        // Racing first uses settle on whichever entry landed first
        Arc::clone(engines.entry(user_id.to_string()).or_insert_with(|| {
            debug!("Creating ranking session for user {}", user_id);
            Arc::new(RankingEngine::new(self.event_capacity))
        }))
    }

    /// Drop a user's session and its in-memory order
    ///
    /// Returns whether a session existed.
    pub async fn drop_session(&self, user_id: &str) -> bool {
        self.engines.write().await.remove(user_id).is_some()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.engines.read().await.len()
    }

    /// True when no sessions exist
    pub async fn is_empty(&self) -> bool {
        self.engines.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;
    use encore_common::{Rating, ReviewItem};

    #[tokio::test]
    async fn test_engine_for_returns_the_same_session() {
        let registry = SessionRegistry::new(16);
        let first = registry.engine_for("ana").await;
        let second = registry.engine_for("ana").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_per_user() {
        let registry = SessionRegistry::new(16);
        let ana = registry.engine_for("ana").await;
        let ben = registry.engine_for("ben").await;
        assert!(!Arc::ptr_eq(&ana, &ben));

        let oracle = ScriptedOracle::unreachable();
        ana.insert(ReviewItem::new("r1", "Primavera", Rating::Good), &oracle)
            .await
            .unwrap();

        assert_eq!(ana.len(Rating::Good).await, 1);
        assert_eq!(ben.len(Rating::Good).await, 0);
    }

    #[tokio::test]
    async fn test_drop_session_discards_state() {
        let registry = SessionRegistry::new(16);
        registry.engine_for("ana").await;

        assert!(registry.drop_session("ana").await);
        assert!(!registry.drop_session("ana").await);
        assert!(registry.is_empty().await);
    }
}
