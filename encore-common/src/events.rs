//! Event types for the Encore ranking event system
//!
//! Provides shared event definitions and an EventBus for ranking
//! consumers (UI refresh, activity logging). Events are emitted after the
//! originating operation has completed and the bucket position invariant
//! holds again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::review::Rating;

/// Ranking event types
///
/// Events are broadcast via EventBus and can be serialized for transport
/// to connected UIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RankEvent {
    /// A review was inserted and ranked within its bucket
    ReviewInserted {
        /// Review that was inserted
        review_id: String,
        /// Bucket it landed in
        rating: Rating,
        /// Final position after bubble-up
        position: usize,
        /// Number of oracle comparisons the insert required
        comparisons: u32,
        /// When the insert completed
        timestamp: DateTime<Utc>,
    },

    /// A review's rank was re-validated after an edit
    ReviewRepositioned {
        review_id: String,
        rating: Rating,
        /// Position before the re-check
        from_position: usize,
        /// Position after the re-check
        to_position: usize,
        /// Number of oracle comparisons issued
        comparisons: u32,
        timestamp: DateTime<Utc>,
    },

    /// A review was removed and the bucket re-indexed
    ReviewRemoved {
        review_id: String,
        rating: Rating,
        /// Position the review held when removed
        position: usize,
        timestamp: DateTime<Utc>,
    },

    /// A review's text was updated (rank untouched)
    ReviewContentUpdated {
        review_id: String,
        rating: Rating,
        timestamp: DateTime<Utc>,
    },

    /// A review was moved one step by the user, without comparisons
    ReviewMoved {
        review_id: String,
        rating: Rating,
        from_position: usize,
        to_position: usize,
        timestamp: DateTime<Utc>,
    },

    /// A bucket's order was replaced with a manual permutation
    OrderApplied {
        rating: Rating,
        /// New order, most preferred first
        review_ids: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for rank events
///
/// Thin wrapper over `tokio::sync::broadcast`: one sender, any number of
/// subscribers, lagging subscribers drop old events.
///
/// # Examples
///
/// ```
/// use encore_common::events::EventBus;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RankEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RankEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if no subscriber is
    /// listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RankEvent,
    ) -> Result<usize, broadcast::error::SendError<RankEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    ///
    /// Rank events are notifications, not commands; a session with no
    /// connected UI simply drops them.
    pub fn emit_lossy(&self, event: RankEvent) {
        if self.tx.send(event).is_err() {
            debug!("Rank event dropped: no subscribers");
        }
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_emitted_events() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit_lossy(RankEvent::ReviewRemoved {
            review_id: "r1".to_string(),
            rating: Rating::Good,
            position: 2,
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            RankEvent::ReviewRemoved {
                review_id,
                rating,
                position,
                ..
            } => {
                assert_eq!(review_id, "r1");
                assert_eq!(rating, Rating::Good);
                assert_eq!(position, 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_an_error_but_lossy_is_not() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus
            .emit(RankEvent::ReviewContentUpdated {
                review_id: "r1".to_string(),
                rating: Rating::Bad,
                timestamp: Utc::now(),
            })
            .is_err());
        // Same event through the lossy path is simply dropped
        bus.emit_lossy(RankEvent::ReviewContentUpdated {
            review_id: "r1".to_string(),
            rating: Rating::Bad,
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = RankEvent::OrderApplied {
            rating: Rating::Okay,
            review_ids: vec!["a".to_string(), "b".to_string()],
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "OrderApplied");
        assert_eq!(json["rating"], "okay");
        assert_eq!(json["review_ids"][0], "a");
    }
}
