use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::domain::conversation::ConversationKey;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriorityMarker {
    pub endpoint_id: String,
    pub counterparty_id: String,
    pub requested_at: DateTime<Utc>,
}

impl PriorityMarker {
    pub fn wait_time(&self, now: DateTime<Utc>) -> Duration {
        (now - self.requested_at).max(Duration::zero())
    }
}

/// Process-local set of counterparties waiting for a human operator.
///
/// Markers are never updated once created and are lost on restart.
#[derive(Debug, Default)]
pub struct PriorityTracker {
    markers: RwLock<HashMap<ConversationKey, PriorityMarker>>,
}

impl PriorityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request for help. A repeated request keeps the original
    /// timestamp and returns the existing marker.
    pub async fn mark(&self, key: &ConversationKey, now: DateTime<Utc>) -> PriorityMarker {
        let mut markers = self.markers.write().await;
        markers
            .entry(key.clone())
            .or_insert_with(|| PriorityMarker {
                endpoint_id: key.endpoint_id.clone(),
                counterparty_id: key.counterparty_id.clone(),
                requested_at: now,
            })
            .clone()
    }

    pub async fn get(&self, key: &ConversationKey) -> Option<PriorityMarker> {
        self.markers.read().await.get(key).cloned()
    }

    pub async fn wait_time(&self, key: &ConversationKey, now: DateTime<Utc>) -> Option<Duration> {
        self.get(key).await.map(|marker| marker.wait_time(now))
    }

    /// 1-based place in the queue, oldest request first.
    pub async fn position(&self, key: &ConversationKey) -> Option<usize> {
        let pending = self.pending().await;
        pending
            .iter()
            .position(|marker| {
                marker.endpoint_id == key.endpoint_id && marker.counterparty_id == key.counterparty_id
            })
            .map(|index| index + 1)
    }

    pub async fn pending(&self) -> Vec<PriorityMarker> {
        let markers = self.markers.read().await;
        let mut pending: Vec<PriorityMarker> = markers.values().cloned().collect();
        pending.sort_by(|left, right| {
            left.requested_at
                .cmp(&right.requested_at)
                .then_with(|| left.counterparty_id.cmp(&right.counterparty_id))
        });
        pending
    }

    pub async fn remove(&self, key: &ConversationKey) -> Option<PriorityMarker> {
        self.markers.write().await.remove(key)
    }

    pub async fn len(&self) -> usize {
        self.markers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.markers.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::PriorityTracker;
    use crate::domain::conversation::ConversationKey;

    #[tokio::test]
    async fn first_request_wins() {
        let tracker = PriorityTracker::new();
        let key = ConversationKey::new("PN-1", "5511");
        let first = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("time");

        tracker.mark(&key, first).await;
        let again = tracker.mark(&key, first + Duration::minutes(5)).await;

        assert_eq!(again.requested_at, first);
        assert_eq!(tracker.len().await, 1);
        assert_eq!(
            tracker.wait_time(&key, first + Duration::minutes(7)).await,
            Some(Duration::minutes(7))
        );
    }

    #[tokio::test]
    async fn pending_is_oldest_first_with_positions() {
        let tracker = PriorityTracker::new();
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("time");
        let late = ConversationKey::new("PN-1", "late");
        let early = ConversationKey::new("PN-2", "early");

        tracker.mark(&late, base + Duration::minutes(3)).await;
        tracker.mark(&early, base).await;

        let pending = tracker.pending().await;
        assert_eq!(pending[0].counterparty_id, "early");
        assert_eq!(tracker.position(&late).await, Some(2));

        tracker.remove(&early).await;
        assert_eq!(tracker.position(&late).await, Some(1));
        assert_eq!(tracker.get(&early).await, None);
    }

    #[tokio::test]
    async fn wait_time_never_negative() {
        let tracker = PriorityTracker::new();
        let key = ConversationKey::new("PN-1", "5511");
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("time");

        let marker = tracker.mark(&key, now).await;
        assert_eq!(marker.wait_time(now - Duration::minutes(1)), Duration::zero());
    }
}
