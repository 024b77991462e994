//! Last known presence per identity.

use std::collections::HashMap;
use std::sync::Arc;

use capsule_shared::{IdentityId, PresenceSnapshot};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// A snapshot together with the time it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceEntry {
    pub snapshot: PresenceSnapshot,
    pub fetched_at: DateTime<Utc>,
}

impl PresenceEntry {
    /// Whether this entry is older than `max_age` at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now - self.fetched_at > max_age
    }
}

/// Shared, cloneable view of the latest snapshot per identity.
///
/// Only the poller writes; entries are replaced whole and never removed.
#[derive(Debug, Clone, Default)]
pub struct PresenceBoard {
    entries: Arc<RwLock<HashMap<IdentityId, PresenceEntry>>>,
}

impl PresenceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, identity: &IdentityId) -> Option<PresenceEntry> {
        self.entries.read().await.get(identity).cloned()
    }

    pub(crate) async fn replace(&self, identity: IdentityId, snapshot: PresenceSnapshot) {
        let entry = PresenceEntry {
            snapshot,
            fetched_at: Utc::now(),
        };
        self.entries.write().await.insert(identity, entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_is_wholesale() {
        let board = PresenceBoard::new();
        let id = IdentityId::new("1");

        let mut first = PresenceSnapshot::default();
        first.spotify = Some(capsule_shared::SpotifyTrack {
            song: "a".into(),
            artist: "b".into(),
            album: None,
            album_art_url: "c".into(),
        });
        board.replace(id.clone(), first).await;
        board.replace(id.clone(), PresenceSnapshot::default()).await;

        let entry = board.get(&id).await.unwrap();
        assert!(entry.snapshot.spotify.is_none());
        assert_eq!(board.len().await, 1);
    }

    #[test]
    fn test_staleness() {
        let entry = PresenceEntry {
            snapshot: PresenceSnapshot::default(),
            fetched_at: Utc::now() - chrono::Duration::minutes(2),
        };
        assert!(entry.is_stale(Utc::now(), chrono::Duration::seconds(45)));
        assert!(!entry.is_stale(Utc::now(), chrono::Duration::minutes(5)));
    }
}
