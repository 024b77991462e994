//! In-process implementation of [`ContentStore`].
//!
//! Assigns integer ids and strictly increasing `created_at` values the way
//! the remote store would.  Also supports injected failures and counts
//! calls, which the sync tests rely on.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use capsule_shared::models::{Bucket, Collection, RowId};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::remote::{ContentStore, Select};

#[derive(Debug, Clone)]
struct StoredRow {
    created_at: DateTime<Utc>,
    value: Value,
}

#[derive(Debug, Default)]
struct Inner {
    rows: HashMap<Collection, Vec<StoredRow>>,
    blobs: HashMap<(Bucket, String), (Bytes, String)>,
    next_id: i64,
    last_created: Option<DateTime<Utc>>,
    failing_selects: HashSet<Collection>,
    failing_inserts: usize,
    failing_uploads: usize,
    select_calls: usize,
    insert_calls: usize,
    upload_calls: usize,
}

impl Inner {
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let at = match self.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created = Some(at);
        at
    }
}

/// In-memory content store.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    public_base: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_public_base("memory://store")
    }

    /// Public URLs become `{public_base}/{bucket}/{key}`.
    pub fn with_public_base(public_base: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                ..Default::default()
            }),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Backend(format!("Lock poisoned: {e}")))
    }

    /// Insert a row with an explicit `created_at`, bypassing failure
    /// injection and call counting.  Returns the assigned id.
    pub fn seed(&self, collection: Collection, mut row: Value, created_at: DateTime<Utc>) -> Result<RowId> {
        let mut inner = self.lock()?;
        let id = RowId::Int(inner.next_id);
        inner.next_id += 1;
        if let Value::Object(ref mut map) = row {
            map.insert("id".into(), serde_json::to_value(&id)?);
            map.insert("created_at".into(), serde_json::to_value(created_at)?);
        }
        inner
            .rows
            .entry(collection)
            .or_default()
            .push(StoredRow { created_at, value: row });
        Ok(id)
    }

    /// Make every select on `collection` fail until cleared.
    pub fn fail_selects(&self, collection: Collection, failing: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            if failing {
                inner.failing_selects.insert(collection);
            } else {
                inner.failing_selects.remove(&collection);
            }
        }
    }

    /// Make the next `count` inserts fail.
    pub fn fail_next_inserts(&self, count: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing_inserts = count;
        }
    }

    /// Make the next `count` blob uploads fail.
    pub fn fail_next_uploads(&self, count: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing_uploads = count;
        }
    }

    pub fn select_calls(&self) -> usize {
        self.inner.lock().map(|i| i.select_calls).unwrap_or(0)
    }

    pub fn insert_calls(&self) -> usize {
        self.inner.lock().map(|i| i.insert_calls).unwrap_or(0)
    }

    pub fn upload_calls(&self) -> usize {
        self.inner.lock().map(|i| i.upload_calls).unwrap_or(0)
    }

    /// Stored blob bytes and content type.
    pub fn blob(&self, bucket: Bucket, key: &str) -> Option<(Bytes, String)> {
        let inner = self.inner.lock().ok()?;
        inner.blobs.get(&(bucket, key.to_string())).cloned()
    }

    pub fn blob_keys(&self, bucket: Bucket) -> Vec<String> {
        let Ok(inner) = self.inner.lock() else {
            return Vec::new();
        };
        let mut keys: Vec<String> = inner
            .blobs
            .keys()
            .filter(|(b, _)| *b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn select(&self, query: &Select) -> Result<Vec<Value>> {
        let mut inner = self.lock()?;
        inner.select_calls += 1;

        if inner.failing_selects.contains(&query.collection) {
            return Err(StoreError::Backend(format!(
                "select on {} unavailable",
                query.collection
            )));
        }

        let wanted = match query.filter {
            Some(ref f) => Some((f.column, serde_json::to_value(&f.value)?)),
            None => None,
        };

        let mut rows: Vec<&StoredRow> = inner
            .rows
            .get(&query.collection)
            .map(|rows| rows.iter().collect())
            .unwrap_or_default();

        if let Some((column, ref value)) = wanted {
            rows.retain(|row| row.value.get(column) == Some(value));
        }

        // Stable sort keeps later inserts first among equal timestamps.
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(rows.into_iter().map(|row| row.value.clone()).collect())
    }

    async fn insert(&self, collection: Collection, mut row: Value) -> Result<()> {
        let mut inner = self.lock()?;
        inner.insert_calls += 1;

        if inner.failing_inserts > 0 {
            inner.failing_inserts -= 1;
            return Err(StoreError::Backend(format!("insert into {collection} unavailable")));
        }

        let Value::Object(ref mut map) = row else {
            return Err(StoreError::Backend("row must be a JSON object".into()));
        };

        let id = RowId::Int(inner.next_id);
        inner.next_id += 1;
        let created_at = inner.next_created_at();
        map.insert("id".into(), serde_json::to_value(&id)?);
        map.insert("created_at".into(), serde_json::to_value(created_at)?);

        debug!(collection = %collection, id = %id, "Inserted row");
        inner
            .rows
            .entry(collection)
            .or_default()
            .push(StoredRow { created_at, value: row });
        Ok(())
    }

    async fn upload_blob(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        inner.upload_calls += 1;

        if inner.failing_uploads > 0 {
            inner.failing_uploads -= 1;
            return Err(StoreError::Backend(format!("upload to {bucket} unavailable")));
        }

        let slot = (bucket, key.to_string());
        if inner.blobs.contains_key(&slot) {
            return Err(StoreError::Conflict(key.to_string()));
        }

        debug!(bucket = %bucket, key, size = bytes.len(), "Stored blob");
        inner.blobs.insert(slot, (bytes, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("{}/{}/{}", self.public_base, bucket.name(), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[tokio::test]
    async fn test_select_is_newest_first() {
        let store = MemoryStore::new();
        for text in ["one", "two", "three"] {
            store
                .insert(Collection::Posts, json!({ "text": text }))
                .await
                .unwrap();
        }

        let rows = store.select(&Select::all(Collection::Posts)).await.unwrap();
        let texts: Vec<_> = rows.iter().map(|r| r["text"].as_str().unwrap()).collect();
        assert_eq!(texts, ["three", "two", "one"]);
    }

    #[tokio::test]
    async fn test_seeded_timestamps_drive_order() {
        let store = MemoryStore::new();
        let base = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        store
            .seed(Collection::Posts, json!({ "text": "late" }), base + Duration::hours(1))
            .unwrap();
        store
            .seed(Collection::Posts, json!({ "text": "early" }), base)
            .unwrap();

        let rows = store.select(&Select::all(Collection::Posts)).await.unwrap();
        assert_eq!(rows[0]["text"], "late");
        assert_eq!(rows[1]["text"], "early");
    }

    #[tokio::test]
    async fn test_injected_insert_failure_leaves_no_row() {
        let store = MemoryStore::new();
        store.fail_next_inserts(1);

        assert!(store
            .insert(Collection::Folders, json!({ "name": "x" }))
            .await
            .is_err());
        assert!(store
            .select(&Select::all(Collection::Folders))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.insert_calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_select_is_per_collection() {
        let store = MemoryStore::new();
        store.fail_selects(Collection::Posts, true);

        assert!(store.select(&Select::all(Collection::Posts)).await.is_err());
        assert!(store.select(&Select::all(Collection::Folders)).await.is_ok());
    }

    #[tokio::test]
    async fn test_blob_key_conflict() {
        let store = MemoryStore::new();
        let data = Bytes::from_static(b"jpeg");
        store
            .upload_blob(Bucket::Gallery, "1/1-a.jpg", data.clone(), "image/jpeg")
            .await
            .unwrap();

        let again = store
            .upload_blob(Bucket::Gallery, "1/1-a.jpg", data, "image/jpeg")
            .await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));
        assert_eq!(store.blob_keys(Bucket::Gallery), ["1/1-a.jpg"]);
    }

    #[test]
    fn test_public_url() {
        let store = MemoryStore::with_public_base("http://localhost:9000/");
        assert_eq!(
            store.public_url(Bucket::Voicemails, "1.wav"),
            "http://localhost:9000/voicemails/1.wav"
        );
    }
}
