use async_trait::async_trait;
use bytes::Bytes;
use capsule_shared::models::{Bucket, Collection, RowId};

use crate::error::Result;

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: &'static str,
    pub value: RowId,
}

/// A read of one collection.  Results are always ordered by `created_at`
/// descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub collection: Collection,
    pub filter: Option<Filter>,
}

impl Select {
    pub fn all(collection: Collection) -> Self {
        Self {
            collection,
            filter: None,
        }
    }

    pub fn where_eq(collection: Collection, column: &'static str, value: RowId) -> Self {
        Self {
            collection,
            filter: Some(Filter { column, value }),
        }
    }
}

/// The remote relational store plus blob store.
///
/// Rows cross this boundary as JSON objects; see [`crate::records`] for the
/// typed layer.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Every row matching `query`, newest first.
    async fn select(&self, query: &Select) -> Result<Vec<serde_json::Value>>;

    /// Insert a single row.  The store assigns `id` and `created_at`.
    async fn insert(&self, collection: Collection, row: serde_json::Value) -> Result<()>;

    /// Store `bytes` under `key` in `bucket`.  Existing keys are not
    /// overwritten.
    async fn upload_blob(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<()>;

    /// Public URL of an uploaded blob.
    fn public_url(&self, bucket: Bucket, key: &str) -> String;
}
