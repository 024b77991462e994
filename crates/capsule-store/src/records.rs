//! Typed reads and writes over a [`ContentStore`].

use capsule_shared::models::{NewRecord, Record, RowId};
use tracing::debug;

use crate::error::Result;
use crate::remote::{ContentStore, Select};

/// Full snapshot of `R`'s collection, newest first.
pub async fn fetch_all<R: Record>(store: &dyn ContentStore) -> Result<Vec<R>> {
    fetch(store, Select::all(R::COLLECTION)).await
}

/// Rows of `R`'s collection whose `column` equals `value`, newest first.
pub async fn fetch_where<R: Record>(
    store: &dyn ContentStore,
    column: &'static str,
    value: &RowId,
) -> Result<Vec<R>> {
    fetch(store, Select::where_eq(R::COLLECTION, column, value.clone())).await
}

async fn fetch<R: Record>(store: &dyn ContentStore, query: Select) -> Result<Vec<R>> {
    let rows = store.select(&query).await?;
    let count = rows.len();
    let typed = serde_json::from_value(serde_json::Value::Array(rows))?;
    debug!(collection = %query.collection, count, "Fetched collection");
    Ok(typed)
}

/// Insert one typed row into its collection.
pub async fn insert_row<N: NewRecord>(store: &dyn ContentStore, row: &N) -> Result<()> {
    let value = serde_json::to_value(row)?;
    store.insert(N::COLLECTION, value).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use capsule_shared::models::{Folder, Image, NewFolder, NewImage, Post};

    #[tokio::test]
    async fn test_typed_round_trip() {
        let store = MemoryStore::new();
        insert_row(&store, &NewFolder { name: "Trip".into() })
            .await
            .unwrap();

        let folders: Vec<Folder> = fetch_all(&store).await.unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "Trip");
    }

    #[tokio::test]
    async fn test_fetch_where_scopes_rows() {
        let store = MemoryStore::new();
        for folder in [1, 2, 1] {
            insert_row(
                &store,
                &NewImage {
                    url: format!("memory://gallery/{folder}"),
                    folder_id: RowId::Int(folder),
                },
            )
            .await
            .unwrap();
        }

        let images: Vec<Image> = fetch_where(&store, "folder_id", &RowId::Int(1))
            .await
            .unwrap();
        assert_eq!(images.len(), 2);
        assert!(images.iter().all(|i| i.folder_id == RowId::Int(1)));
    }

    #[tokio::test]
    async fn test_malformed_row_is_decode_error() {
        let store = MemoryStore::new();
        store
            .insert(
                capsule_shared::models::Collection::Posts,
                serde_json::json!({ "body": "wrong column" }),
            )
            .await
            .unwrap();

        let result: Result<Vec<Post>> = fetch_all(&store).await;
        assert!(matches!(result, Err(crate::StoreError::Decode(_))));
    }
}
