//! HTTP implementation of [`ContentStore`] for a PostgREST table API
//! (`/rest/v1/{table}`) paired with an object-storage API
//! (`/storage/v1/object/{bucket}/{key}`).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use capsule_shared::models::{Bucket, Collection};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::remote::{ContentStore, Select};

/// Remote content store reached over HTTP.
#[derive(Debug, Clone)]
pub struct RestStore {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl RestStore {
    /// Build a client for the deployment at `base_url`.
    ///
    /// Every request carries `api_key` both as `apikey` and as a bearer
    /// token, and is cut off after `timeout`.
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| StoreError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(base_url.to_string()));
        }

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn table_url(&self, collection: Collection) -> Result<Url> {
        self.endpoint(["rest", "v1", collection.table()])
    }

    fn object_url(&self, bucket: Bucket, key: &str) -> Result<Url> {
        self.endpoint(
            ["storage", "v1", "object", bucket.name()]
                .into_iter()
                .chain(key.split('/')),
        )
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key).bearer_auth(&self.api_key)
    }
}

/// Map non-success statuses to [`StoreError::Status`], keeping the body.
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), body = %body, "Store request failed");
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ContentStore for RestStore {
    async fn select(&self, query: &Select) -> Result<Vec<Value>> {
        let mut params = vec![
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "created_at.desc".to_string()),
        ];
        if let Some(ref filter) = query.filter {
            params.push((filter.column.to_string(), format!("eq.{}", filter.value)));
        }

        let req = self
            .http
            .get(self.table_url(query.collection)?)
            .query(&params);
        let resp = check(self.authed(req).send().await?).await?;
        let rows: Vec<Value> = resp.json().await?;

        debug!(collection = %query.collection, count = rows.len(), "Selected rows");
        Ok(rows)
    }

    async fn insert(&self, collection: Collection, row: Value) -> Result<()> {
        let req = self
            .http
            .post(self.table_url(collection)?)
            .header("Prefer", "return=minimal")
            .json(&[row]);
        check(self.authed(req).send().await?).await?;

        debug!(collection = %collection, "Inserted row");
        Ok(())
    }

    async fn upload_blob(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<()> {
        let size = bytes.len();
        let req = self
            .http
            .post(self.object_url(bucket, key)?)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes);

        let resp = self.authed(req).send().await?;
        if resp.status() == reqwest::StatusCode::CONFLICT {
            return Err(StoreError::Conflict(key.to_string()));
        }
        check(resp).await?;

        debug!(bucket = %bucket, key, size, "Uploaded blob");
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        self.endpoint(
            ["storage", "v1", "object", "public", bucket.name()]
                .into_iter()
                .chain(key.split('/')),
        )
        .map(|url| url.to_string())
        .unwrap_or_else(|_| {
            format!(
                "{}/storage/v1/object/public/{}/{}",
                self.base_url.as_str().trim_end_matches('/'),
                bucket.name(),
                key
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Select;
    use capsule_shared::models::RowId;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> RestStore {
        RestStore::new(&server.uri(), "anon-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_select_orders_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/images"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("folder_id", "eq.4"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 9, "url": "u", "folder_id": 4, "created_at": "2026-02-01T00:00:00Z" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = store(&server)
            .select(&Select::where_eq(Collection::Images, "folder_id", RowId::Int(4)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], 9);
    }

    #[tokio::test]
    async fn test_insert_posts_single_row_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/posts"))
            .and(header("prefer", "return=minimal"))
            .and(body_json(json!([{ "text": "hello" }])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .insert(Collection::Posts, json!({ "text": "hello" }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_status_error_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/folders"))
            .respond_with(ResponseTemplate::new(401).set_body_string("JWT expired"))
            .mount(&server)
            .await;

        let err = store(&server)
            .insert(Collection::Folders, json!({ "name": "Trip" }))
            .await
            .unwrap_err();
        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "JWT expired");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_upload_blob_path_and_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/gallery/3/100-a.jpg"))
            .and(header("content-type", "image/jpeg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "gallery/3/100-a.jpg" })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/gallery/3/100-a.jpg"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let store = store(&server);
        store
            .upload_blob(Bucket::Gallery, "3/100-a.jpg", Bytes::from_static(b"jpg"), "image/jpeg")
            .await
            .unwrap();
        let second = store
            .upload_blob(Bucket::Gallery, "3/100-a.jpg", Bytes::from_static(b"jpg"), "image/jpeg")
            .await;
        assert!(matches!(second, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_public_url_encodes_key_segments() {
        let store = RestStore::new("https://abc.supabase.co/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(
            store.public_url(Bucket::Gallery, "3/100-my photo.jpg"),
            "https://abc.supabase.co/storage/v1/object/public/gallery/3/100-my%20photo.jpg"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(RestStore::new("mailto:someone", "k", Duration::from_secs(1)).is_err());
    }
}
