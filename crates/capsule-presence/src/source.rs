//! Where presence snapshots come from.

use std::time::Duration;

use async_trait::async_trait;
use capsule_shared::{IdentityId, PresenceEnvelope};
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::PresenceError;

/// Read-only presence endpoint.
#[async_trait]
pub trait PresenceSource: Send + Sync {
    /// Fetch the current presence of `identity`.  A response with
    /// `success == false` is returned as `Ok`; the caller decides.
    async fn fetch(&self, identity: &IdentityId) -> Result<PresenceEnvelope, PresenceError>;
}

/// HTTP client for a Lanyard-compatible `GET /users/{id}` endpoint.
#[derive(Debug, Clone)]
pub struct LanyardClient {
    http: Client,
    base_url: Url,
}

impl LanyardClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PresenceError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| PresenceError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PresenceError::InvalidUrl(base_url.to_string()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    fn user_url(&self, identity: &IdentityId) -> Result<Url, PresenceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PresenceError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["users", identity.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl PresenceSource for LanyardClient {
    async fn fetch(&self, identity: &IdentityId) -> Result<PresenceEnvelope, PresenceError> {
        let resp = self.http.get(self.user_url(identity)?).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        // Unknown users come back as 404 with a regular envelope.
        match serde_json::from_slice::<PresenceEnvelope>(&body) {
            Ok(envelope) => {
                debug!(identity = %identity, success = envelope.success, "Presence fetched");
                Ok(envelope)
            }
            Err(_) if !status.is_success() => Err(PresenceError::Status(status.as_u16())),
            Err(e) => Err(PresenceError::Decode(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {
                    "discord_user": { "id": "42", "username": "mau", "avatar": null },
                    "discord_status": "online",
                    "activities": []
                }
            })))
            .mount(&server)
            .await;

        let client =
            LanyardClient::new(&format!("{}/v1", server.uri()), Duration::from_secs(5)).unwrap();
        let envelope = client.fetch(&IdentityId::new("42")).await.unwrap();
        assert!(envelope.success);
        assert!(envelope.into_snapshot().unwrap().is_displayable());
    }

    #[tokio::test]
    async fn test_not_monitored_is_negative_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/7"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "error": { "code": "user_not_monitored", "message": "User is not being monitored" }
            })))
            .mount(&server)
            .await;

        let client =
            LanyardClient::new(&format!("{}/v1", server.uri()), Duration::from_secs(5)).unwrap();
        let envelope = client.fetch(&IdentityId::new("7")).await.unwrap();
        assert!(!envelope.success);
    }

    #[tokio::test]
    async fn test_gateway_error_is_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let client = LanyardClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.fetch(&IdentityId::new("1")).await.unwrap_err();
        assert!(matches!(err, PresenceError::Status(502)));
    }
}
