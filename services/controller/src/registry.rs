//! HTTP-backed registry client.
//!
//! The real variant of the `RegistryApi` capability: a thin JSON client over
//! the registry's v1 surface. Transport failures map to `Unavailable`,
//! unexpected statuses to `Rejected`; the engine treats both by deferring to
//! the next pass.
//!
//! Routes:
//! - `GET    /v1/scopes/{scope}/runners`
//! - `DELETE /v1/scopes/{scope}/runners/{id}`
//! - `POST   /v1/scopes/{scope}/registration-token`

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;

use forgepool_core::{MintedCredential, RegistryApi, RegistryEntry, RegistryError};

pub struct HttpRegistry {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireRunner {
    name: String,
    id: Option<i64>,
    #[serde(default)]
    busy: bool,
}

#[derive(Debug, Deserialize)]
struct WireToken {
    token: String,
    expires_at: i64,
}

fn unavailable(e: reqwest::Error) -> RegistryError {
    RegistryError::Unavailable(e.to_string())
}

async fn rejected(resp: reqwest::Response) -> RegistryError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    RegistryError::Rejected(format!("{status}: {body}"))
}

#[async_trait]
impl RegistryApi for HttpRegistry {
    async fn list_entries(
        &self,
        scope: &str,
        token: &str,
    ) -> Result<Vec<RegistryEntry>, RegistryError> {
        let url = format!("{}/v1/scopes/{scope}/runners", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(unavailable)?;

        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }

        let runners: Vec<WireRunner> = resp.json().await.map_err(unavailable)?;
        Ok(runners
            .into_iter()
            .map(|r| RegistryEntry {
                name: r.name,
                id: r.id,
                busy: r.busy,
            })
            .collect())
    }

    async fn deregister(&self, scope: &str, token: &str, id: i64) -> Result<(), RegistryError> {
        let url = format!("{}/v1/scopes/{scope}/runners/{id}", self.base_url);
        let resp = self
            .client
            .delete(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(unavailable)?;

        // already absent counts as removed
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }
        Ok(())
    }

    async fn mint_credential(
        &self,
        scope: &str,
        reference_token: &str,
    ) -> Result<MintedCredential, RegistryError> {
        let url = format!("{}/v1/scopes/{scope}/registration-token", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(reference_token)
            .send()
            .await
            .map_err(unavailable)?;

        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }

        let wire: WireToken = resp.json().await.map_err(unavailable)?;
        let expires_at = Utc
            .timestamp_opt(wire.expires_at, 0)
            .single()
            .ok_or_else(|| {
                RegistryError::Rejected(format!("invalid expiry epoch {}", wire.expires_at))
            })?;

        Ok(MintedCredential {
            token: wire.token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lists_runners_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/scopes/acme/runners"))
            .and(header("authorization", "Bearer pat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "name": "ci-worker-00001", "id": 1, "busy": true },
                { "name": "ci-worker-00002", "id": null }
            ])))
            .mount(&server)
            .await;

        let registry = HttpRegistry::new(server.uri());
        let entries = registry.list_entries("acme", "pat").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, Some(1));
        assert!(entries[0].busy);
        assert_eq!(entries[1].id, None);
        assert!(!entries[1].busy);
    }

    #[tokio::test]
    async fn deregister_treats_absent_entries_as_removed() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/scopes/acme/runners/7"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let registry = HttpRegistry::new(server.uri());
        assert!(registry.deregister("acme", "pat", 7).await.is_ok());
    }

    #[tokio::test]
    async fn deregister_surfaces_conflicts() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/scopes/acme/runners/7"))
            .respond_with(ResponseTemplate::new(409).set_body_string("entry is busy"))
            .mount(&server)
            .await;

        let registry = HttpRegistry::new(server.uri());
        let err = registry.deregister("acme", "pat", 7).await.unwrap_err();
        assert!(matches!(err, RegistryError::Rejected(_)));
        assert!(err.to_string().contains("entry is busy"));
    }

    #[tokio::test]
    async fn mints_a_registration_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scopes/acme/registration-token"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "token": "reg-abc",
                "expires_at": 4102444800i64
            })))
            .mount(&server)
            .await;

        let registry = HttpRegistry::new(server.uri());
        let minted = registry.mint_credential("acme", "pat").await.unwrap();

        assert_eq!(minted.token, "reg-abc");
        assert_eq!(minted.expires_at.timestamp(), 4102444800);
    }
}
