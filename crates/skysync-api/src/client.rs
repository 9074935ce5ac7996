//! Orchestrator REST API client
//!
//! A thin typed wrapper over the environment's `/api/v1` surface: offset
//! pagination, upsert (PATCH with POST fallback on 404), and delete. All
//! calls are sequential and fail fast; an unexpected status aborts the
//! whole operation.

use crate::error::{ApiError, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

use skysync_core::MetadataKind;

/// Pagination step used by the listing endpoints.
pub const PAGE_SIZE: u64 = 100;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(720);

/// Immutable identity of the environment a run targets.
///
/// Passed explicitly into every component that needs it; nothing reads
/// ambient global state.
#[derive(Debug, Clone)]
pub struct ApiContext {
    /// Webserver URL without the `/api/v1` suffix.
    pub webserver_url: String,
    pub environment_name: String,
    pub project_id: Option<String>,
}

impl ApiContext {
    pub fn base_url(&self) -> String {
        format!("{}/api/v1", self.webserver_url.trim_end_matches('/'))
    }
}

/// Basic-auth credential for the orchestrator API, acquired once per
/// process run and never refreshed mid-run.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Service account the reconciler authenticates as.
pub const SERVICE_ACCOUNT_USER: &str = "svc-orchestrator";
/// Secret holding the service account's API password.
pub const SERVICE_ACCOUNT_SECRET: &str = "svc-orchestrator-api-password";
/// Environment variable overriding the secret lookup for local runs.
pub const PASSWORD_ENV_VAR: &str = "SKYSYNC_API_PASSWORD";

impl Credentials {
    /// Resolve the service credential: environment override first, then
    /// the secret store.
    pub async fn resolve(secrets: &dyn crate::secrets::SecretStore) -> Result<Self> {
        let password = match std::env::var(PASSWORD_ENV_VAR) {
            Ok(value) => value,
            Err(_) => secrets.get_secret(SERVICE_ACCOUNT_SECRET).await?,
        };
        Ok(Self {
            username: SERVICE_ACCOUNT_USER.to_string(),
            password,
        })
    }
}

/// HTTP client for one target environment.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(ctx: &ApiContext, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: ctx.base_url(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        tracing::debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    async fn check(
        method: &'static str,
        url: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Remote {
            method,
            url: url.to_string(),
            status,
            body,
        })
    }

    /// GET a JSON document.
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.url(path);
        let response = self.request(Method::GET, &url).query(query).send().await?;
        let response = Self::check("GET", &url, response).await?;
        Ok(response.json().await?)
    }

    /// Drain a paginated collection endpoint: request increasing offsets
    /// until a page's item array comes back empty.
    pub async fn paginate(&self, path: &str, field: &'static str) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut offset: u64 = 0;
        loop {
            let page = self
                .get_json(path, &[("offset", offset.to_string())])
                .await?;
            let Some(page_items) = page.get(field).and_then(Value::as_array) else {
                return Err(ApiError::Malformed {
                    url: self.url(path),
                    field,
                });
            };
            if page_items.is_empty() {
                break;
            }
            items.extend(page_items.iter().cloned());
            offset += PAGE_SIZE;
        }
        Ok(items)
    }

    /// List the identifiers currently present for a kind.
    pub async fn list_identifiers(&self, kind: MetadataKind) -> Result<Vec<String>> {
        let items = self.paginate(kind.api_path(), kind.api_path()).await?;
        let mut ids = Vec::with_capacity(items.len());
        for item in &items {
            let Some(id) = item.get(kind.id_field()).and_then(Value::as_str) else {
                return Err(ApiError::Malformed {
                    url: self.url(kind.api_path()),
                    field: kind.id_field(),
                });
            };
            ids.push(id.to_string());
        }
        Ok(ids)
    }

    /// Update-or-create: PATCH the resource; when the kind supports
    /// creation, a 404 falls back to POST on the collection endpoint.
    pub async fn upsert(&self, kind: MetadataKind, id: &str, payload: &Value) -> Result<()> {
        let url = self.url(&format!("{}/{}", kind.api_path(), id));
        let response = self
            .request(Method::PATCH, &url)
            .json(payload)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND && kind.creates_on_missing() {
            tracing::info!("Creating {} {}", kind, id);
            let url = self.url(kind.api_path());
            let response = self
                .request(Method::POST, &url)
                .json(payload)
                .send()
                .await?;
            Self::check("POST", &url, response).await?;
            return Ok(());
        }

        Self::check("PATCH", &url, response).await?;
        Ok(())
    }

    /// PATCH with an explicit query string (no create fallback).
    pub async fn patch_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        payload: &Value,
    ) -> Result<()> {
        let url = self.url(path);
        let response = self
            .request(Method::PATCH, &url)
            .query(query)
            .json(payload)
            .send()
            .await?;
        Self::check("PATCH", &url, response).await?;
        Ok(())
    }

    /// Delete a resource. 204 is success; 404 means already gone and is
    /// tolerated.
    pub async fn delete(&self, kind: MetadataKind, id: &str) -> Result<()> {
        let url = self.url(&format!("{}/{}", kind.api_path(), id));
        let response = self.request(Method::DELETE, &url).send().await?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Remote {
                    method: "DELETE",
                    url,
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
