//! HTTP client trait and the reqwest-backed implementation.

use crate::{ApiError, ApiResult};
use async_trait::async_trait;
use quill_storage::SessionVault;
use reqwest::Method;
use std::sync::Arc;

/// A request against the platform API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, starting with `/`.
    pub path: String,
    /// JSON body, when the request has one.
    pub body: Option<serde_json::Value>,
    /// Explicit bearer token. When absent, the client's interceptor
    /// supplies the current token from storage.
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Transport abstraction the session store talks through.
///
/// A non-2xx response surfaces as [`ApiError::Status`] so callers see
/// one classified error channel for application, transport, and
/// construction failures.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse>;
}

/// Source of the current bearer token, read at send time.
pub trait TokenSource: Send + Sync {
    fn current_token(&self) -> Option<String>;
}

impl TokenSource for SessionVault {
    fn current_token(&self) -> Option<String> {
        self.token().ok().flatten()
    }
}

/// Production [`HttpClient`] backed by `reqwest`.
pub struct ReqwestClient {
    inner: reqwest::Client,
    base_url: String,
    token_source: Option<Arc<dyn TokenSource>>,
}

impl ReqwestClient {
    /// Create a client for the given API base URL.
    ///
    /// When a `token_source` is supplied, every request except OPTIONS
    /// method negotiation carries `Authorization: Bearer <token>` read
    /// from the source at send time.
    pub fn new(base_url: impl Into<String>, token_source: Option<Arc<dyn TokenSource>>) -> Self {
        let base_url = base_url.into();
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token_source,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer_for(&self, request: &ApiRequest) -> Option<String> {
        if let Some(token) = &request.bearer {
            return Some(token.clone());
        }
        if request.method == Method::OPTIONS {
            return None;
        }
        self.token_source
            .as_ref()
            .and_then(|source| source.current_token())
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let url = self.url(&request.path);
        tracing::debug!(method = %request.method, url = %url, "Sending API request");

        let mut builder = self.inner.request(request.method.clone(), &url);
        if let Some(token) = self.bearer_for(&request) {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::debug!(status = %status, "API request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}
