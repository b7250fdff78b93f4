//! HTTP transport seam.
//!
//! Everything above this module talks in [`ApiRequest`] and [`ApiResponse`].
//! Production uses [`ReqwestTransport`], which shares a cookie jar with the
//! cookie inspector; tests substitute a scripted transport.

use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use reqwest::cookie::CookieStore;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Longest body excerpt used as an error message.
const MAX_MESSAGE_LEN: usize = 200;

/// A request relative to the API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a header, replacing any previous value.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> AuthResult<()> {
        let value = HeaderValue::from_str(value).map_err(|e| {
            AuthError::InvalidResponse(format!("invalid value for header {name}: {e}"))
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// POST, PUT, PATCH and DELETE change server state and need a CSRF token.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }
}

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body. An empty body decodes as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> AuthResult<T> {
        let body = self.body.trim();
        let body = if body.is_empty() { "null" } else { body };
        serde_json::from_str(body).map_err(AuthError::from)
    }

    /// Best human-readable message in the body.
    ///
    /// Prefers a JSON `message` or `error` string, then the raw body text,
    /// then the canonical reason for the status code.
    pub fn message(&self) -> String {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&self.body) {
            for key in ["message", "error"] {
                if let Some(Value::String(message)) = map.get(key) {
                    return message.clone();
                }
            }
        }

        let text = self.body.trim();
        if !text.is_empty() {
            return text.chars().take(MAX_MESSAGE_LEN).collect();
        }

        self.status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    }

    /// Classify a non-success response.
    pub fn error(&self) -> AuthError {
        AuthError::from_status(self.status.as_u16(), self.message())
    }
}

/// Failure to obtain any HTTP response.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Unreachable(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Unreachable(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

impl From<TransportError> for AuthError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Timeout => AuthError::Timeout,
            TransportError::Unreachable(message) => AuthError::NetworkUnreachable(message),
            TransportError::InvalidUrl(e) => AuthError::InvalidUrl(e),
            TransportError::Other(message) => AuthError::Transport(message),
        }
    }
}

/// Sends one request and returns the response, whatever its status.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// reqwest-backed transport with a shared cookie store.
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Build a transport whose cookies live in `cookie_store`.
    pub fn new<C>(base_url: &Url, timeout: Duration, cookie_store: Arc<C>) -> AuthResult<Self>
    where
        C: CookieStore + 'static,
    {
        let http_client = reqwest::Client::builder()
            .cookie_provider(cookie_store)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Join a request path onto the base URL, keeping the base path.
    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{}", self.base_url, path))?)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        debug!(method = %request.method, %url, "HTTP request");

        let mut builder = self
            .http_client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(status = status.as_u16(), "HTTP response");
        Ok(ApiResponse { status, body })
    }
}
