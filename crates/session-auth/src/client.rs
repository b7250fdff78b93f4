//! API client with CSRF and session recovery.
//!
//! Every request goes through the same pipeline:
//!
//! ```text
//! request ──► attach X-CSRF-Token (mutating verbs) ──► transport
//!                                                         │
//!   403 "csrf"  ── first time ──► refresh token, replay ◄─┤
//!   401 (non-auth path) ── first time ──► POST /auth/refresh, replay
//!   401 again / refresh failed ──► session expired, navigate to login
//!   403 / 429 / 5xx / timeout / unreachable ──► notify, return error
//! ```
//!
//! Concurrent 401s each run their own refresh; refreshes are not
//! deduplicated.

use crate::attempt::RequestAttempt;
use crate::csrf::{CsrfTokenCache, CSRF_HEADER};
use crate::effects::{Navigator, NotificationKind, Notifier};
use crate::state::SessionState;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::types::endpoints;
use crate::{AuthError, AuthResult};
use reqwest::header::HeaderName;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// API client shared by every caller in the application.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    csrf: Arc<CsrfTokenCache>,
    state: Arc<SessionState>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    auth_path_prefix: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("auth_path_prefix", &self.auth_path_prefix)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        csrf: Arc<CsrfTokenCache>,
        state: Arc<SessionState>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        auth_path_prefix: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            csrf,
            state,
            notifier,
            navigator,
            auth_path_prefix: auth_path_prefix.into(),
        }
    }

    /// Send a request through the full pipeline.
    ///
    /// Returns the response for any 2xx/3xx status. Every other outcome is an
    /// [`AuthError`] after at most one CSRF replay and one session-refresh
    /// replay.
    pub async fn send(&self, request: ApiRequest) -> AuthResult<ApiResponse> {
        let mut attempt = RequestAttempt::new();

        loop {
            let response = match self.dispatch(&request, &attempt).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        request_id = %attempt.request_id(),
                        path = %request.path,
                        error = %e,
                        "Request failed before a response"
                    );
                    self.report(&e);
                    return Err(e);
                }
            };

            if response.status.is_success() || response.status.is_redirection() {
                return Ok(response);
            }

            match response.error() {
                AuthError::CsrfRejected => {
                    if !attempt.claim_csrf_retry() {
                        warn!(
                            request_id = %attempt.request_id(),
                            path = %request.path,
                            "CSRF token rejected after refresh"
                        );
                        return Err(AuthError::CsrfRejected);
                    }
                    warn!(
                        request_id = %attempt.request_id(),
                        path = %request.path,
                        "CSRF token rejected, refreshing and retrying"
                    );
                    self.csrf.refresh().await;
                }
                AuthError::Unauthorized if !self.is_auth_path(&request.path) => {
                    if !attempt.claim_auth_retry() {
                        warn!(
                            request_id = %attempt.request_id(),
                            path = %request.path,
                            "Still unauthorized after session refresh"
                        );
                        self.expire_session();
                        return Err(AuthError::Unauthorized);
                    }
                    if let Err(e) = self.refresh_session().await {
                        warn!(
                            request_id = %attempt.request_id(),
                            error = %e,
                            "Session refresh failed"
                        );
                        self.expire_session();
                        return Err(AuthError::Unauthorized);
                    }
                    debug!(
                        request_id = %attempt.request_id(),
                        path = %request.path,
                        "Session refreshed, retrying"
                    );
                }
                error => {
                    debug!(
                        request_id = %attempt.request_id(),
                        path = %request.path,
                        status = response.status.as_u16(),
                        "Request failed"
                    );
                    self.report(&error);
                    return Err(error);
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AuthResult<T> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> AuthResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> AuthResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, body).await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> AuthResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, body).await
    }

    pub async fn delete(&self, path: &str) -> AuthResult<()> {
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> AuthResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(method, path).with_json(serde_json::to_value(body)?);
        self.send(request).await?.json()
    }

    /// Ask the server to extend the current session.
    ///
    /// Sent outside the retry pipeline so a 401 here never recurses.
    pub async fn refresh_session(&self) -> AuthResult<()> {
        let attempt = RequestAttempt::new();
        let response = self
            .dispatch(&ApiRequest::post(endpoints::REFRESH), &attempt)
            .await?;

        if response.is_success() {
            info!(request_id = %attempt.request_id(), "Session refreshed");
            Ok(())
        } else {
            Err(response.error())
        }
    }

    /// Attach the CSRF header if needed and hand the request to the transport.
    pub(crate) async fn dispatch(
        &self,
        request: &ApiRequest,
        attempt: &RequestAttempt,
    ) -> AuthResult<ApiResponse> {
        let mut outgoing = request.clone();

        if outgoing.is_mutating() {
            match self.csrf.get_token().await {
                Some(token) => {
                    outgoing.set_header(HeaderName::from_static(CSRF_HEADER), &token)?
                }
                None => debug!(
                    request_id = %attempt.request_id(),
                    "No CSRF token available, sending without one"
                ),
            }
        }

        debug!(
            request_id = %attempt.request_id(),
            method = %outgoing.method,
            path = %outgoing.path,
            csrf_retried = attempt.csrf_retried(),
            auth_retried = attempt.auth_retried(),
            "Dispatching request"
        );

        self.transport.send(outgoing).await.map_err(AuthError::from)
    }

    fn is_auth_path(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        path.starts_with(&self.auth_path_prefix)
    }

    /// Move to anonymous and tell the user, once per expiry.
    fn expire_session(&self) {
        if !self.state.session_expired() {
            debug!("Session already anonymous, not signalling expiry again");
            return;
        }
        info!("Session expired, signing out");
        self.notifier.notify(
            NotificationKind::SessionExpired,
            NotificationKind::SessionExpired.default_message(),
        );
        self.navigator.force_session_expired();
    }

    fn report(&self, error: &AuthError) {
        let Some(kind) = error.notification_kind() else {
            return;
        };
        let message = match error {
            AuthError::Forbidden(message) if !message.is_empty() => message.as_str(),
            _ => kind.default_message(),
        };
        self.notifier.notify(kind, message);
    }
}
