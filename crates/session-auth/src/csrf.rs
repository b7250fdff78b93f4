//! CSRF token cache.
//!
//! Resolution order for a token:
//! 1. the cached value from an earlier fetch
//! 2. the CSRF cookie, read fresh on every call and never cached
//! 3. `GET /auth/csrf-token`, whose result is cached
//!
//! Concurrent callers that miss the first two share one fetch.

use crate::cookies::CookieInspector;
use crate::transport::{ApiRequest, HttpTransport};
use crate::types::{endpoints, CsrfTokenResponse};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Header carrying the token on mutating requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Single-slot token cache shared by every request of a session.
pub struct CsrfTokenCache {
    slot: Mutex<Option<String>>,
    /// Held for the duration of a network fetch.
    fetch_lock: tokio::sync::Mutex<()>,
    cookies: Arc<CookieInspector>,
    transport: Arc<dyn HttpTransport>,
}

impl CsrfTokenCache {
    pub fn new(cookies: Arc<CookieInspector>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            slot: Mutex::new(None),
            fetch_lock: tokio::sync::Mutex::new(()),
            cookies,
            transport,
        }
    }

    /// Resolve a token, fetching one only if neither cache nor cookie has it.
    ///
    /// Returns `None` when no token could be obtained; the caller sends the
    /// request without the header and lets the server decide.
    pub async fn get_token(&self) -> Option<String> {
        if let Some(token) = self.cached() {
            return Some(token);
        }
        if let Some(token) = self.cookies.read_csrf_cookie() {
            return Some(token);
        }

        let _guard = self.fetch_lock.lock().await;

        // Another caller may have completed the fetch while we waited.
        if let Some(token) = self.cached() {
            return Some(token);
        }
        if let Some(token) = self.cookies.read_csrf_cookie() {
            return Some(token);
        }

        self.fetch().await
    }

    /// Drop the cached token and fetch a new one from the server.
    ///
    /// Used after the server rejected a token, so the cookie is skipped.
    pub async fn refresh(&self) -> Option<String> {
        let _guard = self.fetch_lock.lock().await;
        self.invalidate();
        self.fetch().await
    }

    /// Clear the cache so the next [`get_token`](Self::get_token) resolves afresh.
    pub fn invalidate(&self) {
        let previous = self.slot.lock().expect("lock poisoned").take();
        if previous.is_some() {
            debug!("CSRF token cache cleared");
        }
    }

    /// The cached token, without any fallback.
    pub fn cached(&self) -> Option<String> {
        self.slot.lock().expect("lock poisoned").clone()
    }

    async fn fetch(&self) -> Option<String> {
        debug!("Fetching CSRF token");

        let response = match self
            .transport
            .send(ApiRequest::get(endpoints::CSRF_TOKEN))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "CSRF token fetch failed");
                return None;
            }
        };

        if !response.is_success() {
            warn!(
                status = response.status.as_u16(),
                message = %response.message(),
                "CSRF token endpoint returned an error"
            );
            return None;
        }

        let token = match response.json::<CsrfTokenResponse>() {
            Ok(body) => body.csrf_token.filter(|token| !token.is_empty()),
            Err(e) => {
                warn!(error = %e, "CSRF token response was not valid JSON");
                return None;
            }
        };

        match token {
            Some(token) => {
                *self.slot.lock().expect("lock poisoned") = Some(token.clone());
                debug!("CSRF token cached");
                Some(token)
            }
            None => {
                warn!("CSRF token response did not contain a token");
                None
            }
        }
    }
}

impl std::fmt::Debug for CsrfTokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfTokenCache")
            .field("cached", &self.cached().is_some())
            .finish_non_exhaustive()
    }
}
