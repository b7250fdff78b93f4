//! Read-only view of the cookies the client holds for the API origin.
//!
//! The session cookie is opaque: only its presence is reported, never its
//! value. The CSRF cookie is the one value the client is allowed to read.

use reqwest::cookie::CookieStore;
use std::sync::Arc;
use url::Url;

/// Inspects the shared cookie store for the API origin.
pub struct CookieInspector {
    store: Arc<dyn CookieStore>,
    origin: Url,
    session_cookie_name: String,
    csrf_cookie_name: String,
}

impl std::fmt::Debug for CookieInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieInspector")
            .field("origin", &self.origin.as_str())
            .field("session_cookie_name", &self.session_cookie_name)
            .field("csrf_cookie_name", &self.csrf_cookie_name)
            .finish_non_exhaustive()
    }
}

impl CookieInspector {
    pub fn new(
        store: Arc<dyn CookieStore>,
        origin: Url,
        session_cookie_name: impl Into<String>,
        csrf_cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            origin,
            session_cookie_name: session_cookie_name.into(),
            csrf_cookie_name: csrf_cookie_name.into(),
        }
    }

    /// True if a cookie named like the session cookie is present.
    ///
    /// A `true` here says nothing about whether the server still accepts it.
    pub fn has_session_cookie(&self) -> bool {
        self.cookie(&self.session_cookie_name).is_some()
    }

    /// Current value of the CSRF cookie, if present and non-empty.
    pub fn read_csrf_cookie(&self) -> Option<String> {
        self.cookie(&self.csrf_cookie_name)
            .filter(|value| !value.is_empty())
    }

    pub fn session_cookie_name(&self) -> &str {
        &self.session_cookie_name
    }

    fn cookie(&self, name: &str) -> Option<String> {
        let header = self.store.cookies(&self.origin)?;
        let header = header.to_str().ok()?;

        let value = cookie_pairs(header)
            .find(|(cookie_name, _)| *cookie_name == name)
            .map(|(_, value)| value.to_string());
        value
    }
}

/// Split a `Cookie:` header (`a=1; b=2`) into name/value pairs.
///
/// Names match exactly; `XSRF-TOKEN` never matches `XSRF-TOKEN-legacy`.
pub(crate) fn cookie_pairs(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|part| {
        let part = part.trim();
        if part.is_empty() {
            return None;
        }
        Some(match part.split_once('=') {
            Some((name, value)) => (name.trim(), value.trim()),
            None => (part, ""),
        })
    })
}
