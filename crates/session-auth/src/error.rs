//! Error taxonomy for the session layer.

use crate::effects::NotificationKind;
use thiserror::Error;

/// Authentication and API error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Server rejected the CSRF token (HTTP 403 with a CSRF message)
    #[error("CSRF token rejected")]
    CsrfRejected,

    /// Session missing or expired (HTTP 401)
    #[error("Not authorized")]
    Unauthorized,

    /// Authenticated but not allowed (HTTP 403, non-CSRF)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Too many requests (HTTP 429)
    #[error("Rate limited")]
    RateLimited,

    /// Server-side failure (HTTP 5xx)
    #[error("Server error: HTTP {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Client-side request timeout
    #[error("Request timed out")]
    Timeout,

    /// Could not reach the API
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// Request rejected by the API for any other 4xx reason
    #[error("Request rejected: HTTP {status}: {message}")]
    Validation { status: u16, message: String },

    /// Transport failure that is neither a timeout nor a connect error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client construction error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AuthError {
    /// Map a non-success HTTP status and its body message to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => AuthError::Unauthorized,
            403 if is_csrf_message(&message) => AuthError::CsrfRejected,
            403 => AuthError::Forbidden(message),
            429 => AuthError::RateLimited,
            s if s >= 500 => AuthError::ServerError { status: s, message },
            s => AuthError::Validation { status: s, message },
        }
    }

    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Timeout | AuthError::NetworkUnreachable(_) => true,
            AuthError::ServerError { .. } => true,
            AuthError::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Notification raised for this error by the API client, if any.
    ///
    /// CSRF and authorization failures are handled by retry or by session
    /// expiry, and validation errors belong to the form that caused them.
    pub fn notification_kind(&self) -> Option<NotificationKind> {
        match self {
            AuthError::Forbidden(_) => Some(NotificationKind::Forbidden),
            AuthError::RateLimited => Some(NotificationKind::RateLimited),
            AuthError::ServerError { .. } => Some(NotificationKind::ServerError),
            AuthError::Timeout => Some(NotificationKind::Timeout),
            AuthError::NetworkUnreachable(_) => Some(NotificationKind::NetworkUnreachable),
            _ => None,
        }
    }
}

impl From<counsel_config::ConfigError> for AuthError {
    fn from(e: counsel_config::ConfigError) -> Self {
        AuthError::Config(e.to_string())
    }
}

/// True when a 403 body message names the CSRF check.
pub(crate) fn is_csrf_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains("csrf")
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
