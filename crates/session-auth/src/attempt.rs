//! Per-request retry bookkeeping.

use uuid::Uuid;

/// Tracks which one-shot retries a logical request has already used.
///
/// One value lives for one caller-visible request, across its replays, so a
/// request is replayed at most once per failure class.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    request_id: Uuid,
    csrf_retried: bool,
    auth_retried: bool,
}

impl RequestAttempt {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            csrf_retried: false,
            auth_retried: false,
        }
    }

    /// Correlation id used in log events.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn csrf_retried(&self) -> bool {
        self.csrf_retried
    }

    pub fn auth_retried(&self) -> bool {
        self.auth_retried
    }

    /// Claim the CSRF retry. Returns false if it was already used.
    pub fn claim_csrf_retry(&mut self) -> bool {
        !std::mem::replace(&mut self.csrf_retried, true)
    }

    /// Claim the session-refresh retry. Returns false if it was already used.
    pub fn claim_auth_retry(&mut self) -> bool {
        !std::mem::replace(&mut self.auth_retried, true)
    }
}

impl Default for RequestAttempt {
    fn default() -> Self {
        Self::new()
    }
}
