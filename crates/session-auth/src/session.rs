//! Session operations: OTP login, current-user check, logout.

use crate::auth_fsm::SessionStatus;
use crate::client::ApiClient;
use crate::cookies::CookieInspector;
use crate::csrf::CsrfTokenCache;
use crate::state::SessionState;
use crate::transport::ApiRequest;
use crate::types::{endpoints, RequestOtpBody, User, UserEnvelope, UserRole, VerifyOtpBody};
use crate::{AuthError, AuthResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives the session state machine through the API.
pub struct SessionManager {
    client: Arc<ApiClient>,
    state: Arc<SessionState>,
    cookies: Arc<CookieInspector>,
    csrf: Arc<CsrfTokenCache>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(
        client: Arc<ApiClient>,
        state: Arc<SessionState>,
        cookies: Arc<CookieInspector>,
        csrf: Arc<CsrfTokenCache>,
    ) -> Self {
        Self {
            client,
            state,
            cookies,
            csrf,
        }
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// Ask the server to email a one-time password.
    pub async fn request_otp(&self, email: &str, role: UserRole) -> AuthResult<()> {
        info!(email, %role, "Requesting OTP");

        let body = RequestOtpBody { email, role };
        match self
            .client
            .post_json::<_, Value>(endpoints::REQUEST_OTP, &body)
            .await
        {
            Ok(_) => {
                self.state.otp_requested();
                info!(email, "OTP sent");
                Ok(())
            }
            Err(e) => {
                warn!(email, error = %e, "OTP request failed");
                self.state.record_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Exchange the OTP for a session. The server sets the session cookie.
    ///
    /// On failure the status is left as it was and the error is recorded.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> AuthResult<User> {
        info!(email, "Verifying OTP");

        let body = VerifyOtpBody { email, otp };
        let result = self
            .client
            .post_json::<_, UserEnvelope>(endpoints::VERIFY_OTP, &body)
            .await
            .and_then(|envelope| {
                envelope.user.ok_or_else(|| {
                    AuthError::InvalidResponse("verify-otp response has no user".to_string())
                })
            });

        match result {
            Ok(user) => {
                self.state.login_succeeded(user.clone())?;
                info!(user_id = %user.id, role = %user.role, "Login succeeded");
                Ok(user)
            }
            Err(e) => {
                warn!(email, error = %e, "OTP verification failed");
                self.state.record_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Ask the server who the session belongs to.
    ///
    /// Any failure means no usable session: the state becomes anonymous.
    /// A login that completes while the request is in flight wins over a
    /// failed check.
    pub async fn fetch_current_user(&self) -> AuthResult<User> {
        debug!("Fetching current user");
        let generation = self.state.login_generation();

        let result = self
            .client
            .get_json::<UserEnvelope>(endpoints::CURRENT_USER)
            .await
            .and_then(|envelope| {
                envelope.user.ok_or_else(|| {
                    AuthError::InvalidResponse("/auth/me response has no user".to_string())
                })
            });

        match result {
            Ok(user) => {
                self.state.session_confirmed(user.clone())?;
                debug!(user_id = %user.id, "Session confirmed");
                Ok(user)
            }
            Err(e) => {
                let cleared = self
                    .state
                    .session_missing_unless_login_since(generation, Some(e.to_string()))?;
                if cleared {
                    debug!(error = %e, "No valid session");
                } else {
                    info!(error = %e, "Login completed during session check, keeping it");
                }
                Err(e)
            }
        }
    }

    /// End the session. Always leaves the state anonymous, even when the
    /// server cannot be reached.
    pub async fn logout(&self) {
        info!("Logging out");

        if let Err(e) = self.client.send(ApiRequest::post(endpoints::LOGOUT)).await {
            warn!(error = %e, "Logout request failed, clearing local session anyway");
        }

        self.csrf.invalidate();
        if let Err(e) = self.state.logged_out() {
            warn!(error = %e, "Could not record logout");
        }
        info!("Logged out");
    }

    /// Local-only check used when the server has not been asked.
    ///
    /// Without a session cookie the state becomes anonymous and `false` is
    /// returned. With one, nothing changes and `true` is returned; only the
    /// server can confirm it. A recorded error is kept.
    pub fn check_session(&self) -> bool {
        self.check_session_since(self.state.login_generation())
    }

    /// [`check_session`](Self::check_session) that leaves the state alone if
    /// a login completed after `generation` was read.
    pub(crate) fn check_session_since(&self, generation: u64) -> bool {
        if self.cookies.has_session_cookie() {
            debug!("Session cookie present");
            return true;
        }

        debug!("No session cookie");
        if self.state.status() == SessionStatus::Anonymous {
            return false;
        }
        match self
            .state
            .session_missing_unless_login_since(generation, None)
        {
            Ok(true) => {}
            Ok(false) => debug!("Login completed meanwhile, keeping session"),
            Err(e) => warn!(error = %e, "Could not record missing session"),
        }
        false
    }

    pub fn has_session_cookie(&self) -> bool {
        self.cookies.has_session_cookie()
    }

    /// Extend the session on the server, then re-read the user.
    pub async fn refresh_session(&self) -> AuthResult<User> {
        self.client.refresh_session().await?;
        self.fetch_current_user().await
    }
}
