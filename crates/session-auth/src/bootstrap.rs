//! One-shot session check at application start.

use crate::session::SessionManager;
use crate::AuthResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// What a bootstrap run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// An earlier run already performed the check.
    AlreadyChecked,
    /// A login just happened, so the server was not asked again.
    SkippedGracePeriod,
    /// The server confirmed the session.
    Authenticated,
    /// No valid session.
    Anonymous,
}

/// Runs the startup check at most once per process (or per [`reset`](Self::reset)).
pub struct SessionBootstrapper {
    session: Arc<SessionManager>,
    grace_period: Duration,
    checked: AtomicBool,
}

impl SessionBootstrapper {
    pub fn new(session: Arc<SessionManager>, grace_period: Duration) -> Self {
        Self {
            session,
            grace_period,
            checked: AtomicBool::new(false),
        }
    }

    pub fn has_checked(&self) -> bool {
        self.checked.load(Ordering::SeqCst)
    }

    /// Check the session with the server unless already done.
    ///
    /// Within the grace period after a login the check is skipped so a fresh
    /// cookie that is not yet visible cannot undo the login.
    pub async fn run(&self) -> BootstrapOutcome {
        if self.checked.swap(true, Ordering::SeqCst) {
            debug!("Session already checked");
            return BootstrapOutcome::AlreadyChecked;
        }

        let state = self.session.state();
        if state.within_grace_period(self.grace_period) {
            info!(
                grace_ms = self.grace_period.as_millis() as u64,
                "Recent login, skipping session check"
            );
            return BootstrapOutcome::SkippedGracePeriod;
        }

        // The cookie may be HttpOnly or scoped elsewhere, so its absence is
        // only logged. The server decides.
        debug!(
            session_cookie = self.session.has_session_cookie(),
            "Checking session with server"
        );

        let generation = state.login_generation();
        match self.session.fetch_current_user().await {
            Ok(user) => {
                info!(user_id = %user.id, "Session restored");
                BootstrapOutcome::Authenticated
            }
            Err(e) => {
                debug!(error = %e, "Server did not confirm a session");
                // A login may have landed while /auth/me was in flight.
                if state.login_generation() != generation
                    || state.within_grace_period(self.grace_period)
                {
                    info!("Login completed during session check, keeping it");
                    return if state.is_authenticated() {
                        BootstrapOutcome::Authenticated
                    } else {
                        BootstrapOutcome::Anonymous
                    };
                }
                self.session.check_session_since(generation);
                BootstrapOutcome::Anonymous
            }
        }
    }

    /// Allow the next [`run`](Self::run) to check again and return the state
    /// to `Checking`.
    pub fn reset(&self) -> AuthResult<()> {
        self.session.state().begin_check()?;
        self.checked.store(false, Ordering::SeqCst);
        debug!("Session bootstrap reset");
        Ok(())
    }
}

impl std::fmt::Debug for SessionBootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBootstrapper")
            .field("grace_period", &self.grace_period)
            .field("checked", &self.has_checked())
            .finish_non_exhaustive()
    }
}
