//! Shared session state.
//!
//! One [`SessionState`] exists per runtime. Only this crate moves it between
//! states; embedders read snapshots or subscribe to [`SessionEvent`]s.

use crate::auth_fsm::{SessionMachine, SessionMachineInput, SessionStatus};
use crate::types::{User, UserRole};
use crate::{AuthError, AuthResult};
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Point-in-time copy of the session state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub user: Option<User>,
    /// An OTP was requested and not yet verified.
    pub otp_sent: bool,
    /// Message of the last failed session operation.
    pub error: Option<String>,
    /// When the last successful OTP verification happened.
    pub last_login_at: Option<Instant>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.status.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }
}

/// Published whenever the status or the current user changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEvent {
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

struct Inner {
    fsm: SessionMachine,
    user: Option<User>,
    otp_sent: bool,
    error: Option<String>,
    last_login_at: Option<Instant>,
    /// Bumped on every successful login.
    login_generation: u64,
}

impl Inner {
    fn status(&self) -> SessionStatus {
        SessionStatus::from(self.fsm.state())
    }

    fn event(&self) -> SessionEvent {
        SessionEvent {
            status: self.status(),
            user_id: self.user.as_ref().map(|u| u.id.clone()),
            email: self.user.as_ref().map(|u| u.email.clone()),
            role: self.user.as_ref().map(|u| u.role),
        }
    }
}

/// FSM-backed session state with change notifications.
pub struct SessionState {
    inner: Mutex<Inner>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                fsm: SessionMachine::new(),
                user: None,
                otp_sent: false,
                error: None,
                last_login_at: None,
                login_generation: 0,
            }),
            events,
        }
    }

    /// Subscribe to status and user changes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status().is_authenticated()
    }

    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn otp_sent(&self) -> bool {
        self.lock().otp_sent
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn clear_error(&self) {
        self.lock().error = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            status: inner.status(),
            user: inner.user.clone(),
            otp_sent: inner.otp_sent,
            error: inner.error.clone(),
            last_login_at: inner.last_login_at,
        }
    }

    /// True if a login completed less than `grace` ago.
    pub fn within_grace_period(&self, grace: Duration) -> bool {
        self.lock()
            .last_login_at
            .is_some_and(|at| at.elapsed() < grace)
    }

    /// Number of successful logins so far.
    ///
    /// Read before a slow check and pass to
    /// [`session_missing_unless_login_since`](Self::session_missing_unless_login_since)
    /// so a login that lands in between is not undone.
    pub fn login_generation(&self) -> u64 {
        self.lock().login_generation
    }

    pub(crate) fn otp_requested(&self) {
        let mut inner = self.lock();
        inner.otp_sent = true;
        inner.error = None;
    }

    pub(crate) fn record_error(&self, message: impl Into<String>) {
        self.lock().error = Some(message.into());
    }

    pub(crate) fn login_succeeded(&self, user: User) -> AuthResult<SessionStatus> {
        self.transition(&SessionMachineInput::LoginSucceeded, |inner| {
            inner.user = Some(user);
            inner.otp_sent = false;
            inner.error = None;
            inner.last_login_at = Some(Instant::now());
            inner.login_generation += 1;
        })
    }

    pub(crate) fn session_confirmed(&self, user: User) -> AuthResult<SessionStatus> {
        self.transition(&SessionMachineInput::SessionConfirmed, |inner| {
            inner.user = Some(user);
            inner.error = None;
        })
    }

    /// No usable session. `None` keeps any error already recorded.
    pub(crate) fn session_missing(&self, error: Option<String>) -> AuthResult<SessionStatus> {
        self.transition(&SessionMachineInput::SessionMissing, |inner| {
            inner.user = None;
            if error.is_some() {
                inner.error = error;
            }
        })
    }

    /// Like [`session_missing`](Self::session_missing), unless a login
    /// completed after `generation` was read. Returns whether it applied.
    pub(crate) fn session_missing_unless_login_since(
        &self,
        generation: u64,
        error: Option<String>,
    ) -> AuthResult<bool> {
        let applied = self.transition_if(
            &SessionMachineInput::SessionMissing,
            |inner| inner.login_generation == generation,
            |inner| {
                inner.user = None;
                if error.is_some() {
                    inner.error = error;
                }
            },
        )?;
        Ok(applied.is_some())
    }

    pub(crate) fn logged_out(&self) -> AuthResult<SessionStatus> {
        self.transition(&SessionMachineInput::LoggedOut, |inner| {
            inner.user = None;
            inner.otp_sent = false;
            inner.error = None;
            inner.last_login_at = None;
        })
    }

    /// Mark the session as expired. Returns true if it was not already anonymous.
    pub(crate) fn session_expired(&self) -> bool {
        let applied = self.transition_if(
            &SessionMachineInput::SessionExpired,
            |inner| inner.status() != SessionStatus::Anonymous,
            |inner| {
                inner.user = None;
                inner.last_login_at = None;
            },
        );
        matches!(applied, Ok(Some(_)))
    }

    /// Return to `Checking` ahead of an explicit re-initialization.
    pub(crate) fn begin_check(&self) -> AuthResult<SessionStatus> {
        if self.status() == SessionStatus::Checking {
            return Ok(SessionStatus::Checking);
        }
        self.transition(&SessionMachineInput::Recheck, |inner| {
            inner.error = None;
        })
    }

    /// Apply an FSM input and its data changes, then publish if anything visible changed.
    fn transition(
        &self,
        input: &SessionMachineInput,
        apply: impl FnOnce(&mut Inner),
    ) -> AuthResult<SessionStatus> {
        match self.transition_if(input, |_| true, apply)? {
            Some(status) => Ok(status),
            None => Ok(self.status()),
        }
    }

    /// [`transition`](Self::transition) guarded by `allowed`, checked under
    /// the same lock. Returns `None` when the guard refused.
    fn transition_if(
        &self,
        input: &SessionMachineInput,
        allowed: impl FnOnce(&Inner) -> bool,
        apply: impl FnOnce(&mut Inner),
    ) -> AuthResult<Option<SessionStatus>> {
        let mut inner = self.lock();
        if !allowed(&*inner) {
            return Ok(None);
        }
        let before = inner.event();

        inner.fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                inner.fsm.state()
            ))
        })?;
        apply(&mut *inner);

        let after = inner.event();
        drop(inner);

        debug!(
            input = ?input,
            from = %before.status,
            to = %after.status,
            "Session state transition"
        );

        if before != after {
            if before.status != after.status {
                info!(from = %before.status, to = %after.status, "Session status changed");
            }
            let status = after.status;
            // No subscribers is fine.
            let _ = self.events.send(after);
            return Ok(Some(status));
        }

        Ok(Some(after.status))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("lock poisoned")
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
