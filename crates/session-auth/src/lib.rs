//! Cookie-based session layer for the Counsel client.
//!
//! This crate provides:
//! - Read-only inspection of the session and CSRF cookies
//! - A single-flight CSRF token cache
//! - An API client that attaches CSRF tokens, replays once on CSRF
//!   rejection and once after a session refresh
//! - An explicit FSM for the session status, with change events
//! - OTP login, logout and a one-shot startup check

mod attempt;
mod auth_fsm;
mod bootstrap;
mod client;
mod cookies;
mod csrf;
mod effects;
mod error;
mod runtime;
mod session;
mod state;
mod transport;
mod types;

#[cfg(test)]
mod tests;

pub use attempt::RequestAttempt;
pub use auth_fsm::session_machine;
pub use auth_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionStatus};
pub use bootstrap::{BootstrapOutcome, SessionBootstrapper};
pub use client::ApiClient;
pub use cookies::CookieInspector;
pub use csrf::{CsrfTokenCache, CSRF_HEADER};
pub use effects::{
    Navigator, NotificationKind, Notifier, NullNavigator, NullNotifier, RecordingNavigator,
    RecordingNotifier,
};
pub use error::{AuthError, AuthResult};
pub use runtime::AuthRuntime;
pub use session::SessionManager;
pub use state::{SessionEvent, SessionSnapshot, SessionState};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport, TransportError};
pub use types::{endpoints, User, UserRole};
