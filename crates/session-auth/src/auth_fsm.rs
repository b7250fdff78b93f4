//! Session state machine using rust-fsm.
//!
//! The client never reads the session cookie; it only learns whether the
//! server considers the session valid. This machine records that knowledge.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │    Checking     │ (initial)
//! └────────┬────────┘
//!          │
//!          ├── SessionConfirmed / LoginSucceeded ──► Authenticated
//!          │
//!          └── SessionMissing / SessionExpired / LoggedOut ──► Anonymous
//!
//! ┌─────────────────┐  LoginSucceeded   ┌─────────────────┐
//! │    Anonymous    │ ────────────────► │  Authenticated  │
//! │                 │ ◄──────────────── │                 │
//! └────────┬────────┘  SessionExpired   └────────┬────────┘
//!          │           SessionMissing            │
//!          │           LoggedOut                 │
//!          │                                     │
//!          └──────────── Recheck ────────────────┴──► Checking
//! ```
//!
//! `Checking` is only re-entered through an explicit `Recheck`.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Checking)

    Checking => {
        SessionConfirmed => Authenticated,
        LoginSucceeded => Authenticated,
        SessionMissing => Anonymous,
        SessionExpired => Anonymous,
        LoggedOut => Anonymous
    },
    Anonymous => {
        LoginSucceeded => Authenticated,
        SessionConfirmed => Authenticated,
        // Repeated failures keep the session anonymous
        SessionMissing => Anonymous,
        SessionExpired => Anonymous,
        LoggedOut => Anonymous,
        Recheck => Checking
    },
    Authenticated => {
        // A new login or confirmation may replace the user record
        LoginSucceeded => Authenticated,
        SessionConfirmed => Authenticated,
        SessionMissing => Anonymous,
        SessionExpired => Anonymous,
        LoggedOut => Anonymous,
        Recheck => Checking
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Public view of the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The server has not been asked yet.
    Checking,
    /// No valid session.
    Anonymous,
    /// The server confirmed the session.
    Authenticated,
}

impl SessionStatus {
    /// Returns true only for a confirmed session.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionStatus::Authenticated)
    }

    /// Returns true while the initial check has not concluded.
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionStatus::Checking)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Checking => "checking",
            SessionStatus::Anonymous => "anonymous",
            SessionStatus::Authenticated => "authenticated",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&SessionMachineState> for SessionStatus {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Checking => SessionStatus::Checking,
            SessionMachineState::Anonymous => SessionStatus::Anonymous,
            SessionMachineState::Authenticated => SessionStatus::Authenticated,
        }
    }
}
