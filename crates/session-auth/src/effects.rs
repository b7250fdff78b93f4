//! Outward effects of the API client.
//!
//! The client never renders anything itself. Error notifications go to a
//! [`Notifier`] and the forced return to the login screen goes to a
//! [`Navigator`]. The embedding application decides what they mean.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Category of a user-visible error notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Forbidden,
    RateLimited,
    ServerError,
    Timeout,
    NetworkUnreachable,
    SessionExpired,
}

impl NotificationKind {
    /// Message shown when the server did not supply a better one.
    pub fn default_message(&self) -> &'static str {
        match self {
            NotificationKind::Forbidden => "You do not have permission to perform this action.",
            NotificationKind::RateLimited => "Too many requests. Please wait a moment and try again.",
            NotificationKind::ServerError => "The server encountered an error. Please try again later.",
            NotificationKind::Timeout => "The request timed out. Please try again.",
            NotificationKind::NetworkUnreachable => {
                "Unable to reach the server. Check your connection."
            }
            NotificationKind::SessionExpired => "Your session has expired. Please log in again.",
        }
    }
}

/// Receives user-visible error notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Receives the request to leave the current screen after session expiry.
pub trait Navigator: Send + Sync {
    fn force_session_expired(&self);
}

/// Discards all notifications.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _kind: NotificationKind, _message: &str) {}
}

/// Ignores navigation requests.
#[derive(Debug, Default)]
pub struct NullNavigator;

impl Navigator for NullNavigator {
    fn force_session_expired(&self) {}
}

/// A notifier that records everything it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<(NotificationKind, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded notifications in order.
    pub fn notifications(&self) -> Vec<(NotificationKind, String)> {
        self.notifications.lock().expect("lock poisoned").clone()
    }

    /// Returns only the kinds, in order.
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.notifications
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.notifications.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.notifications
            .lock()
            .expect("lock poisoned")
            .push((kind, message.to_string()));
    }
}

/// A navigator that counts forced redirects.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: AtomicUsize,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn force_session_expired(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        assert!(notifier.is_empty());

        notifier.notify(NotificationKind::Timeout, "slow");
        notifier.notify(NotificationKind::RateLimited, "busy");

        assert_eq!(notifier.len(), 2);
        assert_eq!(
            notifier.kinds(),
            vec![NotificationKind::Timeout, NotificationKind::RateLimited]
        );
        assert_eq!(notifier.notifications()[0].1, "slow");
    }

    #[test]
    fn recording_navigator_counts() {
        let navigator = RecordingNavigator::new();
        navigator.force_session_expired();
        navigator.force_session_expired();
        assert_eq!(navigator.redirects(), 2);
    }

    #[test]
    fn null_effects_discard() {
        NullNotifier.notify(NotificationKind::ServerError, "ignored");
        NullNavigator.force_session_expired();
    }

    #[test]
    fn every_kind_has_a_message() {
        for kind in [
            NotificationKind::Forbidden,
            NotificationKind::RateLimited,
            NotificationKind::ServerError,
            NotificationKind::Timeout,
            NotificationKind::NetworkUnreachable,
            NotificationKind::SessionExpired,
        ] {
            assert!(!kind.default_message().is_empty());
        }
    }
}
