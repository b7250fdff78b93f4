//! CLI command implementations.

mod auth;
mod config;

pub use auth::{login, logout, status, whoami};
pub use config::{config_path, config_show};

use crate::cookies::CookieFile;
use anyhow::Result;
use counsel_config::{Config, Paths};
use session_auth::{AuthRuntime, Navigator, NotificationKind, Notifier};
use std::sync::Arc;
use tracing::debug;

/// Load the config file (or defaults) with environment overrides.
pub fn load_config() -> Result<(Paths, Config)> {
    let paths = Paths::new()?;
    let config = Config::load(&paths)?;
    debug!(api = %config.api_base_url, "Loaded configuration");
    Ok((paths, config))
}

/// Build a session runtime that reports to the terminal, using the cookies
/// saved by earlier commands.
pub fn connect(paths: &Paths, config: &Config) -> Result<(AuthRuntime, CookieFile)> {
    let cookies = CookieFile::load(paths.cookies_file())?;
    let runtime = AuthRuntime::connect_with_cookies(
        config,
        cookies.store(),
        Arc::new(TerminalNotifier),
        Arc::new(TerminalNavigator),
    )?;
    Ok((runtime, cookies))
}

/// Prints API error notifications to stderr.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        debug!(?kind, message, "API notification");
        eprintln!("! {}", message);
    }
}

/// There is no login screen to return to; tell the user what to run.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn force_session_expired(&self) {
        eprintln!("Run 'counsel login' to sign in again.");
    }
}
