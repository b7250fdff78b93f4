//! Configuration, paths and logging setup for the Counsel client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_BASE_URL, DEFAULT_AUTH_PATH_PREFIX, DEFAULT_CSRF_COOKIE_NAME,
    DEFAULT_LOGIN_GRACE_PERIOD_MS, DEFAULT_LOG_LEVEL, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_SESSION_COOKIE_NAME,
};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
