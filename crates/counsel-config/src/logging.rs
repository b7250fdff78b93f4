//! Logging initialization for the client binaries.
//!
//! Thin wrapper over the observability crate: stderr output for the
//! operator, plus a JSONL file under `~/.counsel/logs` when one can be
//! resolved.

use crate::Paths;
use observability::LogConfig;

/// Initialize logging for a client binary.
///
/// * `service_name` - recorded in the startup event
/// * `level` - default level when `RUST_LOG` is unset
/// * `paths` - where the JSONL log file lives; `None` logs to stderr only
pub fn init_logging(service_name: &str, level: &str, paths: Option<&Paths>) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        log_path: paths.map(Paths::log_file),
        also_stderr: true,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
