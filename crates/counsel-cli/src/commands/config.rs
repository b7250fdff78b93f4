//! Configuration commands.

use super::load_config;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use counsel_config::Paths;

/// Print the effective configuration.
pub async fn config_show(format: &OutputFormat) -> Result<()> {
    let (_, config) = load_config()?;

    match format {
        OutputFormat::Text => {
            output::print_row("API", &config.api_base_url);
            output::print_row("Log level", &config.log_level);
            output::print_row("Timeout", &format!("{} ms", config.request_timeout_ms));
            output::print_row("Session", &config.session_cookie_name);
            output::print_row("CSRF", &config.csrf_cookie_name);
            output::print_row("Auth prefix", &config.auth_path_prefix);
            output::print_row(
                "Grace",
                &format!("{} ms", config.login_grace_period_ms),
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Print where the config and log files live.
pub async fn config_path(format: &OutputFormat) -> Result<()> {
    let paths = Paths::new()?;
    let config_file = paths.config_file();
    let log_file = paths.log_file();
    let cookies_file = paths.cookies_file();

    match format {
        OutputFormat::Text => {
            output::print_row("Config", &config_file.display().to_string());
            output::print_row("Logs", &log_file.display().to_string());
            output::print_row("Cookies", &cookies_file.display().to_string());
            if !config_file.exists() {
                println!("(no config file; defaults in use)");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "config_file": config_file,
                "config_exists": config_file.exists(),
                "log_file": log_file,
                "cookies_file": cookies_file,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
