//! Counsel CLI - sign in to the Counsel API from a terminal.

mod commands;
mod cookies;
mod output;

use clap::{Parser, Subcommand};
use counsel_config::Paths;
use session_auth::UserRole;

/// Counsel CLI - manage your Counsel session.
#[derive(Parser)]
#[command(name = "counsel")]
#[command(about = "Counsel CLI for signing in and checking your session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true, env = "COUNSEL_LOG_LEVEL")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the session with the server
    Status,

    /// Sign in with a one-time code sent by email
    Login {
        /// Account email (prompted if omitted)
        #[arg(short, long)]
        email: Option<String>,

        /// Account role (lawyer, client or admin)
        #[arg(short, long, default_value = "client")]
        role: UserRole,
    },

    /// Show the signed-in user
    Whoami,

    /// Log out and clear the session
    Logout,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Show config and log file locations
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let paths = Paths::new().ok();
    counsel_config::init_logging("counsel-cli", &cli.log_level, paths.as_ref());

    let result = match cli.command {
        Commands::Status => commands::status(&cli.format).await,
        Commands::Login { email, role } => commands::login(email, role, &cli.format).await,
        Commands::Whoami => commands::whoami(&cli.format).await,
        Commands::Logout => commands::logout(&cli.format).await,
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config_show(&cli.format).await,
            ConfigCommands::Path => commands::config_path(&cli.format).await,
        },
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e), &cli.format);
        std::process::exit(1);
    }
}
