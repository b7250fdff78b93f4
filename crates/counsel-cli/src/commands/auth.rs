//! Authentication commands.

use super::{connect, load_config};
use crate::output::{self, OutputFormat};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use session_auth::{BootstrapOutcome, SessionManager, SessionSnapshot, User, UserRole};
use std::fmt;
use std::io::{self, Write};

/// Session summary printed by `status` and `whoami`.
#[derive(Debug, Serialize)]
struct SessionView {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    checked_at: String,
}

impl SessionView {
    fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let user = snapshot.user.as_ref();
        Self {
            status: snapshot.status.to_string(),
            user_id: user.map(|u| u.id.clone()),
            email: user.map(|u| u.email.clone()),
            role: user.map(|u| u.role),
            name: user.and_then(User::display_name).map(str::to_string),
            error: snapshot.error.clone(),
            checked_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl fmt::Display for SessionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session:  {}", self.status)?;
        if let Some(email) = &self.email {
            writeln!(f, "Email:    {}", email)?;
        }
        if let Some(name) = &self.name {
            writeln!(f, "Name:     {}", name)?;
        }
        if let Some(role) = &self.role {
            writeln!(f, "Role:     {}", role)?;
        }
        if let Some(id) = &self.user_id {
            writeln!(f, "User ID:  {}", id)?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "Detail:   {}", error)?;
        }
        Ok(())
    }
}

/// Check the session with the server and print the result.
pub async fn status(format: &OutputFormat) -> Result<()> {
    let (paths, config) = load_config()?;
    let (runtime, cookies) = connect(&paths, &config)?;

    let outcome = runtime.bootstrap().await;
    tracing::debug!(?outcome, "Bootstrap finished");
    cookies.save()?;

    let view = SessionView::from_snapshot(&runtime.state().snapshot());
    output::print(&view, format);
    Ok(())
}

/// Print the current user, or say that nobody is signed in.
pub async fn whoami(format: &OutputFormat) -> Result<()> {
    let (paths, config) = load_config()?;
    let (runtime, cookies) = connect(&paths, &config)?;

    let outcome = runtime.bootstrap().await;
    cookies.save()?;

    match outcome {
        BootstrapOutcome::Authenticated | BootstrapOutcome::SkippedGracePeriod => {
            let view = SessionView::from_snapshot(&runtime.state().snapshot());
            output::print(&view, format);
        }
        BootstrapOutcome::Anonymous | BootstrapOutcome::AlreadyChecked => {
            output::print_success("Not logged in", format);
        }
    }
    Ok(())
}

/// Request a one-time code by email, prompt for it, and verify it.
pub async fn login(email: Option<String>, role: UserRole, format: &OutputFormat) -> Result<()> {
    let (paths, config) = load_config()?;
    let (runtime, cookies) = connect(&paths, &config)?;

    let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };

    let user = sign_in(runtime.session(), &email, role, format, || {
        // Hidden input; the code is never echoed or logged.
        Ok(rpassword::prompt_password("Code: ")?)
    })
    .await?;
    cookies.save()?;

    let label = user.display_name().unwrap_or(&user.email).to_string();
    match format {
        OutputFormat::Text => {
            println!("Logged in as {} ({})", label, user.role);
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "status": "success",
                "user": user,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

/// OTP round trip. Every failure is an error so the process exits non-zero.
async fn sign_in(
    session: &SessionManager,
    email: &str,
    role: UserRole,
    format: &OutputFormat,
    read_code: impl FnOnce() -> Result<String>,
) -> Result<User> {
    let email = email.trim();
    if email.is_empty() {
        bail!("Email is required");
    }

    session
        .request_otp(email, role)
        .await
        .context("Could not send a code")?;
    if let OutputFormat::Text = format {
        println!("A one-time code was sent to {}.", email);
    }

    let otp = read_code()?;
    let otp = otp.trim();
    if otp.is_empty() {
        bail!("Code is required");
    }

    let user = session
        .verify_otp(email, otp)
        .await
        .context("Login failed")?;
    Ok(user)
}

/// Log out. Local state and saved cookies are cleared even if the server is
/// unreachable.
pub async fn logout(format: &OutputFormat) -> Result<()> {
    let (paths, config) = load_config()?;
    let (runtime, cookies) = connect(&paths, &config)?;

    runtime.session().logout().await;
    cookies.clear()?;
    output::print_success("Logged out", format);
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
