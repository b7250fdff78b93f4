//! Wire types shared with the Counsel API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Endpoint paths, relative to the configured API base URL.
pub mod endpoints {
    pub const REQUEST_OTP: &str = "/auth/request-otp";
    pub const VERIFY_OTP: &str = "/auth/verify-otp";
    pub const CURRENT_USER: &str = "/auth/me";
    pub const LOGOUT: &str = "/auth/logout";
    pub const REFRESH: &str = "/auth/refresh";
    pub const CSRF_TOKEN: &str = "/auth/csrf-token";
}

/// Role chosen when requesting a one-time password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Lawyer,
    Client,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Lawyer => "lawyer",
            UserRole::Client => "client",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lawyer" => Ok(UserRole::Lawyer),
            "client" => Ok(UserRole::Client),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated user as returned by the API.
///
/// Fields other than `id`, `email` and `role` are kept verbatim in `profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    pub role: UserRole,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl User {
    /// Display name from the profile, if the API sent one.
    pub fn display_name(&self) -> Option<&str> {
        ["name", "fullName", "displayName"]
            .iter()
            .find_map(|key| self.profile.get(*key).and_then(Value::as_str))
    }
}

/// Accepts both numeric and string identifiers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct RequestOtpBody<'a> {
    pub email: &'a str,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyOtpBody<'a> {
    pub email: &'a str,
    pub otp: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CsrfTokenResponse {
    #[serde(rename = "csrfToken", default)]
    pub csrf_token: Option<String>,
}
