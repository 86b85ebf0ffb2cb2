use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat-platform identity of an end user (Telegram numeric id as a string).
///
/// Always supplied by the transport; never generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserIdentity(pub String);

impl UserIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for UserIdentity {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Accepted URI scheme prefixes for a server address.
pub const ACCEPTED_SCHEMES: &[&str] = &["http://", "https://"];

/// Canonical form of a server address: trimmed, without trailing `/`, with
/// an accepted scheme and a non-empty host. `None` for anything else.
pub fn normalize_server_address(raw: &str) -> Option<String> {
    let address = raw.trim().trim_end_matches('/');
    let rest = ACCEPTED_SCHEMES
        .iter()
        .find_map(|scheme| address.strip_prefix(scheme))?;
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return None;
    }
    Some(address.to_string())
}

/// Credentials for one remote HR backend account.
///
/// Only ever constructed with all four fields present; the onboarding dialogue
/// keeps partial input in its own draft until the last field arrives.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub server_address: String,
    pub tenant: String,
    pub login: String,
    pub secret: String,
}

impl ConnectionProfile {
    pub fn new(
        server_address: impl Into<String>,
        tenant: impl Into<String>,
        login: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            server_address: server_address.into(),
            tenant: tenant.into(),
            login: login.into(),
            secret: secret.into(),
        }
    }

    /// One `*` per character of the secret, for user-facing rendering.
    pub fn masked_secret(&self) -> String {
        "*".repeat(self.secret.chars().count())
    }
}

// Secrets never reach log output.
impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("server_address", &self.server_address)
            .field("tenant", &self.tenant)
            .field("login", &self.login)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Employee record id on the remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub i64);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An attendance row as read back from the backend. Timestamps are UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }
}

/// The two attendance actions the bot performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceAction {
    CheckIn,
    CheckOut,
}

impl fmt::Display for AttendanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceAction::CheckIn => write!(f, "check_in"),
            AttendanceAction::CheckOut => write!(f, "check_out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_address_is_normalized() {
        assert_eq!(
            normalize_server_address("  https://hr.example.com/ "),
            Some("https://hr.example.com".to_string())
        );
        assert_eq!(
            normalize_server_address("http://localhost:8069/odoo"),
            Some("http://localhost:8069/odoo".to_string())
        );
    }

    #[test]
    fn server_address_needs_scheme_and_host() {
        for raw in ["http://", "https://", "https:///", "https:///web", "hr.example.com", "ftp://x", "http://a b"] {
            assert_eq!(normalize_server_address(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn debug_redacts_secret() {
        let profile = ConnectionProfile::new("https://hr.example.com", "db", "alice", "hunter2");
        let dbg = format!("{profile:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("alice"));
    }

    #[test]
    fn masked_secret_counts_chars() {
        let profile = ConnectionProfile::new("https://hr.example.com", "db", "alice", "señor");
        assert_eq!(profile.masked_secret(), "*****");
    }

    #[test]
    fn identity_from_numeric_id() {
        assert_eq!(UserIdentity::from(42u64).as_str(), "42");
    }
}
