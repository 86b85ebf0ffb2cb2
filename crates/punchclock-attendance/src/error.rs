use thiserror::Error;

/// Failures of a single remote procedure call.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The JSON-RPC envelope carried an `error` member.
    #[error("remote fault: {0}")]
    Remote(String),

    /// Credentials were accepted syntactically but no uid came back.
    #[error("credentials rejected")]
    Rejected,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid server address: {0}")]
    InvalidAddress(String),
}

/// Outcome taxonomy of attendance operations, as reported to users.
///
/// A missing open record on close is not an error; see
/// [`CloseOutcome::NothingOpen`](crate::client::CloseOutcome::NothingOpen).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttendanceError {
    /// Bad credentials, unreachable backend, or a read that failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Authenticated, but the login has no linked employee.
    #[error("no employee is linked to this login")]
    NotLinked,

    /// The backend rejected a create/write.
    #[error("attendance action failed: {0}")]
    ActionFailed(String),
}

impl AttendanceError {
    pub(crate) fn connection(e: RpcError) -> Self {
        AttendanceError::Connection(e.to_string())
    }

    pub(crate) fn action(e: RpcError) -> Self {
        AttendanceError::ActionFailed(e.to_string())
    }

    /// Short code used in structured log fields and run reports.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::Connection(_) => "CONNECTION",
            AttendanceError::NotLinked => "NOT_LINKED",
            AttendanceError::ActionFailed(_) => "ACTION_FAILED",
        }
    }
}
