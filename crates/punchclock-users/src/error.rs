use thiserror::Error;

/// Registry and onboarding errors. Kept separate from the attendance errors
/// so the bot can word each one for the user without coupling the crates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("No profile registered for {0}")]
    NotFound(String),

    /// The server address did not start with `http://` or `https://`.
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    /// Blank text where an onboarding field was expected.
    #[error("Empty value for {0}")]
    EmptyField(&'static str),
}

pub type Result<T> = std::result::Result<T, UserError>;
