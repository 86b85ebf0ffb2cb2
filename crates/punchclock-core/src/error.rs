use std::any::Any;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PunchclockError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

impl PunchclockError {
    /// Short error code string used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            PunchclockError::Config(_) => "CONFIG_ERROR",
            PunchclockError::InvalidTimezone(_) => "INVALID_TIMEZONE",
            PunchclockError::InvalidSchedule(_) => "INVALID_SCHEDULE",
        }
    }
}

pub type Result<T> = std::result::Result<T, PunchclockError>;

/// Text of a caught panic payload, for log fields.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-text panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payload_text() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42_u8)), "non-text panic payload");
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(PunchclockError::InvalidTimezone("Mars/Base".into()).code(), "INVALID_TIMEZONE");
    }
}
