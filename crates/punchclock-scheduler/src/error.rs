use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A rule has no days or an out-of-range time.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// A rule never yields a next run (should not happen for a valid rule).
    #[error("Trigger {name} has no upcoming run")]
    Exhausted { name: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
