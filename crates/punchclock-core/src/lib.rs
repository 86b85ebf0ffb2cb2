//! `punchclock-core`: shared types, configuration and local-time helpers used
//! by every other crate in the workspace.

pub mod config;
pub mod error;
pub mod time;
pub mod types;

pub use error::{panic_message, PunchclockError, Result};
