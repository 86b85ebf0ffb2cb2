//! `punchclock-users`: who is registered, and who is halfway through `/config`.
//!
//! Everything lives in memory; a restart forgets all profiles.

pub mod error;
pub mod onboarding;
pub mod registry;

pub use error::{Result, UserError};
pub use onboarding::{OnboardingCursor, OnboardingStep};
pub use registry::UserRegistry;
