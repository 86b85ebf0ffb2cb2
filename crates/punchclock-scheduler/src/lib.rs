//! `punchclock-scheduler`: weekly check-in/check-out triggers.
//!
//! # Overview
//!
//! The [`engine::SchedulerEngine`] holds one [`types::Trigger`] per configured
//! rule, ticks every second and emits a [`types::FiredTrigger`] whenever a
//! trigger's `next_run` has arrived. The [`dispatch::ScheduledDispatcher`]
//! consumes those and applies the action to every registered user.
//!
//! Wall-clock rules are evaluated in the configured civil timezone, so
//! "08:00" stays 08:00 local across DST changes.

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod types;

pub use dispatch::{RunReport, ScheduledDispatcher, UserOutcome, UserRun};
pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use types::{FiredTrigger, Trigger};
