use chrono::{DateTime, Utc};
use punchclock_core::config::TriggerRule;
use punchclock_core::types::AttendanceAction;
use serde::{Deserialize, Serialize};

/// One weekly rule bound to an attendance action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    /// Label used in logs, e.g. `check_in#0`.
    pub name: String,
    pub action: AttendanceAction,
    pub rule: TriggerRule,
    /// Next planned fire instant.
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    /// Fires since the engine started.
    pub run_count: u32,
}

impl Trigger {
    pub fn new(name: impl Into<String>, action: AttendanceAction, rule: TriggerRule) -> Self {
        Self {
            name: name.into(),
            action,
            rule,
            next_run: None,
            last_run: None,
            run_count: 0,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run.is_some_and(|next| next <= now)
    }
}

/// Emitted by the engine when a trigger fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiredTrigger {
    pub name: String,
    pub action: AttendanceAction,
    pub fired_at: DateTime<Utc>,
}
