//! Applies a fired check-in or check-out to every registered user.
//!
//! Users are processed one after another, each inside its own Tokio task so
//! that an error or a panic is confined to that user. Nobody is notified;
//! the outcome only reaches the logs and the returned [`RunReport`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use punchclock_attendance::{connect_employee, AttendanceError, BackendConnector, CloseOutcome};
use punchclock_core::panic_message;
use punchclock_core::time::LocalClock;
use punchclock_core::types::{AttendanceAction, ConnectionProfile, UserIdentity};
use punchclock_users::UserRegistry;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::types::FiredTrigger;

/// What happened to one user during a scheduled run.
#[derive(Debug, Clone, PartialEq)]
pub enum UserOutcome {
    CheckedIn { at: DateTime<Tz> },
    CheckedOut { at: DateTime<Tz> },
    /// Check-out found no open record.
    NothingOpen,
    Failed(AttendanceError),
    /// The user's task panicked; the message is the panic payload if it was text.
    Panicked(String),
}

impl UserOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            UserOutcome::CheckedIn { .. } | UserOutcome::CheckedOut { .. } | UserOutcome::NothingOpen
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRun {
    pub user: UserIdentity,
    pub login: String,
    pub outcome: UserOutcome,
}

/// Summary of one scheduled run over the registry snapshot.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub action: AttendanceAction,
    pub started_at: DateTime<Utc>,
    pub runs: Vec<UserRun>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.runs.len() - self.succeeded()
    }

    pub fn outcome_for(&self, user: &UserIdentity) -> Option<&UserOutcome> {
        self.runs.iter().find(|r| &r.user == user).map(|r| &r.outcome)
    }
}

pub struct ScheduledDispatcher {
    registry: Arc<UserRegistry>,
    connector: Arc<dyn BackendConnector>,
    clock: LocalClock,
}

impl ScheduledDispatcher {
    pub fn new(registry: Arc<UserRegistry>, connector: Arc<dyn BackendConnector>, clock: LocalClock) -> Self {
        Self {
            registry,
            connector,
            clock,
        }
    }

    /// Apply `action` to every user registered at the moment of the call.
    pub async fn run(&self, action: AttendanceAction) -> RunReport {
        let started_at = Utc::now();
        let snapshot = self.registry.list();
        info!(%action, users = snapshot.len(), "scheduled run started");

        let mut runs = Vec::with_capacity(snapshot.len());
        for (user, profile) in snapshot {
            let login = profile.login.clone();
            let task = tokio::spawn(apply(
                Arc::clone(&self.connector),
                profile,
                self.clock,
                action,
            ));

            let outcome = match task.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    error!(%user, %login, %action, code = e.code(), error = %e, "scheduled action failed");
                    UserOutcome::Failed(e)
                }
                Err(join_err) => {
                    let message = join_error_message(join_err);
                    error!(%user, %login, %action, panic = %message, "scheduled action panicked");
                    UserOutcome::Panicked(message)
                }
            };
            runs.push(UserRun { user, login, outcome });
        }

        let report = RunReport {
            action,
            started_at,
            runs,
        };
        info!(
            %action,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "scheduled run finished"
        );
        report
    }

    /// Consume fired triggers until the engine side of the channel closes.
    pub async fn consume(self: Arc<Self>, mut rx: mpsc::Receiver<FiredTrigger>) {
        while let Some(fired) = rx.recv().await {
            info!(trigger = %fired.name, action = %fired.action, "dispatching trigger");
            self.run(fired.action).await;
        }
        warn!("scheduled dispatch consumer ended (channel closed)");
    }
}

async fn apply(
    connector: Arc<dyn BackendConnector>,
    profile: ConnectionProfile,
    clock: LocalClock,
    action: AttendanceAction,
) -> Result<UserOutcome, AttendanceError> {
    let (session, employee) = connect_employee(connector.as_ref(), &profile, clock).await?;
    match action {
        AttendanceAction::CheckIn => {
            let at = session.open_attendance(employee).await?;
            Ok(UserOutcome::CheckedIn { at })
        }
        AttendanceAction::CheckOut => match session.close_attendance(employee).await? {
            CloseOutcome::Closed { closed_at, .. } => Ok(UserOutcome::CheckedOut { at: closed_at }),
            CloseOutcome::NothingOpen => Ok(UserOutcome::NothingOpen),
        },
    }
}

fn join_error_message(err: tokio::task::JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => panic_message(payload),
        Err(err) => err.to_string(),
    }
}
