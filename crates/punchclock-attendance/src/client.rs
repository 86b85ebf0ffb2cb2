//! Attendance protocol on top of [`RemoteBackend`].
//!
//! [`AttendanceClient`] holds credentials only; [`AttendanceClient::authenticate`]
//! yields an [`AttendanceSession`], which is the sole entry point for the
//! attendance operations. A session lives for one logical operation and is
//! dropped afterwards.

use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;
use punchclock_core::time::{format_backend_timestamp, LocalClock};
use punchclock_core::types::{AttendanceRecord, ConnectionProfile, EmployeeId};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::backend::{
    BackendConnector, Domain, RemoteBackend, SearchQuery, Session, ATTENDANCE_MODEL,
    EMPLOYEE_MODEL, USERS_MODEL,
};
use crate::error::{AttendanceError, RpcError};
use crate::wire::{attendance_from_value, many2one_id, record_id};

const ATTENDANCE_FIELDS: &[&str] = &["id", "check_in", "check_out"];

/// Result of [`AttendanceSession::close_attendance`].
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// The open record was closed at `closed_at` (local time).
    Closed {
        record: AttendanceRecord,
        closed_at: DateTime<Tz>,
    },
    /// No open record existed; nothing was written.
    NothingOpen,
}

/// Unauthenticated handle: a backend plus the credentials to log into it.
pub struct AttendanceClient {
    backend: Arc<dyn RemoteBackend>,
    profile: ConnectionProfile,
    clock: LocalClock,
}

impl AttendanceClient {
    pub fn new(backend: Arc<dyn RemoteBackend>, profile: ConnectionProfile, clock: LocalClock) -> Self {
        Self {
            backend,
            profile,
            clock,
        }
    }

    /// Build a client for `profile.server_address` via `connector`.
    pub fn connect(
        connector: &dyn BackendConnector,
        profile: &ConnectionProfile,
        clock: LocalClock,
    ) -> Result<Self, AttendanceError> {
        let backend = connector
            .connect(&profile.server_address)
            .map_err(AttendanceError::connection)?;
        Ok(Self::new(backend, profile.clone(), clock))
    }

    pub async fn authenticate(&self) -> Result<AttendanceSession, AttendanceError> {
        let p = &self.profile;
        match self.backend.authenticate(&p.tenant, &p.login, &p.secret).await {
            Ok(session) => {
                debug!(login = %p.login, tenant = %p.tenant, uid = session.uid, "authenticated");
                Ok(AttendanceSession {
                    backend: Arc::clone(&self.backend),
                    clock: self.clock,
                    session,
                    login: p.login.clone(),
                })
            }
            Err(e) => {
                warn!(
                    login = %p.login,
                    tenant = %p.tenant,
                    server = %p.server_address,
                    error = %e,
                    "authentication failed"
                );
                Err(AttendanceError::connection(e))
            }
        }
    }
}

/// An authenticated backend session.
pub struct AttendanceSession {
    backend: Arc<dyn RemoteBackend>,
    clock: LocalClock,
    session: Session,
    login: String,
}

impl AttendanceSession {
    /// Find the employee linked to the authenticated login.
    ///
    /// The link is indirect: the user's contact (`partner_id`) is the
    /// employee's `work_contact_id`. `Ok(None)` means nothing is linked.
    pub async fn resolve_employee(&self) -> Result<Option<EmployeeId>, AttendanceError> {
        let users = self
            .backend
            .read(&self.session, USERS_MODEL, &[self.session.uid], &["partner_id"])
            .await
            .map_err(AttendanceError::connection)?;

        let Some(partner) = users
            .first()
            .and_then(|u| u.get("partner_id"))
            .and_then(many2one_id)
        else {
            warn!(login = %self.login, uid = self.session.uid, "user has no linked contact");
            return Ok(None);
        };

        let query = SearchQuery::new(Domain::new().eq("work_contact_id", partner), &["id", "name"])
            .limit(1);
        let employees = self
            .backend
            .search_read(&self.session, EMPLOYEE_MODEL, &query)
            .await
            .map_err(AttendanceError::connection)?;

        match employees.first() {
            Some(emp) => {
                let id = record_id(emp).map_err(AttendanceError::connection)?;
                debug!(login = %self.login, employee = id, "employee resolved");
                Ok(Some(EmployeeId(id)))
            }
            None => {
                warn!(login = %self.login, partner, "no employee linked to contact");
                Ok(None)
            }
        }
    }

    /// Create a new attendance record stamped now. Returns the local
    /// check-in instant that was written.
    pub async fn open_attendance(&self, employee: EmployeeId) -> Result<DateTime<Tz>, AttendanceError> {
        let now = self.clock.now();
        let values = json!({
            "employee_id": employee.0,
            "check_in": format_backend_timestamp(now.to_utc()),
        });
        let id = self
            .backend
            .create(&self.session, ATTENDANCE_MODEL, values)
            .await
            .map_err(|e| {
                warn!(%employee, error = %e, "check-in failed");
                AttendanceError::action(e)
            })?;
        info!(%employee, attendance = id, at = %now, "checked in");
        Ok(now)
    }

    /// Close the open attendance record, if any.
    pub async fn close_attendance(&self, employee: EmployeeId) -> Result<CloseOutcome, AttendanceError> {
        let open = self
            .find_open(employee)
            .await
            .map_err(AttendanceError::action)?;

        let Some(record) = open else {
            warn!(%employee, "no open attendance to close");
            return Ok(CloseOutcome::NothingOpen);
        };

        let now = self.clock.now();
        let values = json!({ "check_out": format_backend_timestamp(now.to_utc()) });
        let acknowledged = self
            .backend
            .write(&self.session, ATTENDANCE_MODEL, &[record.id], values)
            .await
            .map_err(|e| {
                warn!(%employee, attendance = record.id, error = %e, "check-out failed");
                AttendanceError::action(e)
            })?;
        if !acknowledged {
            return Err(AttendanceError::ActionFailed(format!(
                "backend did not acknowledge check-out of attendance {}",
                record.id
            )));
        }

        info!(%employee, attendance = record.id, at = %now, "checked out");
        Ok(CloseOutcome::Closed {
            record,
            closed_at: now,
        })
    }

    /// The open attendance record, without modifying anything.
    pub async fn peek_open_attendance(
        &self,
        employee: EmployeeId,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        self.find_open(employee)
            .await
            .map_err(AttendanceError::connection)
    }

    /// The most recent attendance record, open or closed.
    pub async fn peek_last_attendance(
        &self,
        employee: EmployeeId,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let query = SearchQuery::new(Domain::new().eq("employee_id", employee.0), ATTENDANCE_FIELDS)
            .order("check_in desc, id desc")
            .limit(1);
        self.first_attendance(&query)
            .await
            .map_err(AttendanceError::connection)
    }

    async fn find_open(&self, employee: EmployeeId) -> Result<Option<AttendanceRecord>, RpcError> {
        let query = SearchQuery::new(
            Domain::new()
                .eq("employee_id", employee.0)
                .eq("check_out", false),
            ATTENDANCE_FIELDS,
        )
        .order("check_in desc, id desc")
        .limit(1);
        self.first_attendance(&query).await
    }

    async fn first_attendance(&self, query: &SearchQuery) -> Result<Option<AttendanceRecord>, RpcError> {
        let rows = self
            .backend
            .search_read(&self.session, ATTENDANCE_MODEL, query)
            .await?;
        rows.first().map(attendance_from_value).transpose()
    }
}

/// Authenticate and resolve in one step.
///
/// An authenticated login without a linked employee becomes
/// [`AttendanceError::NotLinked`].
pub async fn connect_employee(
    connector: &dyn BackendConnector,
    profile: &ConnectionProfile,
    clock: LocalClock,
) -> Result<(AttendanceSession, EmployeeId), AttendanceError> {
    let session = AttendanceClient::connect(connector, profile, clock)?
        .authenticate()
        .await?;
    match session.resolve_employee().await? {
        Some(employee) => Ok((session, employee)),
        None => Err(AttendanceError::NotLinked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryBackend, InMemoryConnector, RecordedCall};
    use chrono::{TimeZone, Utc};

    const ADDR: &str = "https://hr.example.com";

    fn profile() -> ConnectionProfile {
        ConnectionProfile::new(ADDR, "acme", "alice", "pw")
    }

    fn linked_backend() -> Arc<InMemoryBackend> {
        Arc::new(
            InMemoryBackend::new()
                .with_account("acme", "alice", "pw", 7, Some(70))
                .with_employee(4, "Alice", 70),
        )
    }

    fn connector(backend: &Arc<InMemoryBackend>) -> InMemoryConnector {
        InMemoryConnector::new().with_backend(ADDR, Arc::<InMemoryBackend>::clone(backend))
    }

    async fn session(backend: &Arc<InMemoryBackend>) -> AttendanceSession {
        AttendanceClient::new(backend.clone(), profile(), LocalClock::default())
            .authenticate()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn wrong_secret_is_connection_error() {
        let backend = linked_backend();
        let client = AttendanceClient::new(
            backend,
            ConnectionProfile::new(ADDR, "acme", "alice", "nope"),
            LocalClock::default(),
        );
        let err = client.authenticate().await.err().unwrap();
        assert!(matches!(err, AttendanceError::Connection(_)));
    }

    #[tokio::test]
    async fn unknown_address_is_connection_error() {
        let connector = InMemoryConnector::new();
        let err = connect_employee(&connector, &profile(), LocalClock::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AttendanceError::Connection(_)));
    }

    #[tokio::test]
    async fn resolves_employee_through_contact() {
        let backend = linked_backend();
        let (_, employee) = connect_employee(&connector(&backend), &profile(), LocalClock::default())
            .await
            .unwrap();
        assert_eq!(employee, EmployeeId(4));
    }

    #[tokio::test]
    async fn unlinked_login_resolves_to_none() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_account("acme", "alice", "pw", 7, Some(70))
                .with_employee(4, "Someone else", 99),
        );
        let s = session(&backend).await;
        assert_eq!(s.resolve_employee().await.unwrap(), None);

        let err = connect_employee(&connector(&backend), &profile(), LocalClock::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AttendanceError::NotLinked));
    }

    #[tokio::test]
    async fn user_without_contact_resolves_to_none() {
        let backend = Arc::new(InMemoryBackend::new().with_account("acme", "alice", "pw", 7, None));
        let s = session(&backend).await;
        assert_eq!(s.resolve_employee().await.unwrap(), None);
    }

    #[tokio::test]
    async fn open_then_close_round_trip() {
        let backend = linked_backend();
        let s = session(&backend).await;

        let opened_at = s.open_attendance(EmployeeId(4)).await.unwrap();
        let open = s.peek_open_attendance(EmployeeId(4)).await.unwrap().unwrap();
        assert_eq!(open.check_in, opened_at.to_utc());

        match s.close_attendance(EmployeeId(4)).await.unwrap() {
            CloseOutcome::Closed { record, closed_at } => {
                assert_eq!(record.id, open.id);
                assert!(closed_at >= opened_at);
            }
            CloseOutcome::NothingOpen => panic!("expected a closed record"),
        }

        let stored = backend.attendances();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].check_in, opened_at.to_utc());
        assert!(stored[0].check_out.is_some());
        assert!(s.peek_open_attendance(EmployeeId(4)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn close_without_open_record_writes_nothing() {
        let backend = linked_backend();
        let s = session(&backend).await;

        let outcome = s.close_attendance(EmployeeId(4)).await.unwrap();
        assert_eq!(outcome, CloseOutcome::NothingOpen);
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn second_close_finds_nothing_open() {
        let backend = linked_backend();
        let s = session(&backend).await;
        s.open_attendance(EmployeeId(4)).await.unwrap();

        assert!(matches!(
            s.close_attendance(EmployeeId(4)).await.unwrap(),
            CloseOutcome::Closed { .. }
        ));
        assert_eq!(
            s.close_attendance(EmployeeId(4)).await.unwrap(),
            CloseOutcome::NothingOpen
        );
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn open_does_not_check_for_existing_open_record() {
        let backend = linked_backend();
        let s = session(&backend).await;
        s.open_attendance(EmployeeId(4)).await.unwrap();
        s.open_attendance(EmployeeId(4)).await.unwrap();

        assert_eq!(backend.create_count(), 2);
        assert_eq!(backend.attendances().iter().filter(|a| a.is_open()).count(), 2);
    }

    #[tokio::test]
    async fn close_picks_latest_of_several_open_records() {
        let backend = linked_backend();
        let early = Utc.with_ymd_and_hms(2026, 1, 12, 13, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 1, 13, 13, 0, 0).unwrap();
        backend.insert_attendance(4, early, None);
        let latest = backend.insert_attendance(4, late, None);
        let s = session(&backend).await;

        match s.close_attendance(EmployeeId(4)).await.unwrap() {
            CloseOutcome::Closed { record, .. } => assert_eq!(record.id, latest),
            CloseOutcome::NothingOpen => panic!("expected a closed record"),
        }
        let still_open = s.peek_open_attendance(EmployeeId(4)).await.unwrap().unwrap();
        assert_eq!(still_open.check_in, early);
    }

    #[tokio::test]
    async fn close_leaves_check_in_untouched() {
        let backend = linked_backend();
        let check_in = Utc.with_ymd_and_hms(2026, 1, 12, 13, 0, 0).unwrap();
        backend.insert_attendance(4, check_in, None);
        let s = session(&backend).await;

        s.close_attendance(EmployeeId(4)).await.unwrap();

        let writes: Vec<_> = backend
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::Write { values, .. } => Some(values),
                _ => None,
            })
            .collect();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].get("check_in").is_none());
        assert_eq!(backend.attendances()[0].check_in, check_in);
    }

    #[tokio::test]
    async fn failed_write_is_action_failure() {
        let backend = linked_backend();
        backend.insert_attendance(4, Utc.with_ymd_and_hms(2026, 1, 12, 13, 0, 0).unwrap(), None);
        backend.set_fail_writes(true);
        let s = session(&backend).await;

        let err = s.close_attendance(EmployeeId(4)).await.err().unwrap();
        assert!(matches!(err, AttendanceError::ActionFailed(_)));
        assert!(backend.attendances()[0].is_open());
    }

    #[tokio::test]
    async fn failed_create_is_action_failure() {
        let backend = linked_backend();
        backend.set_fail_writes(true);
        let s = session(&backend).await;

        let err = s.open_attendance(EmployeeId(4)).await.err().unwrap();
        assert!(matches!(err, AttendanceError::ActionFailed(_)));
        assert!(backend.attendances().is_empty());
    }

    #[tokio::test]
    async fn last_attendance_is_most_recent_check_in() {
        let backend = linked_backend();
        let early = Utc.with_ymd_and_hms(2026, 1, 12, 13, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 1, 13, 13, 0, 0).unwrap();
        backend.insert_attendance(4, late, Some(late + chrono::Duration::hours(8)));
        backend.insert_attendance(4, early, Some(early + chrono::Duration::hours(8)));
        let s = session(&backend).await;

        let last = s.peek_last_attendance(EmployeeId(4)).await.unwrap().unwrap();
        assert_eq!(last.check_in, late);
        assert!(s.peek_open_attendance(EmployeeId(4)).await.unwrap().is_none());
    }
}
