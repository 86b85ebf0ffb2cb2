//! In-memory backend for tests of this crate and its dependents.
//!
//! Enabled by the `test-support` feature.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use punchclock_core::time::format_backend_timestamp;
use punchclock_core::types::AttendanceRecord;
use serde_json::{json, Map, Value};

use crate::backend::{
    BackendConnector, RemoteBackend, SearchQuery, Session, ATTENDANCE_MODEL, EMPLOYEE_MODEL,
    USERS_MODEL,
};
use crate::error::RpcError;
use crate::wire::attendance_from_value;

/// A call observed by [`InMemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Authenticate { tenant: String, login: String },
    Read { model: String, ids: Vec<i64> },
    SearchRead { model: String, domain: Value },
    Create { model: String, values: Value },
    Write { model: String, ids: Vec<i64>, values: Value },
}

#[derive(Debug, Clone)]
struct Account {
    tenant: String,
    login: String,
    secret: String,
    uid: i64,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    users: Vec<Value>,
    employees: Vec<Value>,
    attendances: Vec<Value>,
    next_attendance_id: i64,
    calls: Vec<RecordedCall>,
    fail_writes: bool,
    offline: bool,
}

impl State {
    fn table(&mut self, model: &str) -> Result<&mut Vec<Value>, RpcError> {
        match model {
            USERS_MODEL => Ok(&mut self.users),
            EMPLOYEE_MODEL => Ok(&mut self.employees),
            ATTENDANCE_MODEL => Ok(&mut self.attendances),
            other => Err(RpcError::Remote(format!("unknown model {other}"))),
        }
    }

    fn check_online(&self) -> Result<(), RpcError> {
        if self.offline {
            Err(RpcError::Unreachable("in-memory backend is offline".into()))
        } else {
            Ok(())
        }
    }

    fn check_writable(&self) -> Result<(), RpcError> {
        if self.fail_writes {
            Err(RpcError::Remote("write access denied".into()))
        } else {
            Ok(())
        }
    }
}

/// Models `res.users`, `hr.employee` and `hr.attendance` as JSON rows.
///
/// Search domains support `=` only, compared by JSON equality.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register a login. `partner` is the user's linked contact, if any.
    pub fn with_account(
        self,
        tenant: &str,
        login: &str,
        secret: &str,
        uid: i64,
        partner: Option<i64>,
    ) -> Self {
        {
            let mut s = self.lock();
            s.accounts.push(Account {
                tenant: tenant.to_string(),
                login: login.to_string(),
                secret: secret.to_string(),
                uid,
            });
            let partner_id = match partner {
                Some(p) => json!([p, format!("Contact {p}")]),
                None => json!(false),
            };
            s.users.push(json!({ "id": uid, "login": login, "partner_id": partner_id }));
        }
        self
    }

    /// Register an employee whose work contact is `partner`.
    pub fn with_employee(self, id: i64, name: &str, partner: i64) -> Self {
        self.lock()
            .employees
            .push(json!({ "id": id, "name": name, "work_contact_id": partner }));
        self
    }

    /// Seed an attendance row directly. Returns its id.
    pub fn insert_attendance(
        &self,
        employee: i64,
        check_in: DateTime<Utc>,
        check_out: Option<DateTime<Utc>>,
    ) -> i64 {
        let mut s = self.lock();
        s.next_attendance_id += 1;
        let id = s.next_attendance_id;
        let check_out = check_out
            .map(|at| json!(format_backend_timestamp(at)))
            .unwrap_or(json!(false));
        s.attendances.push(json!({
            "id": id,
            "employee_id": employee,
            "check_in": format_backend_timestamp(check_in),
            "check_out": check_out,
        }));
        id
    }

    /// All attendance rows, in creation order.
    pub fn attendances(&self) -> Vec<AttendanceRecord> {
        self.lock()
            .attendances
            .iter()
            .filter_map(|row| attendance_from_value(row).ok())
            .collect()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, RecordedCall::Create { .. }))
    }

    pub fn write_count(&self) -> usize {
        self.count(|c| matches!(c, RecordedCall::Write { .. }))
    }

    pub fn authenticate_count(&self) -> usize {
        self.count(|c| matches!(c, RecordedCall::Authenticate { .. }))
    }

    fn count(&self, pred: impl Fn(&RecordedCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Make every `create`/`write` fail with a remote fault.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make every call fail as if the server were down.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }
}

fn matches_domain(row: &Value, domain: &Value) -> bool {
    let Some(conditions) = domain.as_array() else {
        return true;
    };
    conditions.iter().all(|cond| match cond.as_array().map(Vec::as_slice) {
        Some([Value::String(field), op, expected]) if op == "=" => {
            row.get(field).unwrap_or(&Value::Bool(false)) == expected
        }
        _ => false,
    })
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        // Unset (`false`) sorts first.
        (Value::Bool(false), Value::Bool(false)) => Ordering::Equal,
        (Value::Bool(false), _) => Ordering::Less,
        (_, Value::Bool(false)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Apply an `"field [asc|desc], ..."` clause.
fn sort_rows(rows: &mut [Value], order: &str) {
    let keys: Vec<(String, bool)> = order
        .split(',')
        .filter_map(|part| {
            let mut words = part.split_whitespace();
            let field = words.next()?.to_string();
            let desc = words.next().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
            Some((field, desc))
        })
        .collect();

    rows.sort_by(|a, b| {
        for (field, desc) in &keys {
            let null = Value::Bool(false);
            let ord = compare_values(a.get(field).unwrap_or(&null), b.get(field).unwrap_or(&null));
            let ord = if *desc { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn project(row: &Value, fields: &[String]) -> Value {
    if fields.is_empty() {
        return row.clone();
    }
    let mut out = Map::new();
    out.insert("id".to_string(), row["id"].clone());
    for f in fields {
        out.insert(f.clone(), row.get(f).cloned().unwrap_or(Value::Bool(false)));
    }
    Value::Object(out)
}

#[async_trait]
impl RemoteBackend for InMemoryBackend {
    async fn authenticate(
        &self,
        tenant: &str,
        login: &str,
        secret: &str,
    ) -> Result<Session, RpcError> {
        let mut s = self.lock();
        s.calls.push(RecordedCall::Authenticate {
            tenant: tenant.to_string(),
            login: login.to_string(),
        });
        s.check_online()?;
        let account = s
            .accounts
            .iter()
            .find(|a| a.tenant == tenant && a.login == login && a.secret == secret)
            .ok_or(RpcError::Rejected)?;
        Ok(Session {
            uid: account.uid,
            session_id: Some(format!("mem-{}", account.uid)),
        })
    }

    async fn read(
        &self,
        _session: &Session,
        model: &str,
        ids: &[i64],
        fields: &[&str],
    ) -> Result<Vec<Value>, RpcError> {
        let mut s = self.lock();
        s.calls.push(RecordedCall::Read {
            model: model.to_string(),
            ids: ids.to_vec(),
        });
        s.check_online()?;
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        Ok(s.table(model)?
            .iter()
            .filter(|row| row["id"].as_i64().is_some_and(|id| ids.contains(&id)))
            .map(|row| project(row, &fields))
            .collect())
    }

    async fn search_read(
        &self,
        _session: &Session,
        model: &str,
        query: &SearchQuery,
    ) -> Result<Vec<Value>, RpcError> {
        let domain = query.domain.to_json();
        let mut s = self.lock();
        s.calls.push(RecordedCall::SearchRead {
            model: model.to_string(),
            domain: domain.clone(),
        });
        s.check_online()?;
        let mut rows: Vec<Value> = s
            .table(model)?
            .iter()
            .filter(|row| matches_domain(row, &domain))
            .cloned()
            .collect();
        if let Some(ref order) = query.order {
            sort_rows(&mut rows, order);
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows.iter().map(|row| project(row, &query.fields)).collect())
    }

    async fn create(&self, _session: &Session, model: &str, values: Value) -> Result<i64, RpcError> {
        let mut s = self.lock();
        s.calls.push(RecordedCall::Create {
            model: model.to_string(),
            values: values.clone(),
        });
        s.check_online()?;
        s.check_writable()?;
        if model != ATTENDANCE_MODEL {
            return Err(RpcError::Remote(format!("create not allowed on {model}")));
        }
        s.next_attendance_id += 1;
        let id = s.next_attendance_id;
        let mut row = match values {
            Value::Object(map) => map,
            other => return Err(RpcError::Remote(format!("bad values: {other}"))),
        };
        row.insert("id".to_string(), json!(id));
        row.entry("check_out").or_insert(json!(false));
        s.attendances.push(Value::Object(row));
        Ok(id)
    }

    async fn write(
        &self,
        _session: &Session,
        model: &str,
        ids: &[i64],
        values: Value,
    ) -> Result<bool, RpcError> {
        let mut s = self.lock();
        s.calls.push(RecordedCall::Write {
            model: model.to_string(),
            ids: ids.to_vec(),
            values: values.clone(),
        });
        s.check_online()?;
        s.check_writable()?;
        let Value::Object(updates) = values else {
            return Err(RpcError::Remote("bad values".into()));
        };
        let mut touched = false;
        for row in s.table(model)?.iter_mut() {
            if row["id"].as_i64().is_some_and(|id| ids.contains(&id)) {
                if let Value::Object(map) = row {
                    map.extend(updates.clone());
                    touched = true;
                }
            }
        }
        Ok(touched)
    }
}

/// Maps server addresses to in-memory backends; unknown addresses are
/// unreachable.
#[derive(Default, Clone)]
pub struct InMemoryConnector {
    backends: HashMap<String, Arc<dyn RemoteBackend>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, address: &str, backend: Arc<dyn RemoteBackend>) -> Self {
        self.backends.insert(address.to_string(), backend);
        self
    }
}

impl BackendConnector for InMemoryConnector {
    fn connect(&self, server_address: &str) -> Result<Arc<dyn RemoteBackend>, RpcError> {
        self.backends
            .get(server_address)
            .cloned()
            .ok_or_else(|| RpcError::Unreachable(format!("no route to {server_address}")))
    }
}
