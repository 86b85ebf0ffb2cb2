use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::RpcError;

pub const USERS_MODEL: &str = "res.users";
pub const EMPLOYEE_MODEL: &str = "hr.employee";
pub const ATTENDANCE_MODEL: &str = "hr.attendance";

/// Authenticated handle for one logical operation. Never shared between
/// operations or users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Numeric user id on the remote system.
    pub uid: i64,
    /// Session cookie value, when the backend issued one.
    pub session_id: Option<String>,
}

/// One `[field, operator, value]` triple of a search domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

/// Conjunction of conditions, serialised as `[[field, op, value], ...]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domain(pub Vec<Condition>);

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.push(Condition {
            field: field.to_string(),
            operator: "=".to_string(),
            value: value.into(),
        });
        self
    }

    pub fn to_json(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|c| json!([c.field, c.operator, c.value]))
                .collect(),
        )
    }
}

/// Parameters of a `search_read` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub domain: Domain,
    pub fields: Vec<String>,
    pub limit: Option<u32>,
    pub order: Option<String>,
}

impl SearchQuery {
    pub fn new(domain: Domain, fields: &[&str]) -> Self {
        Self {
            domain,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            limit: None,
            order: None,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(mut self, order: &str) -> Self {
        self.order = Some(order.to_string());
        self
    }
}

/// The remote-procedure contract of the HR backend.
///
/// Records travel as JSON objects; interpreting them is the job of
/// [`AttendanceClient`](crate::client::AttendanceClient).
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn authenticate(&self, tenant: &str, login: &str, secret: &str)
        -> Result<Session, RpcError>;

    async fn read(
        &self,
        session: &Session,
        model: &str,
        ids: &[i64],
        fields: &[&str],
    ) -> Result<Vec<Value>, RpcError>;

    async fn search_read(
        &self,
        session: &Session,
        model: &str,
        query: &SearchQuery,
    ) -> Result<Vec<Value>, RpcError>;

    /// Returns the id of the new record.
    async fn create(&self, session: &Session, model: &str, values: Value)
        -> Result<i64, RpcError>;

    async fn write(
        &self,
        session: &Session,
        model: &str,
        ids: &[i64],
        values: Value,
    ) -> Result<bool, RpcError>;
}

/// Produces a backend for a server address.
pub trait BackendConnector: Send + Sync {
    fn connect(&self, server_address: &str) -> Result<Arc<dyn RemoteBackend>, RpcError>;
}
