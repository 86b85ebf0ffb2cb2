//! JSON-RPC 2.0 backend over HTTP.
//!
//! Endpoints:
//! - `POST {server}/web/session/authenticate`: returns `uid`, sets the
//!   `session_id` cookie
//! - `POST {server}/web/dataset/call_kw` with `{model, method, args, kwargs}`
//!
//! No retries and no timeout override: a failed call surfaces immediately.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use serde_json::{json, Value};
use tracing::{debug, warn};

use punchclock_core::types::normalize_server_address;

use crate::backend::{BackendConnector, RemoteBackend, SearchQuery, Session};
use crate::error::RpcError;

const AUTHENTICATE_PATH: &str = "/web/session/authenticate";
const CALL_KW_PATH: &str = "/web/dataset/call_kw";
const SESSION_COOKIE: &str = "session_id";

pub struct JsonRpcBackend {
    client: reqwest::Client,
    base_url: String,
    next_id: AtomicU64,
}

impl JsonRpcBackend {
    pub fn new(client: reqwest::Client, server_address: &str) -> Result<Self, RpcError> {
        let base_url = normalize_server_address(server_address)
            .ok_or_else(|| RpcError::InvalidAddress(server_address.to_string()))?;
        Ok(Self {
            client,
            base_url,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one JSON-RPC envelope and unwrap its `result`.
    ///
    /// Also returns the `session_id` cookie when the response set one.
    async fn post(
        &self,
        path: &str,
        params: Value,
        session: Option<&Session>,
    ) -> Result<(Value, Option<String>), RpcError> {
        let url = format!("{}{}", self.base_url, path);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": params,
            "id": id,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(sid) = session.and_then(|s| s.session_id.as_deref()) {
            request = request.header(COOKIE, format!("{SESSION_COOKIE}={sid}"));
        }

        debug!(%url, rpc_id = id, "backend call");

        let resp = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                RpcError::Unreachable(e.to_string())
            } else {
                RpcError::Http(e)
            }
        })?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "backend HTTP error");
            return Err(RpcError::Status {
                status,
                message: text,
            });
        }

        let cookie = session_cookie(&resp);
        let envelope: Value = resp
            .json()
            .await
            .map_err(|e| RpcError::Malformed(e.to_string()))?;

        if let Some(err) = envelope.get("error") {
            return Err(RpcError::Remote(fault_message(err)));
        }

        let result = envelope
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::Malformed("response has neither result nor error".into()))?;
        Ok((result, cookie))
    }

    async fn call_kw(
        &self,
        session: &Session,
        model: &str,
        method: &str,
        args: Value,
        mut kwargs: Value,
    ) -> Result<Value, RpcError> {
        if let Some(obj) = kwargs.as_object_mut() {
            obj.insert("context".to_string(), json!({ "kiosk_mode": true }));
        }
        let params = json!({
            "model": model,
            "method": method,
            "args": args,
            "kwargs": kwargs,
        });
        let (result, _) = self.post(CALL_KW_PATH, params, Some(session)).await?;
        Ok(result)
    }
}

/// Extract the `session_id` value from any `Set-Cookie` header.
fn session_cookie(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|raw| {
            let pair = raw.split(';').next()?.trim();
            let value = pair.strip_prefix(SESSION_COOKIE)?.strip_prefix('=')?;
            (!value.is_empty()).then(|| value.to_string())
        })
}

/// Prefer the server-side exception message over the generic envelope text.
fn fault_message(err: &Value) -> String {
    err.pointer("/data/message")
        .and_then(Value::as_str)
        .or_else(|| err.get("message").and_then(Value::as_str))
        .map(String::from)
        .unwrap_or_else(|| err.to_string())
}

fn as_records(result: Value) -> Result<Vec<Value>, RpcError> {
    match result {
        Value::Array(items) => Ok(items),
        other => Err(RpcError::Malformed(format!("expected a record list, got {other}"))),
    }
}

#[async_trait]
impl RemoteBackend for JsonRpcBackend {
    async fn authenticate(
        &self,
        tenant: &str,
        login: &str,
        secret: &str,
    ) -> Result<Session, RpcError> {
        let params = json!({
            "db": tenant,
            "login": login,
            "password": secret,
        });
        let (result, cookie) = self.post(AUTHENTICATE_PATH, params, None).await?;

        let uid = result.get("uid").and_then(Value::as_i64).ok_or(RpcError::Rejected)?;
        // Older servers return the session id in the body instead of a cookie.
        let session_id = cookie.or_else(|| {
            result
                .get("session_id")
                .and_then(Value::as_str)
                .map(String::from)
        });
        Ok(Session { uid, session_id })
    }

    async fn read(
        &self,
        session: &Session,
        model: &str,
        ids: &[i64],
        fields: &[&str],
    ) -> Result<Vec<Value>, RpcError> {
        let result = self
            .call_kw(session, model, "read", json!([ids]), json!({ "fields": fields }))
            .await?;
        as_records(result)
    }

    async fn search_read(
        &self,
        session: &Session,
        model: &str,
        query: &SearchQuery,
    ) -> Result<Vec<Value>, RpcError> {
        let mut kwargs = json!({ "fields": query.fields });
        if let Some(limit) = query.limit {
            kwargs["limit"] = json!(limit);
        }
        if let Some(ref order) = query.order {
            kwargs["order"] = json!(order);
        }
        let result = self
            .call_kw(session, model, "search_read", json!([query.domain.to_json()]), kwargs)
            .await?;
        as_records(result)
    }

    async fn create(&self, session: &Session, model: &str, values: Value) -> Result<i64, RpcError> {
        let result = self
            .call_kw(session, model, "create", json!([values]), json!({}))
            .await?;
        // Batch-capable servers answer with a list of ids.
        match &result {
            Value::Number(n) => n.as_i64(),
            Value::Array(ids) => ids.first().and_then(Value::as_i64),
            _ => None,
        }
        .ok_or_else(|| RpcError::Malformed(format!("create returned {result}")))
    }

    async fn write(
        &self,
        session: &Session,
        model: &str,
        ids: &[i64],
        values: Value,
    ) -> Result<bool, RpcError> {
        let result = self
            .call_kw(session, model, "write", json!([ids, values]), json!({}))
            .await?;
        Ok(result.as_bool().unwrap_or(false))
    }
}

/// Builds [`JsonRpcBackend`]s sharing one HTTP connection pool.
#[derive(Clone, Default)]
pub struct JsonRpcConnector {
    client: reqwest::Client,
}

impl JsonRpcConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl BackendConnector for JsonRpcConnector {
    fn connect(&self, server_address: &str) -> Result<Arc<dyn RemoteBackend>, RpcError> {
        Ok(Arc::new(JsonRpcBackend::new(
            self.client.clone(),
            server_address,
        )?))
    }
}
