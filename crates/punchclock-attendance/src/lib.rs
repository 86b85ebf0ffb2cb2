//! `punchclock-attendance`: check-in/check-out against a remote HR backend.
//!
//! Two layers:
//!
//! | Layer | Type | Role |
//! |-------|------|------|
//! | Remote procedures | [`backend::RemoteBackend`] | `authenticate` / `read` / `search_read` / `create` / `write` |
//! | Attendance protocol | [`client::AttendanceClient`] | employee resolution, open/close/peek of attendance records |
//!
//! [`jsonrpc::JsonRpcBackend`] speaks Odoo-style JSON-RPC over HTTP. Every
//! logical operation authenticates afresh; sessions are never pooled.

pub mod backend;
pub mod client;
pub mod error;
pub mod jsonrpc;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
mod wire;

pub use backend::{BackendConnector, Domain, RemoteBackend, SearchQuery, Session};
pub use client::{connect_employee, AttendanceClient, AttendanceSession, CloseOutcome};
pub use error::{AttendanceError, RpcError};
pub use jsonrpc::{JsonRpcBackend, JsonRpcConnector};
