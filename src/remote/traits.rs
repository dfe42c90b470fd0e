//! Traits implemented by the host application's network collaborators.
//!
//! The synchronization core never talks to a concrete backend. The embedder
//! supplies an [`IdentityProvider`], a [`RemoteBoundary`] and a
//! [`PushChannel`]; tests supply in-memory fakes.

use crate::types::Identity;
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

/// Failure reported by the remote boundary.
///
/// Domain rejections (insufficient gold, unknown item) and transport
/// failures are indistinguishable at this layer; both carry only a message.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        RemoteError {
            message: message.into(),
        }
    }
}

/// Source of the current authenticated identity and its transitions.
pub trait IdentityProvider: Send + Sync {
    /// The identity of the current session, if any.
    fn current_identity(&self) -> Option<Identity>;

    /// Register a callback invoked on every identity transition (login,
    /// logout, switch). Returns a handle that cancels the watch on close.
    fn watch_identity(
        &self,
        callback: Box<dyn Fn(Option<Identity>) + Send + Sync>,
    ) -> Box<dyn Subscription>;
}

/// Request/response boundary to the remote service.
pub trait RemoteBoundary: Send + Sync {
    /// Invoke a named remote procedure. Blocks until the remote answers;
    /// callers inside this crate always wrap it with [`super::bounded_call`].
    fn call(&self, name: &str, params: JsonValue) -> Result<JsonValue, RemoteError>;

    /// Ordered read of a reference table (catalog data, not synced state).
    fn fetch_ordered(
        &self,
        table: &str,
        columns: &[&str],
        order_column: &str,
    ) -> Result<Vec<JsonValue>, RemoteError>;
}

/// Row-level filter for a push subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub equals: String,
}

impl RowFilter {
    pub fn eq(column: impl Into<String>, equals: impl Into<String>) -> Self {
        RowFilter {
            column: column.into(),
            equals: equals.into(),
        }
    }
}

/// Kind of row change carried by a push event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A change notification delivered by the push channel.
///
/// Row payloads are raw JSON; delivery is at-least-once and rows may be
/// partial or missing, so consumers must validate shape before applying.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub before: Option<JsonValue>,
    pub after: Option<JsonValue>,
}

impl ChangeEvent {
    pub fn insert(after: JsonValue) -> Self {
        ChangeEvent {
            op: ChangeOp::Insert,
            before: None,
            after: Some(after),
        }
    }

    pub fn update(before: Option<JsonValue>, after: JsonValue) -> Self {
        ChangeEvent {
            op: ChangeOp::Update,
            before,
            after: Some(after),
        }
    }

    pub fn delete(before: JsonValue) -> Self {
        ChangeEvent {
            op: ChangeOp::Delete,
            before: Some(before),
            after: None,
        }
    }
}

/// Push notification channel for server-originated row changes.
pub trait PushChannel: Send + Sync {
    /// Open a subscription on `topic` for rows of `table` matching `filter`.
    /// `on_event` may be invoked from any thread.
    fn subscribe(
        &self,
        topic: &str,
        table: &str,
        filter: RowFilter,
        on_event: Box<dyn Fn(ChangeEvent) + Send + Sync>,
    ) -> Result<Box<dyn Subscription>, RemoteError>;
}

/// Handle to an open watch or push subscription.
pub trait Subscription: Send {
    /// Close the subscription. Idempotent; safe on an already-closed handle.
    fn close(&mut self);
}

impl fmt::Debug for dyn Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription")
    }
}
