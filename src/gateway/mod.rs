//! Remote data gateway module
//!
//! This module wraps the managed backend: a REST surface for table queries and
//! mutations, and a realtime surface for row change notifications. Everything
//! above this layer talks to the [`Gateway`] trait, never to HTTP directly.

pub mod connection;
pub mod rest;
pub mod realtime;
pub mod repositories;
pub mod service;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use crate::utils::errors::GatewayResult;

// Re-export commonly used gateway components
pub use connection::{GatewayConfig, GatewayHandle, fetch_gateway_config, resolve_gateway_config, health_check};
pub use rest::BackendGateway;
pub use realtime::RealtimeClient;
pub use repositories::{EventRepository, CategoryRepository, AttendanceRepository, UserRepository};
pub use service::{GatewayService, Listing};

/// Tables consumed by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Events,
    Categories,
    EventAttendees,
    Users,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Events => "events",
            Table::Categories => "categories",
            Table::EventAttendees => "event_attendees",
            Table::Users => "users",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "events" => Some(Table::Events),
            "categories" => Some(Table::Categories),
            "event_attendees" => Some(Table::EventAttendees),
            "users" => Some(Table::Users),
            _ => None,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality match on one column
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            value: value.into(),
        }
    }

    /// Value as it appears in a query string (`eq.<literal>`)
    pub fn literal(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => "null".to_string(),
            other => other.to_string(),
        }
    }
}

/// Ordering on one column
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Select query: optional projection, equality filters and ordering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub columns: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }
}

/// Kind of row change carried by a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "INSERT" => Some(ChangeKind::Insert),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// Set of change kinds a subscription listens for; empty means all
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeKinds(Vec<ChangeKind>);

impl ChangeKinds {
    pub fn all() -> Self {
        Self(Vec::new())
    }

    pub fn only(kinds: &[ChangeKind]) -> Self {
        Self(kinds.to_vec())
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kinds(&self) -> &[ChangeKind] {
        &self.0
    }

    pub fn contains(&self, kind: ChangeKind) -> bool {
        self.is_all() || self.0.contains(&kind)
    }
}

/// A row was inserted, updated or deleted in a subscribed table
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    pub table: Table,
    pub kind: ChangeKind,
    pub record: Option<Value>,
    pub old_record: Option<Value>,
    pub commit_timestamp: Option<String>,
}

/// Live change stream for one table
///
/// Dropping the subscription (or calling [`ChangeSubscription::unsubscribe`])
/// signals the producer to release the underlying channel.
#[derive(Debug)]
pub struct ChangeSubscription {
    table: Table,
    receiver: mpsc::Receiver<ChangeNotification>,
    cancel: Option<oneshot::Sender<()>>,
}

impl ChangeSubscription {
    pub fn new(
        table: Table,
        receiver: mpsc::Receiver<ChangeNotification>,
        cancel: oneshot::Sender<()>,
    ) -> Self {
        Self {
            table,
            receiver,
            cancel: Some(cancel),
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Next notification, or `None` once the producer has gone away
    pub async fn recv(&mut self) -> Option<ChangeNotification> {
        self.receiver.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
            tracing::debug!(table = %self.table, "Change subscription released");
        }
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Query, mutation and subscription surface of the managed backend
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch rows matching the query
    async fn select(&self, table: Table, query: Query) -> GatewayResult<Vec<Value>>;

    /// Insert rows and return them as stored
    async fn insert(&self, table: Table, rows: Vec<Value>) -> GatewayResult<Vec<Value>>;

    /// Apply a partial update to every row matching the filters
    async fn update(&self, table: Table, patch: Value, filters: Vec<Filter>) -> GatewayResult<()>;

    /// Delete every row matching the filters
    async fn delete(&self, table: Table, filters: Vec<Filter>) -> GatewayResult<()>;

    /// Open a change stream for a table
    async fn subscribe(&self, table: Table, kinds: ChangeKinds) -> GatewayResult<ChangeSubscription>;
}
