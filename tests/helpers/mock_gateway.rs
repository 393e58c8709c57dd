//! In-memory gateway for testing
//!
//! Stores rows per table as JSON, applies equality filters and ordering the
//! way the REST service does, records every call and lets tests inject
//! failures, delays and change notifications.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use EventHub::gateway::{
    ChangeKind, ChangeKinds, ChangeNotification, ChangeSubscription, Filter, Gateway, Query, Table,
};
use EventHub::utils::errors::{GatewayError, GatewayResult};

/// Gateway operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Select,
    Insert,
    Update,
    Delete,
    Subscribe,
}

impl Op {
    pub fn is_mutation(self) -> bool {
        matches!(self, Op::Insert | Op::Update | Op::Delete)
    }
}

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCall {
    pub op: Op,
    pub table: Table,
    pub filters: Vec<Filter>,
}

struct Subscriber {
    table: Table,
    kinds: ChangeKinds,
    sender: mpsc::Sender<ChangeNotification>,
    released: oneshot::Receiver<()>,
}

/// Gateway holding its tables in memory
#[derive(Default)]
pub struct InMemoryGateway {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    calls: Mutex<Vec<GatewayCall>>,
    failures: Mutex<HashMap<(Op, Table), GatewayError>>,
    delays: Mutex<HashMap<Table, VecDeque<Duration>>>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicI64,
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|filter| literal(row.get(&filter.column).unwrap_or(&Value::Null)) == filter.literal())
}

fn compare(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => literal(a).cmp(&literal(b)),
    }
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1000),
            ..Default::default()
        }
    }

    /// Replace the rows of a table
    pub fn set_rows(&self, table: Table, rows: Vec<Value>) {
        self.tables.lock().unwrap().insert(table, rows);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables.lock().unwrap().get(&table).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls().iter().filter(|call| call.op.is_mutation()).count()
    }

    pub fn count_calls(&self, op: Op, table: Table) -> usize {
        self.calls().iter().filter(|call| call.op == op && call.table == table).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make every `op` on `table` fail until [`InMemoryGateway::heal`]
    pub fn fail(&self, op: Op, table: Table, error: GatewayError) {
        self.failures.lock().unwrap().insert((op, table), error);
    }

    pub fn heal(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Delay the next select on `table`; the rows are read before the delay
    pub fn delay_next_select(&self, table: Table, delay: Duration) {
        self.delays.lock().unwrap().entry(table).or_default().push_back(delay);
    }

    /// Push a change notification to every live subscriber of the table
    pub async fn emit(&self, table: Table, kind: ChangeKind, record: Option<Value>) {
        let senders: Vec<mpsc::Sender<ChangeNotification>> = {
            let mut subscribers = self.subscribers.lock().unwrap();
            subscribers.retain_mut(|s| !matches!(s.released.try_recv(), Ok(()) | Err(oneshot::error::TryRecvError::Closed)));
            subscribers
                .iter()
                .filter(|s| s.table == table && s.kinds.contains(kind))
                .map(|s| s.sender.clone())
                .collect()
        };

        for sender in senders {
            let _ = sender
                .send(ChangeNotification {
                    table,
                    kind,
                    record: record.clone(),
                    old_record: None,
                    commit_timestamp: None,
                })
                .await;
        }
    }

    /// Number of subscriptions not yet released
    pub fn live_subscriptions(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain_mut(|s| !matches!(s.released.try_recv(), Ok(()) | Err(oneshot::error::TryRecvError::Closed)));
        subscribers.len()
    }

    fn record(&self, op: Op, table: Table, filters: &[Filter]) -> GatewayResult<()> {
        self.calls.lock().unwrap().push(GatewayCall {
            op,
            table,
            filters: filters.to_vec(),
        });
        match self.failures.lock().unwrap().get(&(op, table)) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn select(&self, table: Table, query: Query) -> GatewayResult<Vec<Value>> {
        self.record(Op::Select, table, &query.filters)?;

        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| matches(row, &query.filters))
            .collect();
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                if order.ascending { ordering } else { ordering.reverse() }
            });
        }

        let delay = self.delays.lock().unwrap().get_mut(&table).and_then(VecDeque::pop_front);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(rows)
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> GatewayResult<Vec<Value>> {
        self.record(Op::Insert, table, &[])?;

        let mut stored = Vec::with_capacity(rows.len());
        let mut tables = self.tables.lock().unwrap();
        let existing = tables.entry(table).or_default();
        for mut row in rows {
            if table == Table::EventAttendees {
                let duplicate = existing.iter().any(|r| r["event_id"] == row["event_id"] && r["user_id"] == row["user_id"]);
                if duplicate {
                    return Err(GatewayError::Rejected {
                        table: table.to_string(),
                        status: 409,
                        message: "duplicate key value violates unique constraint".to_string(),
                    });
                }
            } else if row.get("id").map_or(true, Value::is_null) {
                row["id"] = Value::from(self.next_id.fetch_add(1, Ordering::SeqCst));
            }
            existing.push(row.clone());
            stored.push(row);
        }

        Ok(stored)
    }

    async fn update(&self, table: Table, patch: Value, filters: Vec<Filter>) -> GatewayResult<()> {
        self.record(Op::Update, table, &filters)?;

        let mut tables = self.tables.lock().unwrap();
        if let (Some(rows), Value::Object(patch)) = (tables.get_mut(&table), patch) {
            for row in rows.iter_mut().filter(|row| matches(row, &filters)) {
                for (key, value) in &patch {
                    row[key.as_str()] = value.clone();
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: Table, filters: Vec<Filter>) -> GatewayResult<()> {
        self.record(Op::Delete, table, &filters)?;

        if let Some(rows) = self.tables.lock().unwrap().get_mut(&table) {
            rows.retain(|row| !matches(row, &filters));
        }
        Ok(())
    }

    async fn subscribe(&self, table: Table, kinds: ChangeKinds) -> GatewayResult<ChangeSubscription> {
        self.record(Op::Subscribe, table, &[])?;

        let (sender, receiver) = mpsc::channel(16);
        let (cancel, released) = oneshot::channel();
        self.subscribers.lock().unwrap().push(Subscriber {
            table,
            kinds,
            sender,
            released,
        });
        Ok(ChangeSubscription::new(table, receiver, cancel))
    }
}
