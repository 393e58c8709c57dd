//! Realtime change notifications
//!
//! The backend's realtime service speaks Phoenix channel JSON over a websocket.
//! Each subscription owns one socket: it joins `realtime:public:{table}` with a
//! `postgres_changes` binding, keeps the socket alive with heartbeats, pushes
//! the session's new access token whenever it changes and forwards decoded
//! row changes into an mpsc channel until it is released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use crate::config::RealtimeConfig;
use crate::gateway::{ChangeKind, ChangeKinds, ChangeNotification, ChangeSubscription, GatewayHandle, Table};
use crate::utils::errors::{GatewayError, GatewayResult};

/// Envelope of every Phoenix channel message
#[derive(Debug, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
}

/// Row change payload
#[derive(Debug, Deserialize)]
struct ChangePayload {
    #[serde(rename = "type")]
    kind: String,
    table: String,
    #[serde(default)]
    record: Option<Value>,
    #[serde(default)]
    old_record: Option<Value>,
    #[serde(default)]
    commit_timestamp: Option<String>,
}

/// Client for the realtime websocket service
#[derive(Clone)]
pub struct RealtimeClient {
    handle: Arc<GatewayHandle>,
    heartbeat: Duration,
    buffer: usize,
    next_ref: Arc<AtomicU64>,
}

impl RealtimeClient {
    pub fn new(handle: Arc<GatewayHandle>, config: &RealtimeConfig) -> Self {
        Self {
            handle,
            heartbeat: Duration::from_secs(config.heartbeat_seconds),
            buffer: config.channel_buffer,
            next_ref: Arc::new(AtomicU64::new(1)),
        }
    }

    fn next_ref(&self) -> String {
        self.next_ref.fetch_add(1, Ordering::Relaxed).to_string()
    }

    /// Open a socket, join the table's channel and start forwarding changes
    pub async fn subscribe(&self, table: Table, kinds: ChangeKinds) -> GatewayResult<ChangeSubscription> {
        let url = self
            .handle
            .realtime_url()
            .map_err(|e| GatewayError::RequestFailed { table: table.to_string(), message: e.to_string() })?;

        let (socket, _) = connect_async(url.as_str()).await.map_err(|e| {
            warn!(table = %table, error = %e, "Realtime connection failed");
            GatewayError::Unavailable
        })?;
        let (mut sink, mut stream) = socket.split();

        let topic = format!("realtime:public:{}", table);
        let mut tokens = self.handle.watch_access_token();
        let anon_key = self.handle.anon_key().to_string();
        let join_ref = self.next_ref();
        let join = join_message(&topic, table, &kinds, &self.handle.bearer().await, &join_ref);
        sink.send(Message::Text(join.to_string())).await.map_err(|e| GatewayError::RequestFailed {
            table: table.to_string(),
            message: e.to_string(),
        })?;
        info!(table = %table, topic = %topic, "Realtime channel joined");

        let (tx, rx) = mpsc::channel(self.buffer);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let refs = self.next_ref.clone();
        let period = self.heartbeat;

        tokio::spawn(async move {
            let mut heartbeat = interval_at(Instant::now() + period, period);
            let mut follow_tokens = true;
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => {
                        let reference = refs.fetch_add(1, Ordering::Relaxed).to_string();
                        let leave = control_message(&topic, "phx_leave", &reference);
                        let _ = sink.send(Message::Text(leave.to_string())).await;
                        let _ = sink.close().await;
                        debug!(topic = %topic, "Realtime channel left");
                        break;
                    }
                    changed = tokens.changed(), if follow_tokens => {
                        if changed.is_err() {
                            follow_tokens = false;
                            continue;
                        }
                        let token = tokens.borrow_and_update().clone().unwrap_or_else(|| anon_key.clone());
                        let reference = refs.fetch_add(1, Ordering::Relaxed).to_string();
                        let update = access_token_message(&topic, &token, &reference);
                        if let Err(e) = sink.send(Message::Text(update.to_string())).await {
                            warn!(topic = %topic, error = %e, "Realtime token update failed");
                            break;
                        }
                        debug!(topic = %topic, "Realtime access token updated");
                    }
                    _ = heartbeat.tick() => {
                        let reference = refs.fetch_add(1, Ordering::Relaxed).to_string();
                        let beat = control_message("phoenix", "heartbeat", &reference);
                        if let Err(e) = sink.send(Message::Text(beat.to_string())).await {
                            warn!(topic = %topic, error = %e, "Realtime heartbeat failed");
                            break;
                        }
                    }
                    message = stream.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(change) = decode_change(&text) {
                                if !kinds.contains(change.kind) {
                                    continue;
                                }
                                if tx.send(change).await.is_err() {
                                    break;
                                }
                            } else {
                                log_control_reply(&topic, &text);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            warn!(topic = %topic, "Realtime socket closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(topic = %topic, error = %e, "Realtime socket error");
                            break;
                        }
                    }
                }
            }
        });

        Ok(ChangeSubscription::new(table, rx, cancel_tx))
    }
}

/// `phx_join` message with a `postgres_changes` binding per change kind
fn join_message(topic: &str, table: Table, kinds: &ChangeKinds, access_token: &str, reference: &str) -> Value {
    let bindings: Vec<Value> = if kinds.is_all() {
        vec![json!({ "event": "*", "schema": "public", "table": table.as_str() })]
    } else {
        kinds
            .kinds()
            .iter()
            .map(|kind| json!({ "event": kind.as_str(), "schema": "public", "table": table.as_str() }))
            .collect()
    };

    json!({
        "topic": topic,
        "event": "phx_join",
        "payload": {
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": bindings,
            },
            "access_token": access_token,
        },
        "ref": reference,
        "join_ref": reference,
    })
}

fn control_message(topic: &str, event: &str, reference: &str) -> Value {
    json!({
        "topic": topic,
        "event": event,
        "payload": {},
        "ref": reference,
    })
}

/// Message replacing the token a joined channel authorizes rows with
fn access_token_message(topic: &str, access_token: &str, reference: &str) -> Value {
    json!({
        "topic": topic,
        "event": "access_token",
        "payload": { "access_token": access_token },
        "ref": reference,
    })
}

fn log_control_reply(topic: &str, text: &str) {
    match serde_json::from_str::<PhoenixMessage>(text) {
        Ok(message) if message.event == "phx_reply" => {
            let status = message.payload.get("status").and_then(Value::as_str).unwrap_or("unknown");
            if status == "ok" {
                debug!(topic = %message.topic, "Realtime reply ok");
            } else {
                warn!(topic = %message.topic, status = status, response = %message.payload, "Realtime request refused");
            }
        }
        Ok(message) if message.event == "phx_error" => {
            warn!(topic = %topic, payload = %message.payload, "Realtime channel error");
        }
        Ok(_) => {}
        Err(e) => debug!(topic = %topic, error = %e, "Ignoring undecodable realtime frame"),
    }
}

/// Decode a row change from a realtime frame
///
/// Understands both the `postgres_changes` envelope (change under
/// `payload.data`) and the older per-kind events (`INSERT`, `UPDATE`,
/// `DELETE` with the change as the payload itself).
pub fn decode_change(text: &str) -> Option<ChangeNotification> {
    let message: PhoenixMessage = serde_json::from_str(text).ok()?;

    let payload = if message.event == "postgres_changes" {
        message.payload.get("data")?.clone()
    } else if ChangeKind::from_name(&message.event).is_some() {
        message.payload
    } else {
        return None;
    };

    let change: ChangePayload = serde_json::from_value(payload).ok()?;
    Some(ChangeNotification {
        table: Table::from_name(&change.table)?,
        kind: ChangeKind::from_name(&change.kind)?,
        record: change.record.filter(|r| !r.is_null()),
        old_record: change.old_record.filter(|r| !r.is_null()),
        commit_timestamp: change.commit_timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_postgres_changes_frame() {
        let frame = r#"{
            "topic": "realtime:public:events",
            "event": "postgres_changes",
            "payload": {
                "data": {
                    "type": "UPDATE", "table": "events", "schema": "public",
                    "record": {"id": 4, "is_approved": true},
                    "old_record": {"id": 4},
                    "commit_timestamp": "2025-07-01T10:00:00Z"
                },
                "ids": [1]
            },
            "ref": null
        }"#;
        let change = decode_change(frame).unwrap();
        assert_eq!(change.table, Table::Events);
        assert_eq!(change.kind, ChangeKind::Update);
        assert_eq!(change.record.unwrap()["is_approved"], json!(true));
    }

    #[test]
    fn test_decode_legacy_frame() {
        let frame = r#"{
            "topic": "realtime:public:event_attendees",
            "event": "DELETE",
            "payload": {"type": "DELETE", "table": "event_attendees", "record": null, "old_record": {"event_id": 1}},
            "ref": null
        }"#;
        let change = decode_change(frame).unwrap();
        assert_eq!(change.table, Table::EventAttendees);
        assert_eq!(change.kind, ChangeKind::Delete);
        assert!(change.record.is_none());
        assert!(change.old_record.is_some());
    }

    #[test]
    fn test_control_frames_are_not_changes() {
        let reply = r#"{"topic": "phoenix", "event": "phx_reply", "payload": {"status": "ok", "response": {}}, "ref": "2"}"#;
        assert!(decode_change(reply).is_none());
        assert!(decode_change("not json").is_none());
    }

    #[test]
    fn test_join_message_bindings() {
        let all = join_message("realtime:public:events", Table::Events, &ChangeKinds::all(), "token", "1");
        assert_eq!(all["payload"]["config"]["postgres_changes"][0]["event"], json!("*"));
        assert_eq!(all["payload"]["access_token"], json!("token"));

        let some = join_message(
            "realtime:public:events",
            Table::Events,
            &ChangeKinds::only(&[ChangeKind::Insert, ChangeKind::Delete]),
            "token",
            "2",
        );
        let bindings = some["payload"]["config"]["postgres_changes"].as_array().unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[1]["event"], json!("DELETE"));
    }
}
