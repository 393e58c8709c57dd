//! Attendance repository implementation

use std::sync::Arc;
use serde_json::json;
use uuid::Uuid;
use crate::gateway::{Filter, Gateway, Query, Table};
use crate::models::attendance::{AttendanceRecord, AttendanceStatus, JoinRequest};
use crate::models::event::EventId;
use crate::utils::errors::EventHubError;
use super::decode_rows;

#[derive(Clone)]
pub struct AttendanceRepository {
    gateway: Arc<dyn Gateway>,
}

impl AttendanceRepository {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Every attendance record of every event
    pub async fn list_all(&self) -> Result<Vec<AttendanceRecord>, EventHubError> {
        let rows = self
            .gateway
            .select(Table::EventAttendees, Query::all())
            .await?;

        Ok(decode_rows(Table::EventAttendees, rows)?)
    }

    /// Attendance records of one event
    pub async fn list_for_event(&self, event_id: EventId) -> Result<Vec<AttendanceRecord>, EventHubError> {
        let rows = self
            .gateway
            .select(Table::EventAttendees, Query::all().eq("event_id", event_id))
            .await?;

        Ok(decode_rows(Table::EventAttendees, rows)?)
    }

    /// Record of one user for one event
    pub async fn find(&self, event_id: EventId, user_id: Uuid) -> Result<Option<AttendanceRecord>, EventHubError> {
        let rows = self
            .gateway
            .select(
                Table::EventAttendees,
                Query::all().eq("event_id", event_id).eq("user_id", user_id.to_string()),
            )
            .await?;

        Ok(decode_rows::<AttendanceRecord>(Table::EventAttendees, rows)?.into_iter().next())
    }

    /// Create the attendance record for a join intent
    pub async fn join(&self, request: JoinRequest) -> Result<(), EventHubError> {
        let row = serde_json::to_value(&request)?;
        self.gateway.insert(Table::EventAttendees, vec![row]).await?;

        Ok(())
    }

    /// Remove the attendance record for a leave intent
    pub async fn leave(&self, event_id: EventId, user_id: Uuid) -> Result<(), EventHubError> {
        self.gateway
            .delete(
                Table::EventAttendees,
                vec![Filter::eq("event_id", event_id), Filter::eq("user_id", user_id.to_string())],
            )
            .await?;

        Ok(())
    }

    /// Update the status of one record
    pub async fn set_status(&self, event_id: EventId, user_id: Uuid, status: AttendanceStatus) -> Result<(), EventHubError> {
        self.gateway
            .update(
                Table::EventAttendees,
                json!({ "status": status.as_str() }),
                vec![Filter::eq("event_id", event_id), Filter::eq("user_id", user_id.to_string())],
            )
            .await?;

        Ok(())
    }
}
