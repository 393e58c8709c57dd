//! Attendance model

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use super::event::EventId;
use crate::utils::helpers::deserialize_id;

/// Row of the `event_attendees` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub event_id: EventId,
    pub user_id: Uuid,
    #[serde(default)]
    pub status: Option<AttendanceStatus>,
}

impl AttendanceRecord {
    /// Stored status; rows written without one carry the column default
    pub fn status(&self) -> AttendanceStatus {
        self.status.unwrap_or(AttendanceStatus::Pending)
    }
}

/// Status stored on an attendance record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Pending,
    Approved,
    Rejected,
}

impl AttendanceStatus {
    /// Approved and rejected only change by deleting the record
    pub fn is_terminal(self) -> bool {
        !matches!(self, AttendanceStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Pending => "pending",
            AttendanceStatus::Approved => "approved",
            AttendanceStatus::Rejected => "rejected",
        }
    }
}

/// Status of the current user towards one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    #[default]
    None,
    Pending,
    Approved,
    Rejected,
}

impl From<AttendanceStatus> for ParticipationStatus {
    fn from(status: AttendanceStatus) -> Self {
        match status {
            AttendanceStatus::Pending => ParticipationStatus::Pending,
            AttendanceStatus::Approved => ParticipationStatus::Approved,
            AttendanceStatus::Rejected => ParticipationStatus::Rejected,
        }
    }
}

impl std::fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipationStatus::None => write!(f, "none"),
            ParticipationStatus::Pending => write!(f, "pending"),
            ParticipationStatus::Approved => write!(f, "approved"),
            ParticipationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Row inserted when a user joins an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub event_id: EventId,
    pub user_id: Uuid,
    pub status: AttendanceStatus,
}
