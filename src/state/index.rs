//! Attendance index
//!
//! Per-event attendee counts and the current user's participation status,
//! derived from the loaded events and attendance records in one pass.

use std::collections::HashMap;
use uuid::Uuid;
use crate::models::{AttendanceRecord, Event, EventId, ParticipationStatus};

/// Derived attendance view over a set of events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceIndex {
    counts: HashMap<EventId, usize>,
    statuses: HashMap<EventId, ParticipationStatus>,
}

impl AttendanceIndex {
    /// Number of records for the event, whatever their status
    pub fn count(&self, event_id: EventId) -> usize {
        self.counts.get(&event_id).copied().unwrap_or(0)
    }

    /// Status of the current user towards the event
    pub fn status(&self, event_id: EventId) -> ParticipationStatus {
        self.statuses.get(&event_id).copied().unwrap_or_default()
    }

    pub fn counts(&self) -> &HashMap<EventId, usize> {
        &self.counts
    }

    pub fn statuses(&self) -> &HashMap<EventId, ParticipationStatus> {
        &self.statuses
    }

    pub fn contains(&self, event_id: EventId) -> bool {
        self.counts.contains_key(&event_id)
    }
}

/// Build the index for `current_user` (or for nobody)
///
/// Every event gets an entry; records pointing at events outside the set are
/// ignored.
pub fn build_index(events: &[Event], records: &[AttendanceRecord], current_user: Option<Uuid>) -> AttendanceIndex {
    let mut counts: HashMap<EventId, usize> = events.iter().map(|event| (event.id, 0)).collect();
    let mut statuses: HashMap<EventId, ParticipationStatus> = events
        .iter()
        .map(|event| (event.id, ParticipationStatus::None))
        .collect();

    for record in records {
        let Some(count) = counts.get_mut(&record.event_id) else {
            continue;
        };
        *count += 1;

        if current_user == Some(record.user_id) {
            statuses.insert(record.event_id, record.status().into());
        }
    }

    AttendanceIndex { counts, statuses }
}
