//! Event model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;
use crate::utils::helpers::{deserialize_id, deserialize_time};

/// Event identity; an integer key, accepted as a JSON number or string
pub type EventId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(deserialize_with = "deserialize_time")]
    pub time: NaiveTime,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub location_lat: Option<f64>,
    #[serde(default)]
    pub location_lng: Option<f64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default, rename = "maxAttendees")]
    pub max_attendees: Option<i32>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub organizer_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Resolved coordinates, when both halves are present
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.location_lat, self.location_lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }

    pub fn is_organized_by(&self, user_id: Uuid) -> bool {
        self.organizer_id == Some(user_id)
    }
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Raw creation form as submitted by the presentation layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEventForm {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub category_id: String,
    pub max_attendees: String,
    pub image: String,
}

/// Validated row inserted into the `events` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub category_id: i64,
    #[serde(rename = "maxAttendees")]
    pub max_attendees: Option<i32>,
    pub image: Option<String>,
    pub is_approved: bool,
    pub organizer_id: Uuid,
}

/// Partial update issued by an organizer or an admin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "maxAttendees")]
    pub max_attendees: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl UpdateEventRequest {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
