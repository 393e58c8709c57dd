//! Test data helpers for creating backend rows
//!
//! Rows are plain JSON shaped like the backend tables, so tests exercise the
//! same decoding as production code.

use chrono::NaiveDate;
use fake::faker::address::en::CityName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Sentence, Word};
use fake::Fake;
use serde_json::{json, Value};
use uuid::Uuid;
use EventHub::models::{CreateEventForm, Event};

/// Approved event row with the given id, title and date
pub fn event_row(id: i64, title: &str, date: &str) -> Value {
    let city: String = CityName().fake();
    let description: String = Sentence(3..8).fake();
    json!({
        "id": id,
        "title": title,
        "description": description,
        "date": date,
        "time": "19:30:00",
        "location": format!("Moda Sahnesi, {}", city),
        "location_lat": null,
        "location_lng": null,
        "category_id": 1,
        "maxAttendees": null,
        "image": null,
        "is_approved": true,
        "organizer_id": null,
        "created_at": "2025-06-01T10:00:00Z"
    })
}

/// Builder-style tweaks on an event row
pub trait EventRowExt {
    fn category(self, category_id: i64) -> Value;
    fn location(self, location: &str) -> Value;
    fn capacity(self, max: i32) -> Value;
    fn organizer(self, organizer_id: Uuid) -> Value;
    fn pending(self) -> Value;
    fn time(self, time: &str) -> Value;
}

impl EventRowExt for Value {
    fn category(mut self, category_id: i64) -> Value {
        self["category_id"] = json!(category_id);
        self
    }

    fn location(mut self, location: &str) -> Value {
        self["location"] = json!(location);
        self
    }

    fn capacity(mut self, max: i32) -> Value {
        self["maxAttendees"] = json!(max);
        self
    }

    fn organizer(mut self, organizer_id: Uuid) -> Value {
        self["organizer_id"] = json!(organizer_id);
        self
    }

    fn pending(mut self) -> Value {
        self["is_approved"] = json!(false);
        self
    }

    fn time(mut self, time: &str) -> Value {
        self["time"] = json!(time);
        self
    }
}

pub fn category_row(id: i64, name: &str) -> Value {
    json!({ "id": id, "name": name })
}

pub fn attendance_row(event_id: i64, user_id: Uuid, status: Option<&str>) -> Value {
    json!({ "event_id": event_id, "user_id": user_id, "status": status })
}

pub fn user_row(id: Uuid, email: &str, full_name: Option<&str>) -> Value {
    json!({
        "id": id,
        "email": email,
        "role": "user",
        "full_name": full_name,
        "avatar_url": null,
        "created_at": "2025-01-01T00:00:00Z"
    })
}

/// Random user row
pub fn random_user_row() -> (Uuid, Value) {
    let id = Uuid::new_v4();
    let email: String = SafeEmail().fake();
    (id, user_row(id, &email, None))
}

/// Decode a row into the domain model
pub fn event(row: Value) -> Event {
    serde_json::from_value(row).expect("event row must decode")
}

/// Events titled with random words, dated across one summer
pub fn random_events(count: usize) -> Vec<Event> {
    (0..count)
        .map(|i| {
            let title: String = Word().fake();
            let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap() + chrono::Duration::days((i * 7 % 60) as i64);
            event(event_row(i as i64 + 1, &title, &date.to_string()))
        })
        .collect()
}

/// Complete creation form
pub fn valid_form(category_id: i64) -> CreateEventForm {
    CreateEventForm {
        title: "Swing Night".to_string(),
        description: "Beginner friendly social dance".to_string(),
        date: "2025-09-12".to_string(),
        time: "20:00".to_string(),
        location: "Moda Sahnesi, Kadıköy, İstanbul".to_string(),
        category_id: category_id.to_string(),
        max_attendees: "40".to_string(),
        image: String::new(),
    }
}

/// The catalogue of categories used across suites
pub fn default_categories() -> Vec<Value> {
    vec![
        category_row(1, "Dans"),
        category_row(2, "Müzik"),
        category_row(3, "Spor"),
    ]
}
