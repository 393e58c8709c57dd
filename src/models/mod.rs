//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod event;
pub mod category;
pub mod attendance;
pub mod user;

// Re-export commonly used models
pub use event::{Event, EventId, Coordinates, CreateEventForm, CreateEventRequest, UpdateEventRequest};
pub use category::Category;
pub use attendance::{AttendanceRecord, AttendanceStatus, ParticipationStatus, JoinRequest};
pub use user::{Identity, UserProfile};
