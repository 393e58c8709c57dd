//! State management module
//!
//! This module holds the client-side state of the event listing: the
//! attendance index, filter criteria and the view model that publishes
//! snapshots of both.

pub mod filters;
pub mod index;
pub mod view_model;

// Re-export commonly used state components
pub use filters::{apply_filters, DateRange, EventView, FilterCriteria, SortBy};
pub use index::{build_index, AttendanceIndex};
pub use view_model::{AttendanceChange, CollectionSnapshot, EventCollection, ListenerHandle, LoadPhase};
