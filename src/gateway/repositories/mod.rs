//! Gateway repositories module
//!
//! This module contains typed repository implementations over the gateway tables

pub mod event;
pub mod category;
pub mod attendance;
pub mod user;

// Re-export repositories
pub use event::EventRepository;
pub use category::CategoryRepository;
pub use attendance::AttendanceRepository;
pub use user::UserRepository;

use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::gateway::Table;
use crate::utils::errors::{GatewayError, GatewayResult};

/// Decode raw gateway rows into typed models
pub(crate) fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> GatewayResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| {
                GatewayError::InvalidResponse(format!("unexpected {} row: {}", table, e))
            })
        })
        .collect()
}
