//! EventHub
//!
//! Client core of a community event-discovery app. Users browse, filter,
//! create and join local events; organizers decide on attendance requests;
//! admins approve submitted events. Persistence, authentication and realtime
//! change propagation are provided by a managed backend reached through the
//! [`gateway`] module.

#![allow(non_snake_case)]

pub mod config;
pub mod gateway;
pub mod services;
pub mod models;
pub mod state;
pub mod i18n;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{EventHubError, Result};

// Re-export main components for easy access
pub use gateway::{GatewayHandle, GatewayService};
pub use services::ServiceFactory;
pub use state::EventCollection;
pub use i18n::I18n;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
