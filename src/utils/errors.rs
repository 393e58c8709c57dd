//! Error handling for EventHub
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for EventHub application
#[derive(Error, Debug)]
pub enum EventHubError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Event {event_id} is full")]
    EventFull { event_id: i64 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Errors reported by the remote data gateway
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("request to {table} failed: {message}")]
    RequestFailed { table: String, message: String },

    #[error("{table} rejected the request ({status}): {message}")]
    Rejected { table: String, status: u16, message: String },

    #[error("gateway timeout")]
    Timeout,

    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error("gateway unavailable")]
    Unavailable,
}

/// Geocoding specific errors
///
/// These never escape [`crate::services::geocoding::Geocoder::resolve`]; they
/// exist so the lookup can be logged with a reason before being dropped.
#[derive(Error, Debug)]
pub enum GeocodingError {
    #[error("geocoding is not configured")]
    NotConfigured,

    #[error("geocoding request failed: {0}")]
    RequestFailed(String),

    #[error("no candidates for location")]
    NoMatch,

    #[error("invalid geocoding response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for EventHub operations
pub type Result<T> = std::result::Result<T, EventHubError>;

/// Result type alias for gateway operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Result type alias for geocoding lookups
pub type GeocodingResult<T> = std::result::Result<T, GeocodingError>;

impl EventHubError {
    /// Check if the error is recoverable by re-issuing the same action
    pub fn is_recoverable(&self) -> bool {
        match self {
            EventHubError::Gateway(GatewayError::Rejected { .. }) => false,
            EventHubError::Gateway(_) => true,
            EventHubError::Config(_) => false,
            EventHubError::AuthRequired => false,
            EventHubError::PermissionDenied(_) => false,
            EventHubError::EventNotFound { .. } => false,
            EventHubError::EventFull { .. } => false,
            EventHubError::Validation(_) => false,
            EventHubError::Authentication(_) => false,
            EventHubError::Http(_) => true,
            EventHubError::Serialization(_) => false,
            EventHubError::Io(_) => true,
            EventHubError::UrlParse(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EventHubError::Config(_) => ErrorSeverity::Critical,
            EventHubError::AuthRequired => ErrorSeverity::Warning,
            EventHubError::PermissionDenied(_) => ErrorSeverity::Warning,
            EventHubError::Authentication(_) => ErrorSeverity::Warning,
            EventHubError::Validation(_) => ErrorSeverity::Info,
            EventHubError::EventNotFound { .. } => ErrorSeverity::Info,
            EventHubError::EventFull { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Translation key of the user-facing notice for this error
    pub fn notice_key(&self) -> &'static str {
        match self {
            EventHubError::AuthRequired => "errors.auth_required",
            EventHubError::PermissionDenied(_) => "errors.permission_denied",
            EventHubError::EventNotFound { .. } => "errors.event_not_found",
            EventHubError::EventFull { .. } => "attendance.full",
            EventHubError::Validation(_) => "errors.validation",
            EventHubError::Authentication(_) => "errors.authentication",
            EventHubError::Config(_) => "errors.configuration",
            _ => "errors.network",
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
