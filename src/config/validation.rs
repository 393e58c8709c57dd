//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{EventHubError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_backend_config(&settings.backend)?;
    validate_realtime_config(&settings.realtime)?;
    validate_geocoding_config(&settings.geocoding)?;
    validate_i18n_config(&settings.i18n)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate backend configuration
fn validate_backend_config(config: &super::BackendConfig) -> Result<()> {
    let has_direct = config.url.is_some() && config.anon_key.is_some();

    if !has_direct && config.config_endpoint.is_empty() {
        return Err(EventHubError::Config(
            "Either backend url and anon_key or a config endpoint is required".to_string()
        ));
    }

    if config.url.is_some() != config.anon_key.is_some() {
        return Err(EventHubError::Config(
            "Backend url and anon_key must be configured together".to_string()
        ));
    }

    if let Some(ref url) = config.url {
        url::Url::parse(url)?;
    }

    if config.request_timeout_seconds == 0 {
        return Err(EventHubError::Config(
            "Backend request timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate realtime configuration
fn validate_realtime_config(config: &super::RealtimeConfig) -> Result<()> {
    if config.enabled && config.heartbeat_seconds == 0 {
        return Err(EventHubError::Config(
            "Realtime heartbeat must be greater than 0".to_string()
        ));
    }

    if config.channel_buffer == 0 {
        return Err(EventHubError::Config(
            "Realtime channel buffer must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate geocoding configuration
fn validate_geocoding_config(config: &super::GeocodingConfig) -> Result<()> {
    if config.api_url.is_empty() {
        return Err(EventHubError::Config(
            "Geocoding API URL is required".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(EventHubError::Config(
            "Geocoding timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate internationalization configuration
fn validate_i18n_config(config: &super::I18nConfig) -> Result<()> {
    if config.default_language.is_empty() {
        return Err(EventHubError::Config(
            "Default language is required".to_string()
        ));
    }

    if config.supported_languages.is_empty() {
        return Err(EventHubError::Config(
            "At least one supported language is required".to_string()
        ));
    }

    if !config.supported_languages.contains(&config.default_language) {
        return Err(EventHubError::Config(
            "Default language must be in supported languages list".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EventHubError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EventHubError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
