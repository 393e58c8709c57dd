//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub backend: BackendConfig,
    pub realtime: RealtimeConfig,
    pub geocoding: GeocodingConfig,
    pub admin: AdminConfig,
    pub i18n: I18nConfig,
    pub logging: LoggingConfig,
}

/// Managed backend connection configuration
///
/// When both `url` and `anon_key` are set the configuration endpoint is not
/// contacted at all.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    pub config_endpoint: String,
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub request_timeout_seconds: u64,
}

/// Realtime change notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RealtimeConfig {
    pub enabled: bool,
    pub heartbeat_seconds: u64,
    pub channel_buffer: usize,
}

/// Forward geocoding configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeocodingConfig {
    pub api_url: String,
    pub access_token: Option<String>,
    pub timeout_seconds: u64,
}

/// Admin access configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    pub emails: Vec<String>,
}

/// Internationalization configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct I18nConfig {
    pub default_language: String,
    pub supported_languages: Vec<String>,
    pub translations_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub file_name: String,
}

impl Settings {
    /// Load settings from defaults, configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("EVENTHUB")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("admin.emails")
                    .with_list_parse_key("i18n.supported_languages")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::EventHubError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                config_endpoint: "http://localhost:8080/api/supabase-config".to_string(),
                url: None,
                anon_key: None,
                request_timeout_seconds: 15,
            },
            realtime: RealtimeConfig {
                enabled: true,
                heartbeat_seconds: 30,
                channel_buffer: 64,
            },
            geocoding: GeocodingConfig {
                api_url: "https://api.mapbox.com".to_string(),
                access_token: None,
                timeout_seconds: 5,
            },
            admin: AdminConfig {
                emails: vec!["admin@email.com".to_string()],
            },
            i18n: I18nConfig {
                default_language: "tr".to_string(),
                supported_languages: vec!["tr".to_string(), "en".to_string()],
                translations_dir: "translations".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: "logs".to_string(),
                file_name: "eventhub.log".to_string(),
            },
        }
    }
}
