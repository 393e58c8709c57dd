//! Translation loader and i18n management
//!
//! This module provides the message catalogues behind user-facing notices:
//! loading JSON files per language, nested key lookup, parameter
//! substitution and plural selection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use serde_json::{Value, Map};
use tokio::fs;
use tracing::{info, warn, error, debug};
use crate::utils::errors::{EventHubError, Result};
use crate::config::I18nConfig;

/// Main internationalization manager
#[derive(Debug, Clone)]
pub struct I18n {
    /// Loaded translations by language code
    translations: HashMap<String, Map<String, Value>>,
    /// Default language code
    default_language: String,
    /// Supported language codes
    supported_languages: Vec<String>,
    /// Directory holding `{lang}.json` catalogues
    translations_dir: PathBuf,
}

/// Translation parameters for message formatting
pub type TranslationParams = HashMap<String, String>;

impl I18n {
    /// Create a new I18n instance with no catalogues loaded
    pub fn new(config: &I18nConfig) -> Self {
        Self {
            translations: HashMap::new(),
            default_language: config.default_language.clone(),
            supported_languages: config.supported_languages.clone(),
            translations_dir: PathBuf::from(&config.translations_dir),
        }
    }

    /// Create an instance from in-memory catalogues
    pub fn with_messages(default_language: &str, catalogues: HashMap<String, Value>) -> Self {
        let mut translations = HashMap::new();
        for (lang, value) in catalogues {
            if let Value::Object(map) = value {
                translations.insert(lang, map);
            }
        }
        let mut supported_languages: Vec<String> = translations.keys().cloned().collect();
        supported_languages.sort();

        Self {
            translations,
            default_language: default_language.to_string(),
            supported_languages,
            translations_dir: PathBuf::new(),
        }
    }

    /// Load all translation files from the translations directory
    ///
    /// A missing catalogue for a secondary language is only logged; the
    /// default language's catalogue is required.
    pub async fn load_translations(&mut self) -> Result<()> {
        let translations_dir = self.translations_dir.clone();

        if !translations_dir.exists() {
            return Err(EventHubError::Config(format!(
                "Translations directory not found: {}",
                translations_dir.display()
            )));
        }

        let supported_languages = self.supported_languages.clone();
        for lang_code in &supported_languages {
            let file_path = translations_dir.join(format!("{}.json", lang_code));

            if file_path.exists() {
                match self.load_language_file(&file_path, lang_code).await {
                    Ok(_) => info!("Loaded translations for language: {}", lang_code),
                    Err(e) => {
                        error!("Failed to load translations for {}: {}", lang_code, e);
                        if lang_code == &self.default_language {
                            return Err(EventHubError::Config(
                                format!("Failed to load default language translations: {}", e)
                            ));
                        }
                    }
                }
            } else {
                warn!("Translation file not found: {}", file_path.display());
                if lang_code == &self.default_language {
                    return Err(EventHubError::Config(
                        format!("Default language translation file not found: {}", file_path.display())
                    ));
                }
            }
        }

        Ok(())
    }

    /// Load a single language file
    async fn load_language_file(&mut self, file_path: &Path, lang_code: &str) -> Result<()> {
        let content = fs::read_to_string(file_path).await?;
        let translations: Value = serde_json::from_str(&content)?;

        if let Value::Object(map) = translations {
            debug!("Loaded {} translation keys for {}", map.len(), lang_code);
            self.translations.insert(lang_code.to_string(), map);
        } else {
            return Err(EventHubError::Config(
                format!("Invalid translation file format for {}", lang_code)
            ));
        }

        Ok(())
    }

    /// Get a translated message
    ///
    /// Falls back to the default language, then to the key itself.
    pub fn t(&self, key: &str, lang: &str, params: Option<&TranslationParams>) -> String {
        let effective_lang = self.get_effective_language(lang);

        let translation = self
            .get_translation_value(key, &effective_lang)
            .or_else(|| {
                if effective_lang != self.default_language {
                    self.get_translation_value(key, &self.default_language)
                } else {
                    None
                }
            });

        match translation {
            Some(value) => {
                let text = self.extract_text_from_value(value);
                self.format_message(&text, params)
            }
            None => {
                warn!("Translation key '{}' not found", key);
                key.to_string()
            }
        }
    }

    /// Get a translated message with pluralization support
    pub fn tp(&self, key: &str, lang: &str, count: i64, params: Option<&TranslationParams>) -> String {
        let effective_lang = self.get_effective_language(lang);
        let plural_key = format!("{}.{}", key, Self::get_plural_form(count, &effective_lang));

        let mut final_params = params.cloned().unwrap_or_default();
        final_params.insert("count".to_string(), count.to_string());

        self.t(&plural_key, &effective_lang, Some(&final_params))
    }

    /// Check if a language is supported
    pub fn is_language_supported(&self, lang: &str) -> bool {
        self.supported_languages.iter().any(|l| l == lang)
    }

    /// Get the effective language (fallback to default if not supported)
    fn get_effective_language(&self, lang: &str) -> String {
        if self.is_language_supported(lang) && self.translations.contains_key(lang) {
            lang.to_string()
        } else {
            self.default_language.clone()
        }
    }

    /// Get translation value from nested JSON structure
    fn get_translation_value(&self, key: &str, lang: &str) -> Option<&Value> {
        let translations = self.translations.get(lang)?;

        // Nested keys like "errors.auth_required"
        let mut parts = key.split('.');
        let mut current = translations.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }

        Some(current)
    }

    /// Extract text from JSON value (handle both strings and plural objects)
    fn extract_text_from_value(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Object(obj) => {
                if let Some(other) = obj.get("other") {
                    self.extract_text_from_value(other)
                } else if let Some((_, first_value)) = obj.iter().next() {
                    self.extract_text_from_value(first_value)
                } else {
                    String::new()
                }
            }
            _ => value.to_string(),
        }
    }

    /// Format message with parameters
    fn format_message(&self, template: &str, params: Option<&TranslationParams>) -> String {
        match params {
            Some(params) => params.iter().fold(template.to_string(), |text, (key, value)| {
                text.replace(&format!("{{{}}}", key), value)
            }),
            None => template.to_string(),
        }
    }

    /// Plural category for a count
    fn get_plural_form(count: i64, lang: &str) -> &'static str {
        match lang {
            // Turkish nouns stay singular after numerals
            "tr" => "other",
            _ => {
                if count == 1 { "one" } else { "other" }
            }
        }
    }

    /// Get supported languages
    pub fn supported_languages(&self) -> &[String] {
        &self.supported_languages
    }

    /// Get default language
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Pick a supported language from a locale tag such as `en-US`
    pub fn detect_language(&self, locale: Option<&str>) -> String {
        if let Some(locale) = locale {
            let lang_code = locale.split(['-', '_']).next().unwrap_or(locale).to_lowercase();

            if self.is_language_supported(&lang_code) {
                return lang_code;
            }
        }

        self.default_language.clone()
    }
}
