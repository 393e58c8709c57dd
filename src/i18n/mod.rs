//! Internationalization module
//!
//! This module handles multi-language support for user-facing notices.
//! Catalogues are JSON files per language with nested keys; Turkish is the
//! default and English the secondary language.

pub mod loader;

// Re-export commonly used i18n components
pub use loader::{I18n, TranslationParams};
