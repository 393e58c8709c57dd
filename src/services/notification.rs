//! Notification service implementation
//!
//! This service turns outcomes of user actions into short localized notices
//! (the toast equivalent) and broadcasts them to whatever presentation layer
//! is listening. Texts come from the i18n catalogues, keyed by
//! `{key}.title` and `{key}.description`.

use std::collections::HashMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use crate::i18n::{I18n, TranslationParams};
use crate::utils::errors::EventHubError;

/// Capacity of the notice channel; slow consumers lose the oldest notices
const NOTICE_BUFFER: usize = 32;

/// Visual weight of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// User-facing message about the outcome of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

/// Notification service for localized notices
#[derive(Clone)]
pub struct NotificationService {
    i18n: Arc<I18n>,
    language: String,
    sender: broadcast::Sender<Notice>,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(i18n: Arc<I18n>, language: &str) -> Self {
        let (sender, _) = broadcast::channel(NOTICE_BUFFER);
        let language = i18n.detect_language(Some(language));
        Self { i18n, language, sender }
    }

    /// Receive every notice published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Build a notice from a catalogue key without publishing it
    pub fn render(&self, level: NoticeLevel, key: &str, params: Option<&TranslationParams>) -> Notice {
        Notice {
            level,
            title: self.i18n.t(&format!("{}.title", key), &self.language, params),
            description: self.i18n.t(&format!("{}.description", key), &self.language, params),
        }
    }

    /// Build the notice describing an error
    pub fn render_error(&self, error: &EventHubError) -> Notice {
        let message = match error {
            EventHubError::Validation(message)
            | EventHubError::Authentication(message)
            | EventHubError::Config(message)
            | EventHubError::PermissionDenied(message) => message.clone(),
            other => other.to_string(),
        };
        let mut params = HashMap::new();
        params.insert("message".to_string(), message);

        self.render(NoticeLevel::Error, error.notice_key(), Some(&params))
    }

    /// Publish a notice; having no listener is not an error
    pub fn publish(&self, notice: Notice) -> Notice {
        debug!(level = ?notice.level, title = %notice.title, "Publishing notice");
        let _ = self.sender.send(notice.clone());
        notice
    }

    pub fn success(&self, key: &str, params: Option<&TranslationParams>) -> Notice {
        self.publish(self.render(NoticeLevel::Success, key, params))
    }

    pub fn info(&self, key: &str, params: Option<&TranslationParams>) -> Notice {
        self.publish(self.render(NoticeLevel::Info, key, params))
    }

    pub fn error(&self, error: &EventHubError) -> Notice {
        self.publish(self.render_error(error))
    }
}
