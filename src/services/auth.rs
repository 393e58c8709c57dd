//! Authorization service implementation
//!
//! This service answers who may do what: attending needs a session,
//! organizer operations need the event's organizer, moderation needs an admin
//! account. Admins are configured by email. Every check is local and runs
//! before any remote call.

use std::collections::HashSet;
use tracing::debug;
use crate::config::AdminConfig;
use crate::models::{Event, Identity};
use crate::services::session::SessionResolver;
use crate::utils::errors::{EventHubError, Result};

/// Permission levels for different operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Signed-in user: attend and create events
    User,
    /// Organizer of a specific event
    Organizer,
    /// Moderation of every event and user
    Admin,
}

/// Authorization service over the current session
#[derive(Clone)]
pub struct AuthService {
    session: SessionResolver,
    admin_emails: HashSet<String>,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(session: SessionResolver, config: &AdminConfig) -> Self {
        let admin_emails = config
            .emails
            .iter()
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty())
            .collect();

        Self { session, admin_emails }
    }

    pub fn session(&self) -> &SessionResolver {
        &self.session
    }

    /// Check if an email belongs to an admin account (case-insensitive)
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.trim().to_lowercase())
    }

    /// Check if the signed-in user is an admin
    pub fn is_admin(&self) -> bool {
        self.session
            .current()
            .map(|identity| self.is_admin_email(&identity.email))
            .unwrap_or(false)
    }

    /// Permissions of the current identity towards an event
    pub fn permissions_for(&self, event: Option<&Event>) -> HashSet<Permission> {
        let mut permissions = HashSet::new();
        let Some(identity) = self.session.current() else {
            return permissions;
        };

        permissions.insert(Permission::User);
        if event.map(|e| e.is_organized_by(identity.id)).unwrap_or(false) {
            permissions.insert(Permission::Organizer);
        }
        if self.is_admin_email(&identity.email) {
            permissions.insert(Permission::Admin);
        }

        permissions
    }

    /// Signed-in identity, or `AuthRequired`
    pub fn require_identity(&self) -> Result<Identity> {
        self.session.current().ok_or(EventHubError::AuthRequired)
    }

    /// Admin identity, or `AuthRequired` / `PermissionDenied`
    pub fn require_admin(&self) -> Result<Identity> {
        let identity = self.require_identity()?;
        if self.is_admin_email(&identity.email) {
            Ok(identity)
        } else {
            debug!(user_id = %identity.id, "Admin permission denied");
            Err(EventHubError::PermissionDenied("admin access required".to_string()))
        }
    }

    /// Organizer of the event, or `PermissionDenied`
    pub fn require_organizer(&self, event: &Event) -> Result<Identity> {
        let identity = self.require_identity()?;
        if event.is_organized_by(identity.id) {
            Ok(identity)
        } else {
            debug!(user_id = %identity.id, event_id = event.id, "Organizer permission denied");
            Err(EventHubError::PermissionDenied("only the organizer can manage this event".to_string()))
        }
    }

    /// Organizer of the event or an admin
    pub fn require_organizer_or_admin(&self, event: &Event) -> Result<Identity> {
        let identity = self.require_identity()?;
        if event.is_organized_by(identity.id) || self.is_admin_email(&identity.email) {
            Ok(identity)
        } else {
            debug!(user_id = %identity.id, event_id = event.id, "Edit permission denied");
            Err(EventHubError::PermissionDenied("only the organizer or an admin can change this event".to_string()))
        }
    }
}
