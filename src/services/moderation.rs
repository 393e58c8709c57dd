//! Moderation service implementation
//!
//! Admin-only views and actions: the queue of submitted events, approving or
//! rejecting them and listing registered users. Access is checked locally
//! before anything is sent to the backend.

use tracing::info;
use crate::gateway::GatewayService;
use crate::models::{Event, EventId, UserProfile};
use crate::services::auth::AuthService;
use crate::services::notification::NotificationService;
use crate::utils::errors::Result;
use crate::utils::logging::log_admin_action;

/// Counters shown on the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModerationStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
}

/// Moderation service for admins
#[derive(Clone)]
pub struct ModerationService {
    gateway: GatewayService,
    auth: AuthService,
    notifications: NotificationService,
}

impl ModerationService {
    /// Create a new ModerationService instance
    pub fn new(gateway: GatewayService, auth: AuthService, notifications: NotificationService) -> Self {
        Self {
            gateway,
            auth,
            notifications,
        }
    }

    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.notifications.error(e);
        }
        result
    }

    /// Events waiting for approval, soonest first
    pub async fn pending_events(&self) -> Result<Vec<Event>> {
        let result = match self.auth.require_admin() {
            Ok(_) => self.gateway.events.list_pending().await,
            Err(e) => Err(e),
        };
        self.report(result)
    }

    /// Every event regardless of approval
    pub async fn all_events(&self) -> Result<Vec<Event>> {
        let result = match self.auth.require_admin() {
            Ok(_) => self.gateway.events.list_all().await,
            Err(e) => Err(e),
        };
        self.report(result)
    }

    /// Dashboard counters over every event
    pub async fn stats(&self) -> Result<ModerationStats> {
        let events = self.all_events().await?;
        let approved = events.iter().filter(|e| e.is_approved).count();
        Ok(ModerationStats {
            total: events.len(),
            pending: events.len() - approved,
            approved,
        })
    }

    /// Publish a submitted event
    pub async fn approve(&self, event_id: EventId) -> Result<()> {
        let result = self.try_approve(event_id).await;
        self.report(result)
    }

    async fn try_approve(&self, event_id: EventId) -> Result<()> {
        let admin = self.auth.require_admin()?;
        self.gateway.events.set_approved(event_id, true).await?;

        log_admin_action(&admin.email, "approve_event", Some(&event_id.to_string()), None);
        self.notifications.success("moderation.approved", None);
        Ok(())
    }

    /// Reject a submitted event; rejected events are deleted
    pub async fn reject(&self, event_id: EventId) -> Result<()> {
        let result = self.try_delete(event_id, "reject_event", "moderation.rejected").await;
        self.report(result)
    }

    /// Delete any event
    pub async fn delete_event(&self, event_id: EventId) -> Result<()> {
        let result = self.try_delete(event_id, "delete_event", "events.deleted").await;
        self.report(result)
    }

    async fn try_delete(&self, event_id: EventId, action: &str, notice_key: &str) -> Result<()> {
        let admin = self.auth.require_admin()?;
        self.gateway.events.delete(event_id).await?;

        log_admin_action(&admin.email, action, Some(&event_id.to_string()), None);
        self.notifications.success(notice_key, None);
        Ok(())
    }

    /// Registered users
    pub async fn list_users(&self) -> Result<Vec<UserProfile>> {
        let result = match self.auth.require_admin() {
            Ok(admin) => {
                let users = self.gateway.users.list().await;
                if let Ok(users) = &users {
                    info!(admin = %admin.email, count = users.len(), "User list loaded");
                }
                users
            }
            Err(e) => Err(e),
        };
        self.report(result)
    }

    /// Whether the moderation views are reachable for the current session
    pub fn can_moderate(&self) -> bool {
        self.auth.is_admin()
    }

    /// Fail fast with the error a moderation view would show
    pub fn check_access(&self) -> Result<()> {
        self.auth.require_admin().map(|_| ())
    }
}
