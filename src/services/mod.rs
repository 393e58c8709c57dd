//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod events;
pub mod geocoding;
pub mod moderation;
pub mod notification;
pub mod session;

// Re-export commonly used services
pub use auth::{AuthService, Permission};
pub use events::{EventDetail, EventService};
pub use geocoding::{Geocoder, GeocodingService};
pub use moderation::{ModerationService, ModerationStats};
pub use notification::{Notice, NoticeLevel, NotificationService};
pub use session::{AuthBackend, AuthSession, GoTrueAuth, SessionChange, SessionEvent, SessionResolver, SessionSubscription};

use std::sync::Arc;
use crate::config::settings::Settings;
use crate::gateway::{Gateway, GatewayService};
use crate::i18n::I18n;
use crate::state::EventCollection;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub gateway: GatewayService,
    pub session: SessionResolver,
    pub auth_service: AuthService,
    pub notification_service: NotificationService,
    pub event_service: EventService,
    pub moderation_service: ModerationService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(
        settings: &Settings,
        gateway: Arc<dyn Gateway>,
        auth_backend: Arc<dyn AuthBackend>,
        geocoder: Arc<dyn Geocoder>,
        i18n: Arc<I18n>,
    ) -> Self {
        let gateway = GatewayService::new(gateway);
        let session = SessionResolver::new(auth_backend);
        let auth_service = AuthService::new(session.clone(), &settings.admin);
        let notification_service = NotificationService::new(i18n, &settings.i18n.default_language);
        let event_service = EventService::new(
            gateway.clone(),
            auth_service.clone(),
            geocoder,
            notification_service.clone(),
        );
        let moderation_service = ModerationService::new(
            gateway.clone(),
            auth_service.clone(),
            notification_service.clone(),
        );

        Self {
            gateway,
            session,
            auth_service,
            notification_service,
            event_service,
            moderation_service,
        }
    }

    /// View model over the public listing, sharing this factory's session
    pub fn event_collection(&self) -> EventCollection {
        EventCollection::new(
            self.gateway.clone(),
            self.session.clone(),
            self.notification_service.clone(),
        )
    }
}
