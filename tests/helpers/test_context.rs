//! Test context for unified test setup
//!
//! Wires the in-memory gateway, the scripted auth backend and a static
//! geocoder into a real [`ServiceFactory`] with the shipped translations.

use std::sync::Arc;
use serde_json::Value;
use EventHub::config::Settings;
use EventHub::gateway::Table;
use EventHub::i18n::I18n;
use EventHub::models::Identity;
use EventHub::services::{Geocoder, ServiceFactory};

use super::mock_auth::{MockAuth, StaticGeocoder};
use super::mock_gateway::InMemoryGateway;
use super::simple_test::init_test_env;

pub const ADMIN_EMAIL: &str = "admin@email.com";
pub const PASSWORD: &str = "secret-password";

/// Unified test context that manages all test components
pub struct TestContext {
    pub gateway: Arc<InMemoryGateway>,
    pub auth: Arc<MockAuth>,
    pub settings: Settings,
    pub services: ServiceFactory,
}

impl TestContext {
    /// Context with an empty backend and a geocoder that finds everything
    pub async fn new() -> Self {
        Self::with_geocoder(Arc::new(StaticGeocoder::found(40.9877, 29.0253))).await
    }

    pub async fn with_geocoder(geocoder: Arc<dyn Geocoder>) -> Self {
        init_test_env();

        let settings = Self::create_test_settings();
        let mut i18n = I18n::new(&settings.i18n);
        i18n.load_translations().await.expect("shipped translations must load");

        let gateway = Arc::new(InMemoryGateway::new());
        let auth = Arc::new(MockAuth::new());
        let services = ServiceFactory::new(
            &settings,
            gateway.clone(),
            auth.clone(),
            geocoder,
            Arc::new(i18n),
        );

        Self {
            gateway,
            auth,
            settings,
            services,
        }
    }

    fn create_test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.backend.url = Some("http://localhost:54321".to_string());
        settings.backend.anon_key = Some("anon-test-key".to_string());
        settings.realtime.enabled = false;
        settings.admin.emails = vec![ADMIN_EMAIL.to_string()];
        settings.i18n.default_language = "en".to_string();
        settings.i18n.translations_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/translations").to_string();
        settings
    }

    /// Seed the backend tables
    pub fn seed(&self, categories: Vec<Value>, events: Vec<Value>, attendance: Vec<Value>) {
        self.gateway.set_rows(Table::Categories, categories);
        self.gateway.set_rows(Table::Events, events);
        self.gateway.set_rows(Table::EventAttendees, attendance);
    }

    /// Register an account and sign it in through the session resolver
    pub async fn sign_in_as(&self, email: &str) -> Identity {
        self.auth.add_account(email, PASSWORD);
        self.services
            .session
            .sign_in(email, PASSWORD)
            .await
            .expect("sign-in must succeed")
    }

    pub async fn sign_in_admin(&self) -> Identity {
        self.sign_in_as(ADMIN_EMAIL).await
    }
}
