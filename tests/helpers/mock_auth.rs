//! Scripted auth backend and geocoders for testing

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;
use EventHub::models::{Coordinates, Identity};
use EventHub::services::{AuthBackend, AuthSession, Geocoder};
use EventHub::utils::errors::{EventHubError, Result};

/// Auth backend holding accounts in memory
///
/// Access tokens are `access-<uuid>-<n>`, refresh tokens `refresh-<uuid>-<n>`.
#[derive(Default)]
pub struct MockAuth {
    accounts: Mutex<HashMap<String, (String, Identity)>>,
    tokens: Mutex<HashMap<String, Identity>>,
    issued: AtomicUsize,
    pub fail_refresh: AtomicBool,
    pub fail_sign_out: AtomicBool,
    pub confirm_required: AtomicBool,
    applied: Mutex<Vec<Option<String>>>,
    sign_out_calls: AtomicUsize,
}

impl MockAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account and return its identity
    pub fn add_account(&self, email: &str, password: &str) -> Identity {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_lowercase(), (password.to_string(), identity.clone()));
        identity
    }

    /// Issue a session for an identity without going through sign-in
    pub fn issue(&self, identity: &Identity) -> AuthSession {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let access_token = format!("access-{}-{}", identity.id, n);
        self.tokens.lock().unwrap().insert(access_token.clone(), identity.clone());
        self.tokens
            .lock()
            .unwrap()
            .insert(format!("refresh-{}-{}", identity.id, n), identity.clone());

        AuthSession {
            identity: identity.clone(),
            access_token,
            refresh_token: Some(format!("refresh-{}-{}", identity.id, n)),
            expires_at: Some(Utc::now() + Duration::hours(1)),
        }
    }

    /// Forget every issued token
    pub fn revoke_all(&self) {
        self.tokens.lock().unwrap().clear();
    }

    /// Tokens handed to [`AuthBackend::apply_token`], in order
    pub fn applied_tokens(&self) -> Vec<Option<String>> {
        self.applied.lock().unwrap().clone()
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthBackend for MockAuth {
    async fn user(&self, access_token: &str) -> Result<Identity> {
        self.tokens
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or_else(|| EventHubError::Authentication("invalid JWT".to_string()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let account = self.accounts.lock().unwrap().get(&email.to_lowercase()).cloned();
        match account {
            Some((stored, identity)) if stored == password => Ok(self.issue(&identity)),
            _ => Err(EventHubError::Authentication("Invalid login credentials".to_string())),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<AuthSession>> {
        if self.accounts.lock().unwrap().contains_key(&email.to_lowercase()) {
            return Err(EventHubError::Authentication("User already registered".to_string()));
        }
        let identity = self.add_account(email, password);
        if self.confirm_required.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(self.issue(&identity)))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(EventHubError::Authentication("logout failed".to_string()));
        }
        self.tokens.lock().unwrap().remove(access_token);
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(EventHubError::Authentication("Invalid Refresh Token".to_string()));
        }
        let identity = self
            .tokens
            .lock()
            .unwrap()
            .get(refresh_token)
            .cloned()
            .ok_or_else(|| EventHubError::Authentication("Invalid Refresh Token".to_string()))?;
        Ok(self.issue(&identity))
    }

    async fn apply_token(&self, access_token: Option<&str>) {
        self.applied.lock().unwrap().push(access_token.map(str::to_string));
    }
}

/// Geocoder answering every lookup with the same result
pub struct StaticGeocoder {
    pub coordinates: Option<Coordinates>,
    lookups: Mutex<Vec<String>>,
}

impl StaticGeocoder {
    pub fn found(lat: f64, lng: f64) -> Self {
        Self {
            coordinates: Some(Coordinates { lat, lng }),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            coordinates: None,
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn resolve(&self, location: &str) -> Option<Coordinates> {
        self.lookups.lock().unwrap().push(location.to_string());
        self.coordinates
    }
}
