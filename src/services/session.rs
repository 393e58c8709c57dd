//! Session resolver implementation
//!
//! Holds the one authenticated identity of the running client and announces
//! every transition (sign-in, sign-out, token refresh, upstream loss) to
//! subscribers. Components that depend on identity receive the resolver
//! explicitly; there is no global session.

use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use crate::gateway::GatewayHandle;
use crate::models::Identity;
use crate::utils::errors::{EventHubError, GatewayError, Result};
use crate::utils::helpers::is_valid_email;
use crate::utils::logging::log_user_action;

/// Minimum password length accepted by the auth service
pub const MIN_PASSWORD_LENGTH: usize = 6;

const SESSION_EVENT_BUFFER: usize = 16;

/// Kind of session transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    /// Upstream invalidation, e.g. a refresh token that no longer works
    SessionLost,
}

/// A session transition and the identity in effect after it
#[derive(Debug, Clone, PartialEq)]
pub struct SessionChange {
    pub event: SessionEvent,
    pub identity: Option<Identity>,
}

/// Tokens and identity issued by the auth service
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub identity: Identity,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    /// True when the access token expires within `margin`
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at
            .map(|expires_at| expires_at - margin <= Utc::now())
            .unwrap_or(false)
    }
}

/// Authentication surface of the managed backend
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Identity behind an access token
    async fn user(&self, access_token: &str) -> Result<Identity>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// `None` when the account must be confirmed before a session is issued
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<AuthSession>>;

    async fn sign_out(&self, access_token: &str) -> Result<()>;

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession>;

    /// Called whenever the access token in effect changes
    async fn apply_token(&self, _access_token: Option<&str>) {}
}

/// Stream of session transitions, released on drop
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionChange>,
}

impl SessionSubscription {
    /// Next transition, or `None` once the resolver is gone
    pub async fn recv(&mut self) -> Option<SessionChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Session subscriber lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Explicit session context shared by every identity-dependent component
#[derive(Clone)]
pub struct SessionResolver {
    backend: Arc<dyn AuthBackend>,
    state: Arc<watch::Sender<Option<AuthSession>>>,
    changes: broadcast::Sender<SessionChange>,
}

impl SessionResolver {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        let (state, _) = watch::channel(None);
        let (changes, _) = broadcast::channel(SESSION_EVENT_BUFFER);
        Self {
            backend,
            state: Arc::new(state),
            changes,
        }
    }

    /// Identity of the signed-in user, if any
    pub fn current(&self) -> Option<Identity> {
        self.state.borrow().as_ref().map(|session| session.identity.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|session| session.access_token.clone())
    }

    /// Whether the current access token expires within `margin`
    pub fn needs_refresh(&self, margin: Duration) -> bool {
        self.state
            .borrow()
            .as_ref()
            .map(|session| session.expires_within(margin))
            .unwrap_or(false)
    }

    /// Subscribe to every subsequent session transition
    pub fn on_change(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.changes.subscribe(),
        }
    }

    /// Restore a session at startup by asking the backend who owns the token
    ///
    /// A token the backend no longer accepts is refreshed once; if that fails
    /// the session is reported lost.
    pub async fn init(&self, restored: Option<AuthSession>) -> Option<Identity> {
        let Some(session) = restored else {
            debug!("No session to restore");
            return None;
        };

        match self.backend.user(&session.access_token).await {
            Ok(identity) => {
                self.apply(SessionEvent::SignedIn, Some(AuthSession { identity, ..session })).await;
            }
            Err(e) => {
                warn!(error = %e, "Restored access token rejected, refreshing");
                match session.refresh_token.as_deref() {
                    Some(refresh_token) => match self.backend.refresh(refresh_token).await {
                        Ok(fresh) => self.apply(SessionEvent::TokenRefreshed, Some(fresh)).await,
                        Err(e) => {
                            warn!(error = %e, "Session refresh failed during init");
                            self.apply(SessionEvent::SessionLost, None).await;
                        }
                    },
                    None => self.apply(SessionEvent::SessionLost, None).await,
                }
            }
        }

        self.current()
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let email = email.trim();
        validate_credentials(email, password, 1)?;

        let session = self.backend.sign_in(email, password).await?;
        let identity = session.identity.clone();
        log_user_action(&identity.id.to_string(), "sign_in", None);
        self.apply(SessionEvent::SignedIn, Some(session)).await;

        Ok(identity)
    }

    /// Register a new account
    ///
    /// Returns the identity when the backend signs the user in immediately.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Identity>> {
        let email = email.trim();
        validate_credentials(email, password, MIN_PASSWORD_LENGTH)?;

        match self.backend.sign_up(email, password).await? {
            Some(session) => {
                let identity = session.identity.clone();
                log_user_action(&identity.id.to_string(), "sign_up", None);
                self.apply(SessionEvent::SignedIn, Some(session)).await;
                Ok(Some(identity))
            }
            None => {
                info!(email = %email, "Account created, confirmation pending");
                Ok(None)
            }
        }
    }

    /// Sign out; the local session is cleared even if the backend call fails
    pub async fn sign_out(&self) {
        let previous = self.state.borrow().clone();
        if let Some(session) = previous {
            if let Err(e) = self.backend.sign_out(&session.access_token).await {
                warn!(error = %e, "Remote sign-out failed, clearing local session anyway");
            }
            log_user_action(&session.identity.id.to_string(), "sign_out", None);
        }

        self.apply(SessionEvent::SignedOut, None).await;
    }

    /// Exchange the refresh token for a new session
    ///
    /// On failure the session is dropped and `SessionLost` is announced.
    pub async fn refresh(&self) -> Result<Identity> {
        let refresh_token = self
            .state
            .borrow()
            .as_ref()
            .and_then(|session| session.refresh_token.clone())
            .ok_or(EventHubError::AuthRequired)?;

        match self.backend.refresh(&refresh_token).await {
            Ok(session) => {
                let identity = session.identity.clone();
                self.apply(SessionEvent::TokenRefreshed, Some(session)).await;
                Ok(identity)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, session lost");
                self.apply(SessionEvent::SessionLost, None).await;
                Err(e)
            }
        }
    }

    /// Re-read the identity behind the current token
    pub async fn reload_user(&self) -> Result<Identity> {
        let session = self.state.borrow().clone().ok_or(EventHubError::AuthRequired)?;
        let identity = self.backend.user(&session.access_token).await?;

        if identity != session.identity {
            self.apply(SessionEvent::UserUpdated, Some(AuthSession { identity: identity.clone(), ..session }))
                .await;
        }

        Ok(identity)
    }

    /// Drop the session after an upstream invalidation
    pub async fn invalidate(&self) {
        info!("Session invalidated");
        self.apply(SessionEvent::SessionLost, None).await;
    }

    async fn apply(&self, event: SessionEvent, session: Option<AuthSession>) {
        self.backend
            .apply_token(session.as_ref().map(|s| s.access_token.as_str()))
            .await;

        let identity = session.as_ref().map(|s| s.identity.clone());
        self.state.send_replace(session);

        debug!(event = ?event, signed_in = identity.is_some(), "Session changed");
        let _ = self.changes.send(SessionChange { event, identity });
    }
}

fn validate_credentials(email: &str, password: &str, min_password: usize) -> Result<()> {
    if !is_valid_email(email) {
        return Err(EventHubError::Validation("email address is invalid".to_string()));
    }
    if password.chars().count() < min_password.max(1) {
        return Err(EventHubError::Validation(format!(
            "password must be at least {} characters",
            min_password.max(1)
        )));
    }
    Ok(())
}

/// Token response of the auth service
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: uuid::Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        Identity {
            id: user.id,
            email: user.email.unwrap_or_default(),
        }
    }
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .or_else(|| token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)));

        AuthSession {
            identity: token.user.into(),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
        }
    }
}

/// Error body variants returned by the auth service
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl AuthErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description.or(self.msg).or(self.message).or(self.error)
    }
}

/// Auth backend speaking the GoTrue HTTP API
#[derive(Clone)]
pub struct GoTrueAuth {
    handle: Arc<GatewayHandle>,
}

impl GoTrueAuth {
    pub fn new(handle: Arc<GatewayHandle>) -> Self {
        Self { handle }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .header("apikey", self.handle.anon_key())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AuthErrorBody>(&text)
            .ok()
            .and_then(AuthErrorBody::into_message)
            .unwrap_or_else(|| format!("HTTP {}", status));

        if status.is_server_error() {
            Err(EventHubError::Gateway(GatewayError::Rejected {
                table: "auth".to_string(),
                status: status.as_u16(),
                message,
            }))
        } else {
            Err(EventHubError::Authentication(message))
        }
    }

    async fn token(&self, grant_type: &str, body: Value) -> Result<AuthSession> {
        let url = self.handle.auth_url("token")?;
        let request = self
            .handle
            .http()
            .post(url)
            .query(&[("grant_type", grant_type)])
            .json(&body);

        let token: TokenResponse = self.send(request).await?.json().await?;
        Ok(token.into())
    }
}

#[async_trait]
impl AuthBackend for GoTrueAuth {
    async fn user(&self, access_token: &str) -> Result<Identity> {
        let url = self.handle.auth_url("user")?;
        let request = self.handle.http().get(url).bearer_auth(access_token);

        let user: UserResponse = self.send(request).await?.json().await?;
        Ok(user.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.token("password", json!({ "email": email, "password": password })).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<AuthSession>> {
        let url = self.handle.auth_url("signup")?;
        let request = self
            .handle
            .http()
            .post(url)
            .json(&json!({ "email": email, "password": password }));

        let body: Value = self.send(request).await?.json().await?;
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)?;
            Ok(Some(token.into()))
        } else {
            Ok(None)
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let url = self.handle.auth_url("logout")?;
        let request = self.handle.http().post(url).bearer_auth(access_token);
        self.send(request).await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        self.token("refresh_token", json!({ "refresh_token": refresh_token })).await
    }

    async fn apply_token(&self, access_token: Option<&str>) {
        self.handle.set_access_token(access_token.map(str::to_string)).await;
    }
}
