//! Session resolver tests, against the scripted backend and a mocked GoTrue

mod helpers;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use helpers::*;
use EventHub::gateway::{GatewayConfig, GatewayHandle};
use EventHub::services::{AuthBackend, GoTrueAuth, SessionEvent, SessionResolver};
use EventHub::utils::errors::{EventHubError, GatewayError};

fn resolver() -> (Arc<MockAuth>, SessionResolver) {
    init_test_env();
    let auth = Arc::new(MockAuth::new());
    (auth.clone(), SessionResolver::new(auth))
}

#[tokio::test]
async fn test_sign_in_announces_identity() {
    let (auth, session) = resolver();
    let expected = auth.add_account("ayse@example.com", PASSWORD);
    let mut changes = session.on_change();

    let identity = session.sign_in(" ayse@example.com ", PASSWORD).await.unwrap();

    assert_eq!(identity, expected);
    assert_eq!(session.current(), Some(expected.clone()));
    let change = changes.recv().await.unwrap();
    assert_eq!(change.event, SessionEvent::SignedIn);
    assert_eq!(change.identity, Some(expected));
    assert_eq!(auth.applied_tokens().len(), 1);
    assert!(auth.applied_tokens()[0].is_some());
}

#[tokio::test]
async fn test_sign_in_validates_locally() {
    let (auth, session) = resolver();

    assert_matches!(session.sign_in("not-an-email", PASSWORD).await, Err(EventHubError::Validation(_)));
    assert_matches!(session.sign_in("ayse@example.com", "").await, Err(EventHubError::Validation(_)));
    assert_matches!(session.sign_up("ayse@example.com", "12345").await, Err(EventHubError::Validation(_)));
    assert!(auth.applied_tokens().is_empty());
}

#[tokio::test]
async fn test_wrong_password_keeps_signed_out() {
    let (auth, session) = resolver();
    auth.add_account("ayse@example.com", PASSWORD);

    let result = session.sign_in("ayse@example.com", "wrong-password").await;
    assert_matches!(result, Err(EventHubError::Authentication(_)));
    assert!(session.current().is_none());
}

#[tokio::test]
async fn test_sign_out_delivers_empty_identity() {
    let (auth, session) = resolver();
    auth.add_account("ayse@example.com", PASSWORD);
    session.sign_in("ayse@example.com", PASSWORD).await.unwrap();
    let mut changes = session.on_change();

    session.sign_out().await;

    let change = changes.recv().await.unwrap();
    assert_eq!(change.event, SessionEvent::SignedOut);
    assert!(change.identity.is_none());
    assert!(session.current().is_none());
    assert_eq!(auth.applied_tokens().last(), Some(&None));
}

#[tokio::test]
async fn test_sign_out_clears_session_even_if_backend_fails() {
    let (auth, session) = resolver();
    auth.add_account("ayse@example.com", PASSWORD);
    session.sign_in("ayse@example.com", PASSWORD).await.unwrap();
    auth.fail_sign_out.store(true, Ordering::SeqCst);

    session.sign_out().await;

    assert_eq!(auth.sign_out_calls(), 1);
    assert!(session.current().is_none());
}

#[tokio::test]
async fn test_sign_up_with_and_without_confirmation() {
    let (auth, session) = resolver();

    let identity = session.sign_up("new@example.com", "123456").await.unwrap();
    assert!(identity.is_some());
    assert_eq!(session.current(), identity);

    session.sign_out().await;
    auth.confirm_required.store(true, Ordering::SeqCst);
    let identity = session.sign_up("pending@example.com", "123456").await.unwrap();
    assert!(identity.is_none());
    assert!(session.current().is_none());
}

#[tokio::test]
async fn test_refresh_failure_reports_session_lost() {
    let (auth, session) = resolver();
    auth.add_account("ayse@example.com", PASSWORD);
    session.sign_in("ayse@example.com", PASSWORD).await.unwrap();
    let mut changes = session.on_change();
    auth.fail_refresh.store(true, Ordering::SeqCst);

    assert!(session.refresh().await.is_err());

    let change = changes.recv().await.unwrap();
    assert_eq!(change.event, SessionEvent::SessionLost);
    assert!(change.identity.is_none());
    assert!(session.current().is_none());
}

#[tokio::test]
async fn test_refresh_issues_new_token() {
    let (auth, session) = resolver();
    auth.add_account("ayse@example.com", PASSWORD);
    session.sign_in("ayse@example.com", PASSWORD).await.unwrap();
    let before = session.access_token();

    session.refresh().await.unwrap();

    assert_ne!(session.access_token(), before);
    assert!(!session.needs_refresh(chrono::Duration::minutes(5)));
    assert!(session.needs_refresh(chrono::Duration::hours(2)));
}

#[tokio::test]
async fn test_refresh_without_session() {
    let (_, session) = resolver();
    assert_matches!(session.refresh().await, Err(EventHubError::AuthRequired));
}

#[tokio::test]
async fn test_init_restores_valid_session() {
    let (auth, session) = resolver();
    let identity = auth.add_account("ayse@example.com", PASSWORD);
    let stored = auth.issue(&identity);

    assert_eq!(session.init(Some(stored)).await, Some(identity.clone()));
    assert_eq!(session.current(), Some(identity));
}

#[tokio::test]
async fn test_init_with_revoked_tokens_loses_session() {
    let (auth, session) = resolver();
    let identity = auth.add_account("ayse@example.com", PASSWORD);
    let stored = auth.issue(&identity);
    auth.revoke_all();
    let mut changes = session.on_change();

    assert!(session.init(Some(stored)).await.is_none());
    assert_eq!(changes.recv().await.unwrap().event, SessionEvent::SessionLost);
}

#[tokio::test]
async fn test_dropped_resolver_closes_subscription() {
    let (_, session) = resolver();
    let mut changes = session.on_change();
    drop(session);
    let next = tokio::time::timeout(Duration::from_secs(1), changes.recv()).await.unwrap();
    assert!(next.is_none());
}

async fn gotrue() -> (MockServer, Arc<GatewayHandle>, GoTrueAuth) {
    init_test_env();
    let server = MockServer::start().await;
    let handle = Arc::new(
        GatewayHandle::new(
            GatewayConfig {
                url: server.uri(),
                anon_key: "anon-test-key".to_string(),
            },
            Duration::from_secs(2),
        )
        .unwrap(),
    );
    let auth = GoTrueAuth::new(handle.clone());
    (server, handle, auth)
}

fn token_body(user_id: Uuid) -> serde_json::Value {
    json!({
        "access_token": "jwt-access",
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "jwt-refresh",
        "user": { "id": user_id, "email": "ayse@example.com" }
    })
}

#[tokio::test]
async fn test_gotrue_password_grant() {
    let (server, handle, auth) = gotrue().await;
    let user_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon-test-key"))
        .and(body_json(json!({ "email": "ayse@example.com", "password": PASSWORD })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(user_id)))
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionResolver::new(Arc::new(auth));
    let identity = session.sign_in("ayse@example.com", PASSWORD).await.unwrap();

    assert_eq!(identity.id, user_id);
    assert_eq!(session.access_token().as_deref(), Some("jwt-access"));
    assert_eq!(handle.bearer().await, "jwt-access");

    session.invalidate().await;
    assert_eq!(handle.bearer().await, "anon-test-key");
}

#[tokio::test]
async fn test_gotrue_error_bodies() {
    let (server, _, auth) = gotrue().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = auth.sign_in("ayse@example.com", "wrong").await;
    assert_matches!(result, Err(EventHubError::Authentication(message)) if message == "Invalid login credentials");

    let result = auth.refresh("jwt-refresh").await;
    assert_matches!(
        result,
        Err(EventHubError::Gateway(GatewayError::Rejected { status: 503, .. }))
    );
}

#[tokio::test]
async fn test_gotrue_user_and_logout_use_bearer() {
    let (server, _, auth) = gotrue().await;
    let user_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer jwt-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": user_id, "email": "ayse@example.com" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer jwt-access"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(auth.user("jwt-access").await.unwrap().id, user_id);
    auth.sign_out("jwt-access").await.unwrap();
}

#[tokio::test]
async fn test_gotrue_sign_up_pending_confirmation() {
    let (server, _, auth) = gotrue().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": Uuid::new_v4(),
            "email": "new@example.com",
            "confirmation_sent_at": "2025-06-01T10:00:00Z"
        })))
        .mount(&server)
        .await;

    assert!(auth.sign_up("new@example.com", "123456").await.unwrap().is_none());
}
