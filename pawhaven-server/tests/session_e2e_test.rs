//! The session layer against the real backend

mod helpers;

use helpers::{spawn_app, ADMIN_EMAIL, ADMIN_PASSWORD};
use pawhaven_core::{ProfileUpdate, RegisterRequest};
use pawhaven_session::{
    ApiClientConfig, AuthSession, GuardDecision, Location, MemoryNavigator, Navigator,
    RouteTable, SessionError, TokenStore,
};
use serde_json::Value;
use std::sync::Arc;

fn session_for(address: &str, store: TokenStore) -> (AuthSession, Arc<MemoryNavigator>) {
    let navigator = Arc::new(MemoryNavigator::new(Location::new("/dashboard/admin")));
    let session = AuthSession::new(
        ApiClientConfig::new(address).with_timeout(5),
        store,
        navigator.clone(),
    )
    .unwrap();
    (session, navigator)
}

#[tokio::test]
async fn test_register_update_logout_round() {
    let app = spawn_app().await;
    let store = TokenStore::in_memory();
    let (session, _) = session_for(&app.address, store.clone());
    session.init().await;

    let user = session
        .register(RegisterRequest {
            name: "Leo".to_string(),
            email: "leo@example.com".to_string(),
            password: "hunter22".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(user.role, "user");
    assert!(store.read().is_some());

    let updated = session
        .update_profile(ProfileUpdate {
            photo_url: Some("https://cdn.pawhaven.test/leo.jpg".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.photo_url.as_deref(), Some("https://cdn.pawhaven.test/leo.jpg"));
    assert_eq!(session.user(), Some(updated));

    let token = store.read().unwrap();
    session.logout().await.unwrap();
    assert!(session.user().is_none());
    assert_eq!(store.read(), None);

    // the backend revoked the old token
    let response = reqwest::Client::new()
        .get(format!("{}/auth/me", app.address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_remembered_admin_session_restores() {
    let app = spawn_app().await;
    let store = TokenStore::in_memory();

    let (first, _) = session_for(&app.address, store.clone());
    first.init().await;
    first
        .login_remembered(ADMIN_EMAIL, ADMIN_PASSWORD, true)
        .await
        .unwrap();
    assert!(first.is_admin());
    first.dispose();

    let (second, _) = session_for(&app.address, store);
    let table = RouteTable::default();
    let admin_page = Location::new("/dashboard/admin");
    assert_eq!(table.evaluate(&admin_page, Some(&second)), GuardDecision::Loading);

    second.init().await;
    assert!(second.is_admin());
    assert_eq!(table.evaluate(&admin_page, Some(&second)), GuardDecision::Render);
}

#[tokio::test]
async fn test_forbidden_admin_call_ends_session() {
    let app = spawn_app().await;
    let (session, navigator) = session_for(&app.address, TokenStore::in_memory());
    session.init().await;
    session
        .register(RegisterRequest {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "hunter22".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let err = session
        .api()
        .get_json::<Value>("/admin/users")
        .await
        .unwrap_err();
    assert!(matches!(
        SessionError::from(err),
        SessionError::Unauthorized { status: 403 }
    ));

    assert!(session.user().is_none());
    assert!(!session.guard_state().session_present);
    assert_eq!(session.token_store().read(), None);

    let current = navigator.current();
    assert_eq!(current.path, "/login");
    assert_eq!(current.from.as_deref(), Some("/dashboard/admin"));
}

#[tokio::test]
async fn test_wrong_password_reports_backend_message() {
    let app = spawn_app().await;
    let (session, _) = session_for(&app.address, TokenStore::in_memory());
    session.init().await;

    let err = session.login(ADMIN_EMAIL, "nope-nope").await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid credentials");
    assert!(session.user().is_none());
}
