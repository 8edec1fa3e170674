//! `/auth` endpoint handlers
//!
//! Every answer uses the same envelope: `{ success, token?, user?, message? }`.

use crate::extract::{AdminUser, AuthUser, OptionalAuthUser};
use crate::jwt::AuthError;
use crate::state::AppState;
use crate::users::UserRecord;
use axum::{extract::State, http::StatusCode, response::Json};
use pawhaven_core::{AuthEnvelope, LoginRequest, ProfileUpdate, RegisterRequest};
use serde_json::{json, Value};
use tracing::info;

fn issue_session(state: &AppState, record: &UserRecord) -> Result<AuthEnvelope, AuthError> {
    let (token, _) = state.jwt.issue(&record.id, &record.role)?;
    Ok(AuthEnvelope::accepted(Some(token), record.to_user()))
}

/// Create an account and sign it in
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthEnvelope>), AuthError> {
    info!("User registration attempt: {}", request.email);

    let record = state.users.register(request).await?;
    let envelope = issue_session(&state, &record)?;

    Ok((StatusCode::CREATED, Json(envelope)))
}

/// Exchange email and password for a token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthEnvelope>, AuthError> {
    info!("User login attempt: {}", request.email);

    let record = state
        .users
        .authenticate(&request.email, &request.password)
        .await?;

    info!("User logged in successfully: {}", record.email);
    Ok(Json(issue_session(&state, &record)?))
}

/// Current user for the presented token
pub async fn me(user: AuthUser) -> Json<AuthEnvelope> {
    Json(AuthEnvelope::accepted(None, user.record.to_user()))
}

/// Revoke the presented token, if any; always succeeds
pub async fn logout(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
) -> Json<AuthEnvelope> {
    if let Some(user) = user {
        state.revoke(&user.claims).await;
        info!("User logout: {}", user.record.id);
    }

    Json(AuthEnvelope {
        success: true,
        message: Some("Logged out successfully".to_string()),
        ..Default::default()
    })
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<AuthEnvelope>, AuthError> {
    let record = state.users.update_profile(&user.record.id, update).await?;

    info!("Profile updated: {}", record.id);
    Ok(Json(AuthEnvelope::accepted(None, record.to_user())))
}

/// Admin-only account listing
pub async fn list_users(State(state): State<AppState>, AdminUser(admin): AdminUser) -> Json<Value> {
    let users: Vec<_> = state
        .users
        .list()
        .await
        .iter()
        .map(UserRecord::to_user)
        .collect();

    info!(admin = %admin.record.id, count = users.len(), "Listed users");
    Json(json!({ "success": true, "users": users }))
}

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
