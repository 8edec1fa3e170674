//! Request extractors for authenticated routes

use crate::jwt::{bearer_token, AuthError, Claims};
use crate::state::AppState;
use crate::users::UserRecord;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

/// The account behind a valid, unrevoked bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub record: UserRecord,
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;
        let token = bearer_token(header).ok_or(AuthError::InvalidToken)?;

        let claims = app_state.jwt.verify(token)?;
        if app_state.is_revoked(&claims.jti).await {
            debug!(jti = %claims.jti, "Rejected revoked token");
            return Err(AuthError::InvalidToken);
        }

        // the account may have been removed since the token was issued
        let record = app_state
            .users
            .get(&claims.sub)
            .await
            .ok_or(AuthError::InvalidToken)?;

        Ok(Self { record, claims })
    }
}

/// An [`AuthUser`] whose stored role is admin
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.record.is_admin() {
            debug!(user_id = %user.record.id, "Admin route refused");
            return Err(AuthError::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Optional user extractor - doesn't fail if the request is anonymous
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(AuthUser::from_request_parts(parts, state).await.ok()))
    }
}
