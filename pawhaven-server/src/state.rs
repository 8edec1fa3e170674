//! Shared application state

use crate::config::ServerConfig;
use crate::jwt::{AuthError, Claims, JwtService};
use crate::users::UserStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub users: UserStore,
    pub jwt: JwtService,
    /// Tokens ended by logout, by ID, with their expiry timestamp
    revoked: Arc<RwLock<HashMap<String, i64>>>,
}

impl AppState {
    /// Build state and seed the configured admin account
    pub async fn new(config: ServerConfig) -> Result<Self, AuthError> {
        let users = UserStore::new();
        if let Some(seed) = &config.seed_admin {
            users.seed_admin(seed).await?;
        }

        let jwt = JwtService::new(&config.jwt_secret, config.token_ttl_minutes);
        info!(ttl_minutes = config.token_ttl_minutes, "Application state ready");

        Ok(Self {
            config,
            users,
            jwt,
            revoked: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Reject the token from now on
    ///
    /// Entries whose token has expired anyway are dropped on the way.
    pub async fn revoke(&self, claims: &Claims) {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, exp| *exp > now);
        if revoked.len() < before {
            debug!(pruned = before - revoked.len(), "Dropped expired revocations");
        }
        revoked.insert(claims.jti.clone(), claims.exp);
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.read().await.contains_key(jti)
    }
}
