//! User accounts and password authentication

use crate::config::SeedAdmin;
use crate::jwt::AuthError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use pawhaven_core::{ProfileUpdate, RegisterRequest, User, ADMIN_ROLE, DEFAULT_ROLE};
use serde_json::{json, Map};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Stored account, including the password hash
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub photo_url: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    fn new(
        name: String,
        email: String,
        password: &str,
        role: &str,
        photo_url: Option<String>,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            role: role.to_string(),
            photo_url,
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }

    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case(ADMIN_ROLE)
    }

    /// Public record as sent over the wire
    pub fn to_user(&self) -> User {
        let mut extra = Map::new();
        extra.insert("createdAt".to_string(), json!(self.created_at));

        User {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            photo_url: self.photo_url.clone(),
            extra,
        }
    }
}

#[derive(Default)]
struct Accounts {
    by_id: HashMap<String, UserRecord>,
    /// lowercased email -> user id
    by_email: HashMap<String, String>,
}

/// In-memory account store
#[derive(Clone, Default)]
pub struct UserStore {
    accounts: Arc<RwLock<Accounts>>,
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore").finish_non_exhaustive()
    }
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the configured admin account if its email is still free
    pub async fn seed_admin(&self, seed: &SeedAdmin) -> Result<(), AuthError> {
        let record = UserRecord::new(
            seed.name.clone(),
            seed.email.clone(),
            &seed.password,
            ADMIN_ROLE,
            None,
        )?;

        match self.insert(record).await {
            Ok(admin) => {
                info!("Seeded admin account: {}", admin.email);
                Ok(())
            }
            Err(AuthError::EmailTaken) => {
                debug!("Admin account already present: {}", seed.email);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Validate and create a regular account
    pub async fn register(&self, request: RegisterRequest) -> Result<UserRecord, AuthError> {
        let name = request.name.trim().to_string();
        let email = request.email.trim().to_string();

        if name.is_empty() {
            return Err(AuthError::Validation("Name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(AuthError::Validation("A valid email is required".to_string()));
        }
        if request.password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let photo_url = request.photo_url.filter(|url| !url.trim().is_empty());
        let record = UserRecord::new(name, email, &request.password, DEFAULT_ROLE, photo_url)?;
        let record = self.insert(record).await?;

        info!("Registered new user: {}", record.email);
        Ok(record)
    }

    async fn insert(&self, record: UserRecord) -> Result<UserRecord, AuthError> {
        let key = record.email.to_lowercase();
        let mut accounts = self.accounts.write().await;

        if accounts.by_email.contains_key(&key) {
            debug!("Registration failed: email '{}' already exists", record.email);
            return Err(AuthError::EmailTaken);
        }

        accounts.by_email.insert(key, record.id.clone());
        accounts.by_id.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        let accounts = self.accounts.read().await;

        let record = accounts
            .by_email
            .get(&email.trim().to_lowercase())
            .and_then(|id| accounts.by_id.get(id))
            .ok_or(AuthError::InvalidCredentials)?;

        if !record.verify_password(password) {
            warn!("Invalid password for user: {}", record.email);
            return Err(AuthError::InvalidCredentials);
        }

        debug!("User authenticated: {}", record.email);
        Ok(record.clone())
    }

    pub async fn get(&self, user_id: &str) -> Option<UserRecord> {
        self.accounts.read().await.by_id.get(user_id).cloned()
    }

    /// Apply the editable fields of `update`; role and email are not editable
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<UserRecord, AuthError> {
        let mut accounts = self.accounts.write().await;
        let record = accounts
            .by_id
            .get_mut(user_id)
            .ok_or(AuthError::InvalidToken)?;

        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AuthError::Validation("Name cannot be empty".to_string()));
            }
            record.name = name;
        }
        if let Some(photo_url) = update.photo_url {
            record.photo_url = Some(photo_url).filter(|url| !url.trim().is_empty());
        }
        if !update.extra.is_empty() {
            debug!(fields = ?update.extra.keys().collect::<Vec<_>>(), "Ignoring non-editable profile fields");
        }

        Ok(record.clone())
    }

    pub async fn list(&self) -> Vec<UserRecord> {
        let mut records: Vec<_> = self.accounts.read().await.by_id.values().cloned().collect();
        records.sort_by_key(|record| record.created_at);
        records
    }
}

/// Hash password using Argon2
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}
