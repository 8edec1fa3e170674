//! Core data type definitions
//!
//! The authenticated user record and the JSON envelopes of the `/auth` API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role value that grants the admin capability (compared case-insensitively)
pub const ADMIN_ROLE: &str = "admin";

/// Role assigned when the backend omits one
pub const DEFAULT_ROLE: &str = "user";

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

/// Authenticated user record as returned by the backend
///
/// Unknown fields are kept in `extra` so that a record survives a
/// serialize/deserialize cycle unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(
        rename = "photoURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: default_role(),
            photo_url: None,
            extra: Map::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_photo_url(mut self, photo_url: impl Into<String>) -> Self {
        self.photo_url = Some(photo_url.into());
        self
    }

    /// Get user display string
    pub fn display_string(&self) -> String {
        if self.name.is_empty() {
            format!("{} ({})", self.email, self.role)
        } else {
            format!("{} <{}> ({})", self.name, self.email, self.role)
        }
    }
}

/// `POST /auth/login` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /auth/register` body
///
/// Any additional profile fields travel in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(
        rename = "photoURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `PUT /auth/profile` body; absent fields are left untouched by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "photoURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.photo_url.is_none() && self.extra.is_empty()
    }
}

/// Response envelope shared by every `/auth` endpoint
///
/// Which optional fields are required depends on the endpoint; see
/// [`AuthEnvelope::into_session`] and [`AuthEnvelope::into_user`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A token plus the user it identifies, produced by login and registration
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedSession {
    pub token: String,
    pub user: User,
}

/// Outcome of reading an envelope whose HTTP status was 2xx
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeOutcome<T> {
    /// `success: true` with every required field present
    Accepted(T),
    /// `success: false`, carrying the backend message if any
    Rejected(Option<String>),
    /// `success: true` but a required field is missing
    Malformed(&'static str),
}

impl AuthEnvelope {
    pub fn accepted(token: Option<String>, user: User) -> Self {
        Self {
            success: true,
            token,
            user: Some(user),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            token: None,
            user: None,
            message: Some(message.into()),
        }
    }

    /// Interpret as a login/registration answer: needs both token and user
    pub fn into_session(self) -> EnvelopeOutcome<IssuedSession> {
        if !self.success {
            return EnvelopeOutcome::Rejected(self.message);
        }
        match (self.token, self.user) {
            (Some(token), Some(user)) if !token.is_empty() => {
                EnvelopeOutcome::Accepted(IssuedSession { token, user })
            }
            (None, _) | (Some(_), Some(_)) => EnvelopeOutcome::Malformed("token"),
            (Some(_), None) => EnvelopeOutcome::Malformed("user"),
        }
    }

    /// Interpret as a "who am I" or profile answer: needs the user
    pub fn into_user(self) -> EnvelopeOutcome<User> {
        if !self.success {
            return EnvelopeOutcome::Rejected(self.message);
        }
        match self.user {
            Some(user) => EnvelopeOutcome::Accepted(user),
            None => EnvelopeOutcome::Malformed("user"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_wire_names() {
        let user: User = serde_json::from_value(json!({
            "_id": "u1",
            "name": "Mia",
            "email": "mia@example.com",
            "role": "Admin",
            "photoURL": "https://img.example.com/mia.png",
            "phone": "555-0100"
        }))
        .unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(user.role, "Admin");
        assert_eq!(user.photo_url.as_deref(), Some("https://img.example.com/mia.png"));
        assert_eq!(user.extra.get("phone"), Some(&json!("555-0100")));

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["photoURL"], "https://img.example.com/mia.png");
        assert_eq!(back["phone"], "555-0100");
    }

    #[test]
    fn test_user_role_defaults_to_user() {
        let user: User =
            serde_json::from_value(json!({ "id": "u2", "email": "a@b.c" })).unwrap();
        assert_eq!(user.role, DEFAULT_ROLE);
        assert!(user.name.is_empty());
    }

    #[test]
    fn test_user_without_email_is_rejected() {
        let parsed = serde_json::from_value::<User>(json!({ "id": "u3" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_into_session_requires_token_and_user() {
        let user = User::new("u1", "Mia", "mia@example.com");

        let ok = AuthEnvelope::accepted(Some("tok".into()), user.clone()).into_session();
        assert_eq!(
            ok,
            EnvelopeOutcome::Accepted(IssuedSession {
                token: "tok".into(),
                user: user.clone()
            })
        );

        let no_token = AuthEnvelope::accepted(None, user).into_session();
        assert_eq!(no_token, EnvelopeOutcome::Malformed("token"));

        let no_user = AuthEnvelope {
            success: true,
            token: Some("tok".into()),
            ..Default::default()
        }
        .into_session();
        assert_eq!(no_user, EnvelopeOutcome::Malformed("user"));

        let rejected = AuthEnvelope::rejected("Invalid credentials").into_session();
        assert_eq!(
            rejected,
            EnvelopeOutcome::Rejected(Some("Invalid credentials".into()))
        );
    }

    #[test]
    fn test_profile_update_skips_absent_fields() {
        let update = ProfileUpdate {
            name: Some("New Name".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "name": "New Name" }));
        assert!(ProfileUpdate::default().is_empty());
    }
}
