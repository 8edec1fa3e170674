//! Pawhaven Session - client-side authentication and route authorization
//!
//! This crate owns everything between the user interface and the `/auth`
//! backend API:
//!
//! - **Token Store** ([`storage`]): the persisted bearer credential and the
//!   "remember me" flag
//! - **Session Verifier** ([`verifier`]): restores a session once at start-up
//! - **Auth Session Manager** ([`manager`]): login, registration, logout and
//!   profile updates over a single authenticated-user value
//! - **Role Resolver** ([`role`]): the derived admin capability
//! - **Route Guards** ([`guard`]): render / redirect / wait decisions per route
//! - **HTTP Client Bindings** ([`http`]): the public and the authenticated
//!   request clients
//!
//! ## Architecture
//!
//! The HTTP layer never touches session state directly. When the
//! authenticated client sees a 401 or 403 it raises
//! [`SessionEvent::Invalidated`], clears the token and forces a navigation
//! to `/login`. The [`AuthSession`] handles the event synchronously and
//! drops its user before the token is gone.

pub mod events;
pub mod guard;
pub mod http;
pub mod manager;
pub mod navigation;
pub mod role;
pub mod storage;
pub mod verifier;

pub use events::{SessionEvent, SessionEvents};
pub use guard::{GuardDecision, GuardState, RouteAccess, RouteGuard, RouteTable};
pub use http::{ApiClientConfig, AuthedClient, PublicClient};
pub use manager::{AuthSession, SessionState};
pub use navigation::{post_login_destination, Location, MemoryNavigator, Navigator};
pub use role::is_admin;
pub use storage::{FileStore, KeyValueStore, MemoryStore, TokenStore};
pub use verifier::{repair_photo_url, SessionVerifier};

use pawhaven_core::PawhavenError;

/// Generic text shown when no response was received at all
pub const NETWORK_FAILURE_MESSAGE: &str =
    "Unable to reach the server. Please check your connection and try again.";

/// Tagged failure returned by every session operation
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No response was received
    #[error("Network error: {message}")]
    Network { message: String },

    /// The backend reported a failure (`success: false` or a non-2xx status)
    #[error("{message}")]
    Rejected { status: Option<u16>, message: String },

    /// The authenticated client received 401 or 403; the session is gone
    #[error("Session rejected by server (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The backend answered with a body missing required fields
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    /// The operation needs a stored token and there is none
    #[error("Not signed in")]
    NotSignedIn,

    /// The session was disposed before or while the operation ran
    #[error("Session has been disposed")]
    Disposed,

    #[error("Core error: {0}")]
    Core(PawhavenError),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    /// Create a rejection error from a backend message
    pub fn rejected<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Text suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Network { .. } => NETWORK_FAILURE_MESSAGE.to_string(),
            SessionError::Rejected { message, .. } => message.clone(),
            SessionError::Unauthorized { .. } => {
                "Your session has expired. Please log in again.".to_string()
            }
            SessionError::MalformedResponse { .. } => {
                "The server sent an unexpected response. Please try again later.".to_string()
            }
            SessionError::Storage { .. } => {
                "Could not save your session on this device.".to_string()
            }
            SessionError::NotSignedIn => "Please log in first.".to_string(),
            SessionError::Disposed | SessionError::Core(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

impl From<PawhavenError> for SessionError {
    fn from(error: PawhavenError) -> Self {
        match error {
            PawhavenError::Network { message, .. } => SessionError::Network { message },
            PawhavenError::Authorization { status, .. } => SessionError::Unauthorized { status },
            PawhavenError::Backend {
                status, message, ..
            } => SessionError::Rejected { status, message },
            PawhavenError::MalformedResponse { message, .. } => {
                SessionError::MalformedResponse { message }
            }
            PawhavenError::Storage { message, .. } => SessionError::Storage { message },
            other => SessionError::Core(other),
        }
    }
}
