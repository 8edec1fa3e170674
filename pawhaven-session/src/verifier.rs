//! Session Verifier
//!
//! Runs once at start-up and decides whether a persisted token turns into a
//! signed-in user. Every failure ends in "signed out"; nothing is surfaced
//! to the caller beyond the absent user.

use crate::http::PublicClient;
use crate::storage::TokenStore;
use pawhaven_core::{EnvelopeOutcome, User};
use tracing::{debug, info, warn};

/// Placeholder image hosts that no longer serve images
pub const DEAD_PLACEHOLDER_HOSTS: &[&str] = &["via.placeholder.com"];

/// Replacement avatar for records pointing at a dead placeholder host
pub const FALLBACK_PHOTO_URL: &str = "https://placehold.co/150x150?text=User";

/// Swap a photo URL on a dead placeholder host for [`FALLBACK_PHOTO_URL`]
///
/// Returns whether the record was changed.
pub fn repair_photo_url(user: &mut User) -> bool {
    let dead = user
        .photo_url
        .as_deref()
        .and_then(|photo| url::Url::parse(photo).ok())
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| DEAD_PLACEHOLDER_HOSTS.contains(&host.as_str()));

    if dead {
        user.photo_url = Some(FALLBACK_PHOTO_URL.to_string());
    }
    dead
}

#[derive(Debug, Clone)]
pub struct SessionVerifier {
    token_store: TokenStore,
    client: PublicClient,
}

impl SessionVerifier {
    pub fn new(token_store: TokenStore, client: PublicClient) -> Self {
        Self {
            token_store,
            client,
        }
    }

    /// Resolve the persisted state into a user, or `None` for signed out
    ///
    /// Issues at most one request, and none at all unless the remember flag
    /// is set and a token is present.
    pub async fn verify(&self) -> Option<User> {
        if !self.token_store.read_remember_flag() {
            if self.token_store.read().is_some() {
                debug!("Remember flag not set; discarding stored token");
                self.discard_token();
            }
            return None;
        }

        let token = match self.token_store.read() {
            Some(token) => token,
            None => {
                debug!("No stored token; starting signed out");
                return None;
            }
        };

        match self.client.me(&token).await {
            Ok(envelope) => match envelope.into_user() {
                EnvelopeOutcome::Accepted(mut user) => {
                    if repair_photo_url(&mut user) {
                        debug!(user_id = %user.id, "Replaced dead placeholder photo URL");
                    }
                    info!(user_id = %user.id, "Session restored");
                    Some(user)
                }
                EnvelopeOutcome::Rejected(message) => {
                    warn!(?message, "Backend refused stored token");
                    self.discard_token();
                    None
                }
                EnvelopeOutcome::Malformed(field) => {
                    warn!(field, "Session check response missing required field");
                    self.discard_token();
                    None
                }
            },
            Err(e) => {
                e.log();
                debug!("Session verification failed; starting signed out");
                self.discard_token();
                None
            }
        }
    }

    fn discard_token(&self) {
        if let Err(e) = self.token_store.clear() {
            warn!(error = %e, "Failed to clear stored token");
        }
    }
}
