//! Auth Session Manager
//!
//! Owns the single authenticated-user value. State changes are published on
//! a `watch` channel so guards and views recompute on every change.
//!
//! Lifecycle: [`AuthSession::init`] runs the verifier once;
//! [`AuthSession::dispose`] marks the session dead. Operations that complete
//! after `dispose` leave state untouched.
//!
//! A [`SessionEvent::Invalidated`] from the authenticated client clears the
//! user synchronously, before the client has cleared the token, so a visible
//! user always has a readable token.

use crate::events::{SessionEvent, SessionEvents};
use crate::guard::GuardState;
use crate::http::{ApiClientConfig, AuthedClient, PublicClient};
use crate::navigation::Navigator;
use crate::role;
use crate::storage::TokenStore;
use crate::verifier::SessionVerifier;
use crate::{SessionError, SessionResult};
use pawhaven_core::{
    log_operation_error, log_operation_start, log_operation_success, EnvelopeOutcome,
    IssuedSession, LoginRequest, PawhavenResult, ProfileUpdate, RegisterRequest, User,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Observable session state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Present iff a valid session exists
    pub user: Option<User>,
    /// True until start-up verification has settled
    pub loading: bool,
    /// Advisory: at least one operation is in flight
    pub busy: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
            busy: false,
        }
    }
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Derived from the current user on every call
    pub fn is_admin(&self) -> bool {
        role::is_admin(self.user.as_ref())
    }

    pub fn guard_state(&self) -> GuardState {
        GuardState::from(self)
    }
}

struct Inner {
    token_store: TokenStore,
    public: PublicClient,
    authed: AuthedClient,
    events: SessionEvents,
    state: watch::Sender<SessionState>,
    in_flight: AtomicUsize,
    alive: AtomicBool,
    initialized: AtomicBool,
}

impl Inner {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn set_user(&self, user: Option<User>) {
        self.state.send_modify(|state| state.user = user);
    }

    fn on_event(&self, event: &SessionEvent) {
        if let SessionEvent::Invalidated { status, path } = event {
            if !self.is_alive() {
                return;
            }
            info!(status, path = %path, "Session invalidated by server");
            self.set_user(None);
        }
    }
}

/// Marks the session busy for as long as it lives
struct BusyGuard<'a> {
    inner: &'a Inner,
}

impl<'a> BusyGuard<'a> {
    fn enter(inner: &'a Inner) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        inner.state.send_modify(|state| state.busy = true);
        Self { inner }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let remaining = self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            self.inner.state.send_modify(|state| state.busy = false);
        }
    }
}

/// The explicit session store handed to guards, views and API callers
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// Build both request clients from one configuration
    pub fn new(
        config: ApiClientConfig,
        token_store: TokenStore,
        navigator: Arc<dyn Navigator>,
    ) -> PawhavenResult<Self> {
        let events = SessionEvents::default();
        let public = PublicClient::new(config.clone())?;
        let authed = AuthedClient::new(config, token_store.clone(), events.clone(), navigator)?;
        Ok(Self::from_parts(token_store, public, authed, events))
    }

    /// Assemble from existing parts; `authed` must publish on `events`
    pub fn from_parts(
        token_store: TokenStore,
        public: PublicClient,
        authed: AuthedClient,
        events: SessionEvents,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let inner = Arc::new(Inner {
            token_store,
            public,
            authed,
            events,
            state,
            in_flight: AtomicUsize::new(0),
            alive: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
        });

        // `inner` owns the hub, so the handler holds it weakly
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        inner.events.on_event(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_event(event);
            }
        });

        Self { inner }
    }

    /// Restore the session from storage
    ///
    /// Only the first call does anything.
    pub async fn init(&self) {
        if !self.inner.is_alive() || self.inner.initialized.swap(true, Ordering::SeqCst) {
            debug!("Session already initialized or disposed");
            return;
        }

        log_operation_start!("verify_session");
        let verifier =
            SessionVerifier::new(self.inner.token_store.clone(), self.inner.public.clone());
        let user = verifier.verify().await;

        if !self.inner.is_alive() {
            debug!("Session disposed during verification; dropping result");
            return;
        }

        let signed_in = user.is_some();
        self.inner.state.send_modify(|state| {
            state.user = user;
            state.loading = false;
        });
        log_operation_success!("verify_session", signed_in);
    }

    /// Stop reacting to events and ignore late completions
    pub fn dispose(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
        debug!("Session disposed");
    }

    pub fn is_disposed(&self) -> bool {
        !self.inner.is_alive()
    }

    fn ensure_alive(&self) -> SessionResult<()> {
        if self.inner.is_alive() {
            Ok(())
        } else {
            Err(SessionError::Disposed)
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    pub fn is_admin(&self) -> bool {
        self.inner.state.borrow().is_admin()
    }

    pub fn guard_state(&self) -> GuardState {
        self.inner.state.borrow().guard_state()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn events(&self) -> &SessionEvents {
        &self.inner.events
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.inner.token_store
    }

    /// Client for any other authenticated API call
    pub fn api(&self) -> &AuthedClient {
        &self.inner.authed
    }

    /// Persist or withdraw the "remember me" opt-in
    pub fn set_remember(&self, remember: bool) -> SessionResult<()> {
        self.inner
            .token_store
            .save_remember_flag(remember)
            .map_err(SessionError::from)
    }

    /// Sign in with email and password
    ///
    /// Does not touch the remember flag; see [`AuthSession::set_remember`]
    /// and [`AuthSession::login_remembered`]. A failed login leaves any
    /// existing session as it was.
    pub async fn login(&self, email: &str, password: &str) -> SessionResult<User> {
        self.ensure_alive()?;
        let _busy = BusyGuard::enter(&self.inner);
        log_operation_start!("login", email = %email);

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let result: SessionResult<User> = async {
            let envelope = self.inner.public.login(&request).await?;
            let issued = accept_session(envelope.into_session())?;
            self.adopt(issued)
        }
        .await;

        self.finish("login", result)
    }

    /// Write the remember flag first, then sign in
    ///
    /// If the login fails the previous flag value is put back.
    pub async fn login_remembered(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> SessionResult<User> {
        self.ensure_alive()?;
        let previous = self.inner.token_store.read_remember_flag();
        self.set_remember(remember)?;

        let result = self.login(email, password).await;
        if result.is_err() && self.inner.is_alive() {
            if let Err(e) = self.inner.token_store.save_remember_flag(previous) {
                warn!(error = %e, "Failed to restore remember flag");
            }
        }
        result
    }

    /// Create an account and sign in as it
    pub async fn register(&self, profile: RegisterRequest) -> SessionResult<User> {
        self.ensure_alive()?;
        let _busy = BusyGuard::enter(&self.inner);
        log_operation_start!("register", email = %profile.email);

        let result: SessionResult<User> = async {
            let envelope = self.inner.public.register(&profile).await?;
            let issued = accept_session(envelope.into_session())?;
            self.adopt(issued)
        }
        .await;

        self.finish("register", result)
    }

    /// Sign out locally, telling the backend on a best-effort basis
    ///
    /// Local cleanup always happens, whether or not the notification
    /// succeeded. Calling this while signed out is harmless.
    pub async fn logout(&self) -> SessionResult<()> {
        self.ensure_alive()?;
        let _busy = BusyGuard::enter(&self.inner);
        log_operation_start!("logout");

        let token = self.inner.token_store.read();
        if let Err(e) = self.inner.public.logout(token.as_deref()).await {
            e.log();
            debug!("Logout notification failed; clearing local session anyway");
        }

        if !self.inner.is_alive() {
            return Err(SessionError::Disposed);
        }

        let cleared_token = self.inner.token_store.clear();
        let cleared_flag = self.inner.token_store.clear_remember_flag();
        self.inner.set_user(None);
        self.inner.events.publish(SessionEvent::SignedOut);

        cleared_token.and(cleared_flag).map_err(|e| {
            log_operation_error!("logout", e);
            SessionError::from(e)
        })?;

        log_operation_success!("logout");
        Ok(())
    }

    /// Update profile fields; the returned record replaces the current user
    pub async fn update_profile(&self, update: ProfileUpdate) -> SessionResult<User> {
        self.ensure_alive()?;
        if self.inner.token_store.read().is_none() {
            return Err(SessionError::NotSignedIn);
        }
        let _busy = BusyGuard::enter(&self.inner);
        log_operation_start!("update_profile");

        let result: SessionResult<User> = async {
            let envelope = self.inner.authed.update_profile(&update).await?;
            let user = match envelope.into_user() {
                EnvelopeOutcome::Accepted(user) => user,
                EnvelopeOutcome::Rejected(message) => {
                    return Err(SessionError::rejected(
                        None,
                        message.unwrap_or_else(|| "Profile update failed".to_string()),
                    ))
                }
                EnvelopeOutcome::Malformed(field) => {
                    return Err(SessionError::MalformedResponse {
                        message: format!("profile response is missing `{}`", field),
                    })
                }
            };

            if !self.inner.is_alive() {
                return Err(SessionError::Disposed);
            }
            self.inner.set_user(Some(user.clone()));
            self.inner.events.publish(SessionEvent::ProfileUpdated {
                user_id: user.id.clone(),
            });
            Ok(user)
        }
        .await;

        self.finish("update_profile", result)
    }

    /// Store the token, then publish the user
    ///
    /// The order matters: anyone who sees a user can read a token.
    fn adopt(&self, issued: IssuedSession) -> SessionResult<User> {
        if !self.inner.is_alive() {
            return Err(SessionError::Disposed);
        }

        self.inner.token_store.save(&issued.token)?;
        self.inner.set_user(Some(issued.user.clone()));
        self.inner.events.publish(SessionEvent::SignedIn {
            user_id: issued.user.id.clone(),
        });
        Ok(issued.user)
    }

    fn finish<T>(&self, operation: &str, result: SessionResult<T>) -> SessionResult<T> {
        match &result {
            Ok(_) => {
                log_operation_success!(operation);
            }
            Err(e) => {
                log_operation_error!(operation, e);
            }
        }
        result
    }
}

fn accept_session(outcome: EnvelopeOutcome<IssuedSession>) -> SessionResult<IssuedSession> {
    match outcome {
        EnvelopeOutcome::Accepted(issued) => Ok(issued),
        EnvelopeOutcome::Rejected(message) => Err(SessionError::rejected(
            None,
            message.unwrap_or_else(|| "Authentication failed".to_string()),
        )),
        EnvelopeOutcome::Malformed(field) => Err(SessionError::MalformedResponse {
            message: format!("auth response is missing `{}`", field),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::MemoryNavigator;

    fn offline_session() -> AuthSession {
        AuthSession::new(
            ApiClientConfig::new("http://127.0.0.1:9").with_timeout(2),
            TokenStore::in_memory(),
            Arc::new(MemoryNavigator::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_initial_state_is_loading_and_signed_out() {
        let session = offline_session();
        let state = session.state();
        assert!(state.loading);
        assert!(!state.busy);
        assert!(!state.is_authenticated());
        assert!(!state.is_admin());
    }

    #[test]
    fn test_admin_capability_follows_user() {
        let mut state = SessionState::default();
        state.user = Some(User::new("u1", "Mia", "mia@example.com").with_role("Admin"));
        assert!(state.is_admin());

        state.user = Some(User::new("u1", "Mia", "mia@example.com"));
        assert!(!state.is_admin());
    }

    #[tokio::test]
    async fn test_init_runs_once_and_settles() {
        let session = offline_session();
        session.init().await;
        assert!(!session.state().loading);

        // A second init must not re-run verification or reset state
        session.inner.set_user(Some(User::new("u1", "Mia", "mia@example.com")));
        session.init().await;
        assert!(session.user().is_some());
    }

    #[tokio::test]
    async fn test_operations_after_dispose_are_refused() {
        let session = offline_session();
        session.init().await;
        session.dispose();

        assert!(session.is_disposed());
        assert!(matches!(
            session.login("a@b.c", "secret").await,
            Err(SessionError::Disposed)
        ));
        assert!(matches!(session.logout().await, Err(SessionError::Disposed)));
    }

    #[tokio::test]
    async fn test_update_profile_without_token() {
        let session = offline_session();
        assert!(matches!(
            session.update_profile(ProfileUpdate::default()).await,
            Err(SessionError::NotSignedIn)
        ));
    }

    #[test]
    fn test_subscribers_wake_on_user_change() {
        let session = offline_session();
        let mut receiver = session.subscribe();

        let mut changed = tokio_test::task::spawn(receiver.changed());
        tokio_test::assert_pending!(changed.poll());

        session
            .inner
            .set_user(Some(User::new("u1", "Mia", "mia@example.com")));
        assert!(changed.is_woken());
        tokio_test::assert_ready_ok!(changed.poll());
    }

    #[test]
    fn test_invalidation_clears_user_synchronously_until_disposed() {
        let session = offline_session();
        let user = User::new("u1", "Mia", "mia@example.com");
        let invalidated = SessionEvent::Invalidated {
            status: 401,
            path: "/auth/me".to_string(),
        };

        session.inner.set_user(Some(user.clone()));
        session.events().notify(&invalidated);
        assert!(session.user().is_none());

        session.inner.set_user(Some(user.clone()));
        session.dispose();
        session.events().publish(invalidated);
        assert_eq!(session.user(), Some(user));
    }

    #[test]
    fn test_busy_guard_counts_nested_operations() {
        let session = offline_session();
        let first = BusyGuard::enter(&session.inner);
        let second = BusyGuard::enter(&session.inner);
        assert!(session.state().busy);

        drop(first);
        assert!(session.state().busy);
        drop(second);
        assert!(!session.state().busy);
    }

    #[tokio::test]
    async fn test_network_failure_leaves_existing_session() {
        let session = offline_session();
        let existing = User::new("u1", "Mia", "mia@example.com");
        session.inner.token_store.save("existing-token").unwrap();
        session.inner.set_user(Some(existing.clone()));

        let err = session.login("mia@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, SessionError::Network { .. }));
        assert_eq!(session.user(), Some(existing));
        assert_eq!(
            session.token_store().read().as_deref(),
            Some("existing-token")
        );
        assert!(!session.state().busy);
    }
}
