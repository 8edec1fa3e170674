//! Route Guards
//!
//! A guard turns the session's capability flags into one of three outcomes
//! for a requested page: wait, render, or redirect. The private guard needs
//! a session; the admin guard needs a session with the admin capability.

use crate::manager::{AuthSession, SessionState};
use crate::navigation::{Location, HOME_PATH, LOGIN_PATH};
use tracing::{debug, error};

/// Capability flags a guard decides on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardState {
    pub session_present: bool,
    pub session_loading: bool,
    pub admin_capability: bool,
    pub admin_loading: bool,
}

impl From<&SessionState> for GuardState {
    fn from(state: &SessionState) -> Self {
        // the admin capability is derived from the same user, so it settles
        // together with the session
        Self {
            session_present: state.is_authenticated(),
            session_loading: state.loading,
            admin_capability: state.is_admin(),
            admin_loading: state.loading,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show a loading placeholder; neither content nor redirect yet
    Loading,
    /// Show the wrapped page unchanged
    Render,
    /// Navigate elsewhere, remembering the requested location
    Redirect(Location),
    /// The guard has no session to consult; show this error instead
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGuard {
    /// Requires a signed-in user; falls back to `/login`
    Private,
    /// Requires a signed-in admin; falls back to `/`
    Admin,
}

impl RouteGuard {
    pub fn fallback_path(self) -> &'static str {
        match self {
            RouteGuard::Private => LOGIN_PATH,
            RouteGuard::Admin => HOME_PATH,
        }
    }

    fn is_loading(self, state: &GuardState) -> bool {
        match self {
            RouteGuard::Private => state.session_loading,
            RouteGuard::Admin => state.session_loading || state.admin_loading,
        }
    }

    fn is_satisfied(self, state: &GuardState) -> bool {
        match self {
            RouteGuard::Private => state.session_present,
            RouteGuard::Admin => state.session_present && state.admin_capability,
        }
    }

    pub fn decide(self, state: &GuardState, requested: &Location) -> GuardDecision {
        if self.is_loading(state) {
            return GuardDecision::Loading;
        }

        if self.is_satisfied(state) {
            return GuardDecision::Render;
        }

        debug!(guard = ?self, path = %requested.path, "Access denied, redirecting");
        GuardDecision::Redirect(Location::redirect(self.fallback_path(), requested))
    }

    /// Decide against a session, failing closed when there is none
    pub fn evaluate(self, session: Option<&AuthSession>, requested: &Location) -> GuardDecision {
        match session {
            Some(session) => self.decide(&session.guard_state(), requested),
            None => {
                error!(guard = ?self, path = %requested.path, "Route guard used without a session");
                GuardDecision::Unavailable(
                    "Route guard is not connected to a session".to_string(),
                )
            }
        }
    }
}

/// Access level of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    Private,
    Admin,
}

impl RouteAccess {
    pub fn guard(self) -> Option<RouteGuard> {
        match self {
            RouteAccess::Public => None,
            RouteAccess::Private => Some(RouteGuard::Private),
            RouteAccess::Admin => Some(RouteGuard::Admin),
        }
    }
}

/// Path-prefix to access-level mapping; the longest matching prefix wins
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<(String, RouteAccess)>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::empty()
            .with_route("/", RouteAccess::Public)
            .with_route("/login", RouteAccess::Public)
            .with_route("/register", RouteAccess::Public)
            .with_route("/pets", RouteAccess::Public)
            .with_route("/adopt", RouteAccess::Private)
            .with_route("/donate", RouteAccess::Private)
            .with_route("/dashboard", RouteAccess::Private)
            .with_route("/dashboard/admin", RouteAccess::Admin)
    }
}

impl RouteTable {
    pub fn empty() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn with_route(mut self, prefix: &str, access: RouteAccess) -> Self {
        let prefix = normalize(prefix).to_ascii_lowercase();
        self.routes.retain(|(existing, _)| *existing != prefix);
        self.routes.push((prefix, access));
        self
    }

    /// Access level for `path`; unmatched paths are public
    ///
    /// Matching ignores ASCII case, as the browser router does.
    pub fn access_for(&self, path: &str) -> RouteAccess {
        let path = normalize(path).to_ascii_lowercase();
        self.routes
            .iter()
            .filter(|(prefix, _)| matches_prefix(&path, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, access)| *access)
            .unwrap_or(RouteAccess::Public)
    }

    pub fn decide(&self, requested: &Location, state: &GuardState) -> GuardDecision {
        match self.access_for(&requested.path).guard() {
            Some(guard) => guard.decide(state, requested),
            None => GuardDecision::Render,
        }
    }

    /// Like [`RouteTable::decide`], reading the flags from a session
    pub fn evaluate(&self, requested: &Location, session: Option<&AuthSession>) -> GuardDecision {
        match self.access_for(&requested.path).guard() {
            Some(guard) => guard.evaluate(session, requested),
            None => GuardDecision::Render,
        }
    }
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        HOME_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    prefix == HOME_PATH
        || path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
