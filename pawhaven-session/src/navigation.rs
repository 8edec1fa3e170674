//! Client-side navigation
//!
//! A redirect produced by a guard or by the authenticated client carries the
//! originally requested path in `from`, so the login page can send the user
//! back once they are signed in.

use std::sync::Mutex;

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub from: Option<String>,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            from: None,
        }
    }

    /// A location at `to` remembering where the user was headed
    pub fn redirect(to: impl Into<String>, requested: &Location) -> Self {
        Self {
            path: to.into(),
            from: Some(requested.path.clone()),
        }
    }

    /// Render as `path` or `path?from=<encoded>`
    pub fn to_href(&self) -> String {
        match &self.from {
            Some(from) => format!("{}?from={}", self.path, urlencoding::encode(from)),
            None => self.path.clone(),
        }
    }

    /// Inverse of [`Location::to_href`]; other query parameters are dropped
    pub fn parse(href: &str) -> Self {
        let (path, query) = match href.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (href, None),
        };

        let from = query.and_then(|query| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "from")
                .and_then(|(_, value)| urlencoding::decode(value).ok())
                .map(|value| value.into_owned())
        });

        Self {
            path: if path.is_empty() { HOME_PATH } else { path }.to_string(),
            from,
        }
    }
}

/// Where to go after a successful login from `location`
pub fn post_login_destination(location: &Location) -> String {
    location
        .from
        .as_deref()
        .filter(|from| from.starts_with('/') && !from.starts_with("//") && *from != LOGIN_PATH)
        .unwrap_or(HOME_PATH)
        .to_string()
}

/// Navigation surface the session layer is allowed to drive
pub trait Navigator: Send + Sync {
    fn current(&self) -> Location;
    fn navigate(&self, to: Location);
    /// Navigate without keeping the current entry in history
    fn replace(&self, to: Location);
}

/// History kept in memory
#[derive(Debug)]
pub struct MemoryNavigator {
    history: Mutex<Vec<Location>>,
}

impl MemoryNavigator {
    pub fn new(start: Location) -> Self {
        Self {
            history: Mutex::new(vec![start]),
        }
    }

    pub fn history(&self) -> Vec<Location> {
        self.entries().clone()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Vec<Location>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new(Location::new(HOME_PATH))
    }
}

impl Navigator for MemoryNavigator {
    fn current(&self) -> Location {
        self.entries()
            .last()
            .cloned()
            .unwrap_or_else(|| Location::new(HOME_PATH))
    }

    fn navigate(&self, to: Location) {
        self.entries().push(to);
    }

    fn replace(&self, to: Location) {
        let mut entries = self.entries();
        entries.pop();
        entries.push(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_href_round_trip_with_nested_path() {
        let requested = Location::new("/dashboard/my-pets?page=2");
        let login = Location::redirect(LOGIN_PATH, &requested);

        let href = login.to_href();
        assert_eq!(href, "/login?from=%2Fdashboard%2Fmy-pets%3Fpage%3D2");
        assert_eq!(Location::parse(&href), login);
    }

    #[test]
    fn test_post_login_destination() {
        assert_eq!(post_login_destination(&Location::new(LOGIN_PATH)), "/");

        let from_dashboard = Location::redirect(LOGIN_PATH, &Location::new("/dashboard"));
        assert_eq!(post_login_destination(&from_dashboard), "/dashboard");

        let offsite = Location {
            path: LOGIN_PATH.to_string(),
            from: Some("https://evil.example".to_string()),
        };
        assert_eq!(post_login_destination(&offsite), "/");

        let protocol_relative = Location {
            path: LOGIN_PATH.to_string(),
            from: Some("//evil.example".to_string()),
        };
        assert_eq!(post_login_destination(&protocol_relative), "/");
    }

    #[test]
    fn test_memory_navigator_replace_and_navigate() {
        let nav = MemoryNavigator::default();
        nav.navigate(Location::new("/pets"));
        nav.replace(Location::new(LOGIN_PATH));

        assert_eq!(nav.current().path, LOGIN_PATH);
        let paths: Vec<_> = nav.history().into_iter().map(|l| l.path).collect();
        assert_eq!(paths, vec!["/", "/login"]);
    }
}
