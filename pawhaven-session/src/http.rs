//! HTTP Client Bindings
//!
//! Two request clients share one base URL:
//!
//! - [`PublicClient`] sends requests as given, without credential injection.
//! - [`AuthedClient`] reads the token from the [`TokenStore`] on every request
//!   and attaches it as a bearer credential. A 401 or 403 answer from any
//!   endpoint ends the session: the token is cleared, the navigator is sent
//!   to `/login` and [`SessionEvent::Invalidated`] is published.

use crate::events::{SessionEvent, SessionEvents};
use crate::navigation::{Location, Navigator, LOGIN_PATH};
use crate::storage::TokenStore;
use pawhaven_core::{
    malformed_response, ApiConfig, AuthEnvelope, ErrorContext, LoginRequest, PawhavenError,
    PawhavenResult, ProfileUpdate, RegisterRequest,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const ME_PATH: &str = "/auth/me";
pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const PROFILE_PATH: &str = "/auth/profile";

/// Configuration for both request clients
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self::from(&pawhaven_core::PawhavenConfig::default().api)
    }
}

impl From<&ApiConfig> for ApiClientConfig {
    fn from(api: &ApiConfig) -> Self {
        Self {
            base_url: api.base_url.clone(),
            timeout_seconds: api.timeout_seconds,
            user_agent: api.user_agent.clone(),
        }
    }
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Build the underlying reqwest client with common configuration
pub(crate) fn create_http_client(config: &ApiClientConfig) -> PawhavenResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            PawhavenError::Config {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );

    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|e| PawhavenError::Config {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })
}

fn transport_error(error: reqwest::Error, operation: &str) -> PawhavenError {
    PawhavenError::Network {
        message: format!("Request failed: {}", error),
        source: Some(Box::new(error)),
        context: ErrorContext::new("http_client")
            .with_operation(operation)
            .with_suggestion("Check network connectivity and the configured api.base_url"),
    }
}

/// Decode a JSON body from a response of any status
///
/// 2xx bodies must parse as `T`. For other statuses the backend's `message`
/// field, when present, becomes the error text.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    operation: &str,
) -> PawhavenResult<T> {
    let status = response.status();
    let url = response.url().clone();
    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(e, operation))?;

    if status.is_success() {
        return serde_json::from_slice(&body).map_err(|e| {
            debug!(%url, error = %e, "Response body did not match the expected shape");
            malformed_response!(format!("{} returned an unexpected body: {}", url.path(), e), operation)
        });
    }

    let message = serde_json::from_slice::<AuthEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_else(|| {
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            )
        });

    Err(PawhavenError::Backend {
        status: Some(status.as_u16()),
        message,
        context: ErrorContext::new("http_client")
            .with_operation(operation)
            .with_metadata("url", url.as_str()),
    })
}

/// Unauthenticated request client
#[derive(Debug, Clone)]
pub struct PublicClient {
    client: reqwest::Client,
    config: ApiClientConfig,
}

impl PublicClient {
    pub fn new(config: ApiClientConfig) -> PawhavenResult<Self> {
        let client = create_http_client(&config)?;

        info!("Created public API client for {}", config.base_url);

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Start a request to `path` under the base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.config.url(path))
    }

    async fn send(&self, builder: RequestBuilder, operation: &str) -> PawhavenResult<Response> {
        builder
            .send()
            .await
            .map_err(|e| transport_error(e, operation))
    }

    pub async fn login(&self, request: &LoginRequest) -> PawhavenResult<AuthEnvelope> {
        let response = self
            .send(
                self.request(Method::POST, LOGIN_ENDPOINT).json(request),
                "login",
            )
            .await?;
        read_json(response, "login").await
    }

    pub async fn register(&self, request: &RegisterRequest) -> PawhavenResult<AuthEnvelope> {
        let response = self
            .send(
                self.request(Method::POST, REGISTER_PATH).json(request),
                "register",
            )
            .await?;
        read_json(response, "register").await
    }

    /// "Who am I" with an explicitly supplied token
    ///
    /// Used by session verification, which must not trigger the
    /// authenticated client's invalidation side effects.
    pub async fn me(&self, token: &str) -> PawhavenResult<AuthEnvelope> {
        let response = self
            .send(
                self.request(Method::GET, ME_PATH).bearer_auth(token),
                "verify_session",
            )
            .await?;
        read_json(response, "verify_session").await
    }

    /// Logout notification; only the HTTP status matters
    pub async fn logout(&self, token: Option<&str>) -> PawhavenResult<()> {
        let mut builder = self.request(Method::POST, LOGOUT_PATH);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = self.send(builder, "logout").await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PawhavenError::Backend {
                status: Some(status.as_u16()),
                message: format!("Logout notification returned HTTP {}", status.as_u16()),
                context: ErrorContext::new("http_client").with_operation("logout"),
            })
        }
    }
}

/// Request client that injects the stored bearer token
#[derive(Clone)]
pub struct AuthedClient {
    client: reqwest::Client,
    config: ApiClientConfig,
    token_store: TokenStore,
    events: SessionEvents,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for AuthedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthedClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl AuthedClient {
    pub fn new(
        config: ApiClientConfig,
        token_store: TokenStore,
        events: SessionEvents,
        navigator: Arc<dyn Navigator>,
    ) -> PawhavenResult<Self> {
        let client = create_http_client(&config)?;

        info!("Created authenticated API client for {}", config.base_url);

        Ok(Self {
            client,
            config,
            token_store,
            events,
            navigator,
        })
    }

    /// Start a request to `path`, attaching the token stored right now
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.config.url(path));
        match self.token_store.read() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request built by [`AuthedClient::request`]
    ///
    /// 401 and 403 answers are turned into [`PawhavenError::Authorization`]
    /// after the session has been invalidated.
    pub async fn send(&self, builder: RequestBuilder) -> PawhavenResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, "authenticated_request"))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let path = response.url().path().to_string();
            self.invalidate_session(status.as_u16(), &path);
            let error = PawhavenError::Authorization {
                status: status.as_u16(),
                context: ErrorContext::new("http_client")
                    .with_operation("authenticated_request")
                    .with_metadata("path", &path)
                    .with_suggestion("Log in again"),
            };
            error.log();
            return Err(error);
        }

        Ok(response)
    }

    fn invalidate_session(&self, status: u16, path: &str) {
        info!(status, path, "Server rejected the session; signing out");

        let event = SessionEvent::Invalidated {
            status,
            path: path.to_string(),
        };

        // the session drops its user before the token goes away
        self.events.notify(&event);

        if let Err(e) = self.token_store.clear() {
            e.log();
        }

        let current = self.navigator.current();
        if current.path != LOGIN_PATH {
            self.navigator
                .replace(Location::redirect(LOGIN_PATH, &current));
        }

        self.events.broadcast(event);
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> PawhavenResult<T> {
        let response = self.send(self.request(Method::GET, path)).await?;
        read_json(response, "get").await
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> PawhavenResult<T> {
        let response = self
            .send(self.request(Method::PUT, path).json(body))
            .await?;
        read_json(response, "put").await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> PawhavenResult<AuthEnvelope> {
        self.put_json(PROFILE_PATH, update).await
    }
}
