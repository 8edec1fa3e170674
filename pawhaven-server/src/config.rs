//! Server configuration

/// Fallback signing secret for local development
pub const DEV_JWT_SECRET: &str = "pawhaven-dev-secret-change-in-production";

/// Account created at start-up
#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Configuration for the reference backend
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Access token lifetime
    pub token_ttl_minutes: i64,
    /// Optional admin account seeded on start-up
    pub seed_admin: Option<SeedAdmin>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_minutes: 60 * 24,
            seed_admin: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let seed_admin = match (
            std::env::var("PAWHAVEN_ADMIN_EMAIL"),
            std::env::var("PAWHAVEN_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(SeedAdmin {
                name: std::env::var("PAWHAVEN_ADMIN_NAME")
                    .unwrap_or_else(|_| "Administrator".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Self {
            host: std::env::var("PAWHAVEN_HOST").unwrap_or(defaults.host),
            port: std::env::var("PAWHAVEN_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
            jwt_secret: std::env::var("PAWHAVEN_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl_minutes: std::env::var("PAWHAVEN_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|ttl| ttl.parse().ok())
                .filter(|ttl: &i64| *ttl > 0)
                .unwrap_or(defaults.token_ttl_minutes),
            seed_admin,
        }
    }

    pub fn with_seed_admin(mut self, name: &str, email: &str, password: &str) -> Self {
        self.seed_admin = Some(SeedAdmin {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}
