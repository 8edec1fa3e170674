//! Pawhaven reference backend
//!
//! Serves the `/auth` API the session layer talks to, plus a protected
//! sample resource, for local development and end-to-end tests.

pub mod config;
pub mod extract;
pub mod handlers;
pub mod jwt;
pub mod server;
pub mod state;
pub mod users;

pub use config::{SeedAdmin, ServerConfig};
pub use jwt::{AuthError, Claims, JwtService};
pub use server::PawhavenServer;
pub use state::AppState;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// `/auth` routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::me))
        .route("/login", post(handlers::login))
        .route("/register", post(handlers::register))
        .route("/logout", post(handlers::logout))
        .route("/profile", put(handlers::update_profile))
}

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    Router::new()
        .nest("/auth", auth_routes())
        .route("/admin/users", get(handlers::list_users))
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
