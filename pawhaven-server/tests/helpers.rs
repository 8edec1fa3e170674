//! Integration test helpers

use pawhaven_server::{AppState, PawhavenServer, ServerConfig};
use std::sync::LazyLock;
use tokio::net::TcpListener;

pub const ADMIN_EMAIL: &str = "admin@pawhaven.local";
pub const ADMIN_PASSWORD: &str = "admin123";

// Only initialize tracing once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

pub fn test_config() -> ServerConfig {
    ServerConfig {
        jwt_secret: "integration-test-secret".to_string(),
        ..Default::default()
    }
    .with_seed_admin("Administrator", ADMIN_EMAIL, ADMIN_PASSWORD)
}

/// Router state for `oneshot` tests
pub async fn test_state() -> AppState {
    LazyLock::force(&TRACING);
    AppState::new(test_config())
        .await
        .expect("Failed to build state")
}

/// Real server on a random port
pub struct TestApp {
    pub address: String,
}

pub async fn spawn_app() -> TestApp {
    LazyLock::force(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = PawhavenServer::new(test_config())
        .await
        .expect("Failed to build server");
    tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
    }
}
