//! Server lifecycle

use crate::{create_app, AppState, AuthError, ServerConfig};
use axum::serve;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Startup error: {0}")]
    Startup(#[from] AuthError),
}

pub type ServerResult<T> = Result<T, ServerError>;

pub struct PawhavenServer {
    config: ServerConfig,
    state: AppState,
}

impl PawhavenServer {
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Bind the configured address and serve until the process ends
    pub async fn start(self) -> ServerResult<()> {
        let address = self.config.address();
        let listener = TcpListener::bind(&address).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> ServerResult<()> {
        if self.config.uses_dev_secret() {
            warn!("Using the development JWT secret; set PAWHAVEN_JWT_SECRET");
        }

        let address = listener.local_addr()?;
        info!("Server listening on http://{}", address);

        if let Err(e) = serve(listener, create_app(self.state)).await {
            error!("Server error: {}", e);
            return Err(ServerError::Io(e));
        }

        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}
