use super::{create_router, AppState};
use crate::{config::ServerConfig, error::AppError};
use tokio::net::TcpListener;
use tracing::info;

pub struct Server {
    address: String,
    state: AppState,
}

impl Server {
    pub fn new(config: &ServerConfig, state: AppState) -> Self {
        Self {
            address: config.address(),
            state,
        }
    }

    pub async fn start(self) -> Result<(), AppError> {
        info!("Starting HTTP server on {}", self.address);
        let listener = TcpListener::bind(&self.address)
            .await
            .map_err(|e| AppError::Bind(e, self.address.clone()))?;
        axum::serve(listener, create_router(self.state))
            .await
            .map_err(AppError::Server)
    }
}
