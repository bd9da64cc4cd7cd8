//! HTTP surface for triggering analyses and polling their progress.
//!
//! - `POST /detect` starts a job
//! - `GET /progress?jobId=...` reads its progress
//! - `GET /health` reports liveness and model readiness

pub mod dto;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};

pub use error::{ApiError, ApiResult};
pub use server::Server;
pub use state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/detect", post(handlers::detect))
        .route("/progress", get(handlers::progress))
        .route("/health", get(handlers::health))
        .with_state(state)
}
