pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod network;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use config::Configuration;
pub use coordinator::{CoordinatorBuilder, JobCoordinator};
pub use error::{AppError, ExtractionError, PoseError, ProgressError};
