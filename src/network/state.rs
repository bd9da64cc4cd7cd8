use crate::coordinator::JobCoordinator;
use std::sync::Arc;

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    coordinator: Arc<JobCoordinator>,
}

impl AppState {
    pub fn new(coordinator: JobCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }

    pub fn coordinator(&self) -> &JobCoordinator {
        &self.coordinator
    }
}
