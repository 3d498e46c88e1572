//! Application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::workflow::Workflow;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub server: ServerConfig,
    pub workflow: Arc<Workflow>,
}

impl AppState {
    pub fn new(server: ServerConfig, workflow: Workflow) -> Self {
        Self {
            server,
            workflow: Arc::new(workflow),
        }
    }
}
