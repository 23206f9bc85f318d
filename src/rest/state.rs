//! Shared state for the REST handlers.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::backend::{Backend, HttpBackend};
use crate::config::Config;
use crate::process::{ActionDispatcher, QueueService};

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub queue: QueueService,
    pub dispatcher: ActionDispatcher,
    /// Backend name, reported by the health check
    pub backend_name: String,
}

impl ApiState {
    pub fn new(config: Config, backend: Arc<dyn Backend>) -> Self {
        Self {
            queue: QueueService::new(backend.clone(), &config.kanban),
            backend_name: backend.name().to_string(),
            dispatcher: ActionDispatcher::new(backend),
            config: Arc::new(config),
        }
    }

    /// State over the configured HTTP backend
    pub fn from_config(config: Config) -> Result<Self> {
        let backend =
            HttpBackend::from_config(&config.backend).context("Failed to create backend client")?;
        Ok(Self::new(config, Arc::new(backend)))
    }
}
