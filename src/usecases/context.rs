use tracing_appender::non_blocking::WorkerGuard;

use crate::infra::{config::AppConfig, storage_layout::StorageLayout};

#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub layout: StorageLayout,
    /// Keeps the log writer flushing until the context is dropped.
    log_guard: Option<WorkerGuard>,
}

impl AppContext {
    pub fn new(config: AppConfig, layout: StorageLayout) -> Self {
        Self {
            config,
            layout,
            log_guard: None,
        }
    }

    pub fn with_log_guard(mut self, guard: WorkerGuard) -> Self {
        self.log_guard = Some(guard);
        self
    }
}
