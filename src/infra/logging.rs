use std::{fs, path::Path};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::infra::{config::LogConfig, error::AppError};

/// Installs the global subscriber writing to a log file; the TUI owns stdout.
///
/// The returned guard flushes buffered events on drop and must live as long
/// as the application.
pub fn init(config: &LogConfig, default_file: &Path) -> Result<WorkerGuard, AppError> {
    let log_file = config.file.as_deref().unwrap_or(default_file);

    if let Some(parent) = log_file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| AppError::StorageDirCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|error| AppError::LoggingInit(Box::new(error)))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
        )
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(AppError::LoggingInit)?;

    Ok(guard)
}
