use std::path::Path;

use crate::{
    infra::{self, error::AppError, storage_layout::StorageLayout},
    usecases::context::AppContext,
};

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let context = build_context(config_path)?;

    let default_log_file = context.layout.default_log_file();
    let guard = infra::logging::init(&context.config.logging, &default_log_file)?;

    tracing::debug!(
        data_dir = %context.layout.data_dir.display(),
        backend = %context.config.backend.base_url,
        "application context ready"
    );

    Ok(context.with_log_guard(guard))
}

fn build_context(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let config = infra::config::load(config_path)?;
    let layout = StorageLayout::resolve(config.storage.data_dir.as_deref())?;
    layout.ensure_dirs()?;

    Ok(AppContext::new(config, layout))
}
