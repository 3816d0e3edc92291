use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const BACKEND_URL_ENV: &str = "BIZCHAT_BACKEND_URL";

pub fn load(path: Option<&Path>) -> Result<AppConfig, AppError> {
    load_with_env(path, |key| env::var(key).ok())
}

pub(crate) fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<AppConfig, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = AppConfig::default();

    if config_path.exists() {
        let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
            path: config_path.clone(),
            source,
        })?;

        let file_config: FileConfig =
            toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
                path: config_path,
                source,
            })?;

        file_config.merge_into(&mut config);
    }

    if let Some(base_url) = lookup(BACKEND_URL_ENV).filter(|value| !value.trim().is_empty()) {
        config.backend.base_url = base_url.trim().to_owned();
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), AppError> {
    let base_url = config.backend.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(AppError::ConfigInvalid {
            key: "backend.base_url",
            details: format!("expected an http(s) URL, got {base_url:?}"),
        });
    }

    if config.backend.request_timeout_ms == 0 {
        return Err(AppError::ConfigInvalid {
            key: "backend.request_timeout_ms",
            details: "must be greater than zero".to_owned(),
        });
    }

    Ok(())
}
