use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::infra::error::AppError;

const APP_DIR_NAME: &str = "bizchat";
const LOG_FILE_NAME: &str = "bizchat.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub data_dir: PathBuf,
    pub session_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl StorageLayout {
    /// Resolves the data directory: explicit override, then
    /// `$XDG_DATA_HOME/bizchat`, then the platform data dir.
    pub fn resolve(data_dir_override: Option<&Path>) -> Result<Self, AppError> {
        let data_dir = match data_dir_override {
            Some(dir) => dir.to_path_buf(),
            None => env::var_os("XDG_DATA_HOME")
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .or_else(dirs::data_dir)
                .map(|base| base.join(APP_DIR_NAME))
                .ok_or_else(|| AppError::StoragePathResolution {
                    details: "unable to resolve data directory (XDG_DATA_HOME/platform data dir)"
                        .into(),
                })?,
        };

        Ok(Self::rooted_at(data_dir))
    }

    fn rooted_at(data_dir: PathBuf) -> Self {
        let session_dir = data_dir.join("session");
        let log_dir = data_dir.join("logs");

        Self {
            data_dir,
            session_dir,
            log_dir,
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [&self.data_dir, &self.session_dir, &self.log_dir] {
            fs::create_dir_all(dir).map_err(|source| AppError::StorageDirCreate {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(())
    }

    pub fn session_lock_file(&self) -> PathBuf {
        self.session_dir.join("session.lock")
    }

    pub fn default_log_file(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }
}
