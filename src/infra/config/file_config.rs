use std::path::PathBuf;

use serde::Deserialize;

use crate::infra::config::{AppConfig, BackendConfig, LogConfig, StorageConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub backend: Option<FileBackendConfig>,
    pub storage: Option<FileStorageConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(backend) = self.backend {
            backend.merge_into(&mut config.backend);
        }

        if let Some(storage) = self.storage {
            storage.merge_into(&mut config.storage);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(file) = self.file {
            config.file = Some(file);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileBackendConfig {
    pub base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

impl FileBackendConfig {
    fn merge_into(self, config: &mut BackendConfig) {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }

        if let Some(timeout_ms) = self.request_timeout_ms {
            config.request_timeout_ms = timeout_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileStorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl FileStorageConfig {
    fn merge_into(self, config: &mut StorageConfig) {
        if let Some(data_dir) = self.data_dir {
            config.data_dir = Some(data_dir);
        }
    }
}
