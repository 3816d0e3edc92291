use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value for {key}: {details}")]
    ConfigInvalid { key: &'static str, details: String },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("unable to resolve storage path: {details}")]
    StoragePathResolution { details: String },
    #[error("failed to create directory {path}: {source}")]
    StorageDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open session lock at {path}: {source}")]
    SessionLockCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session store at {path} is in use by another bizchat process")]
    SessionStoreBusy { path: PathBuf },
    #[error("session store I/O failed at {path}: {source}")]
    SessionStoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode session record: {0}")]
    SessionEncode(#[source] serde_json::Error),
    #[error("failed to build HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),
    #[error("failed to start async runtime: {0}")]
    RuntimeInit(#[source] std::io::Error),
}
