mod app_config;
mod file_config;
mod loader;

pub use app_config::{AppConfig, BackendConfig, LogConfig, StorageConfig};
pub use loader::load;
