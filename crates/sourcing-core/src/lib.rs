pub mod app_config;
pub mod config;
pub mod credentials;
pub mod error;
pub mod item;
pub mod status;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, DEFAULT_MARKETPLACE_BASE_URL};
pub use credentials::CredentialRecord;
pub use error::{ConfigError, CoreError};
pub use item::QueueItem;
pub use status::QueueStatus;
