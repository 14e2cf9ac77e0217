use std::net::SocketAddr;
use std::path::PathBuf;

use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub queue_path: PathBuf,
    pub credentials_path: PathBuf,
    pub multipliers_path: Option<PathBuf>,
    pub fee_rate: Decimal,
    pub change_threshold: Decimal,
    pub max_retries: u32,
    pub enrich_concurrency: usize,
    pub marketplace_base_url: String,
    pub proxy_url: Option<String>,
    pub proxy_key: Option<String>,
    pub gateway_timeout_secs: u64,
    pub gateway_max_429_retries: u32,
    pub gateway_backoff_base_ms: u64,
    pub proxy_bind_addr: SocketAddr,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("queue_path", &self.queue_path)
            .field("credentials_path", &self.credentials_path)
            .field("multipliers_path", &self.multipliers_path)
            .field("fee_rate", &self.fee_rate)
            .field("change_threshold", &self.change_threshold)
            .field("max_retries", &self.max_retries)
            .field("enrich_concurrency", &self.enrich_concurrency)
            .field("marketplace_base_url", &self.marketplace_base_url)
            .field("proxy_url", &self.proxy_url)
            .field("proxy_key", &self.proxy_key.as_ref().map(|_| "[redacted]"))
            .field("gateway_timeout_secs", &self.gateway_timeout_secs)
            .field("gateway_max_429_retries", &self.gateway_max_429_retries)
            .field("gateway_backoff_base_ms", &self.gateway_backoff_base_ms)
            .field("proxy_bind_addr", &self.proxy_bind_addr)
            .finish()
    }
}
