use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_MARKETPLACE_BASE_URL: &str = "https://api-gateway.coupang.com";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::str::FromStr;

    use rust_decimal::Decimal;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty values count as unset, matching how `.env` templates are usually filled in.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_ratio = |var: &str, default: &str| -> Result<Decimal, ConfigError> {
        let value = Decimal::from_str(or_default(var, default).trim())
            .map_err(|e| invalid(var, e.to_string()))?;
        if value < Decimal::ZERO || value >= Decimal::ONE {
            return Err(invalid(var, format!("{value} is outside [0, 1)")));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("SOURCING_ENV", "development"))?;
    let log_level = or_default("SOURCING_LOG_LEVEL", "info");

    let queue_path = PathBuf::from(or_default(
        "SOURCING_QUEUE_PATH",
        "./data/register_queue.json",
    ));
    let credentials_path = PathBuf::from(or_default(
        "SOURCING_CREDENTIALS_PATH",
        "./data/credentials.json",
    ));
    let multipliers_path = optional("SOURCING_MULTIPLIERS_PATH").map(PathBuf::from);

    let fee_rate = parse_ratio("SOURCING_FEE_RATE", "0.108")?;
    let change_threshold = parse_ratio("SOURCING_CHANGE_THRESHOLD", "0.20")?;
    let max_retries = parse_u32("SOURCING_MAX_RETRIES", "3")?;
    let enrich_concurrency = parse_usize("SOURCING_ENRICH_CONCURRENCY", "4")?;

    let marketplace_base_url = or_default("COUPANG_BASE_URL", DEFAULT_MARKETPLACE_BASE_URL);
    let proxy_url = optional("COUPANG_PROXY_URL");
    let proxy_key = optional("COUPANG_PROXY_KEY");
    if proxy_url.is_some() && proxy_key.is_none() {
        return Err(ConfigError::MissingEnvVar("COUPANG_PROXY_KEY".to_string()));
    }

    let gateway_timeout_secs = parse_u64("SOURCING_GATEWAY_TIMEOUT_SECS", "30")?;
    let gateway_max_429_retries = parse_u32("SOURCING_GATEWAY_MAX_429_RETRIES", "2")?;
    let gateway_backoff_base_ms = parse_u64("SOURCING_GATEWAY_BACKOFF_BASE_MS", "1000")?;

    let proxy_bind_addr = or_default("SOURCING_PROXY_BIND_ADDR", "0.0.0.0:4000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("SOURCING_PROXY_BIND_ADDR", e.to_string()))?;

    Ok(AppConfig {
        env,
        log_level,
        queue_path,
        credentials_path,
        multipliers_path,
        fee_rate,
        change_threshold,
        max_retries,
        enrich_concurrency,
        marketplace_base_url,
        proxy_url,
        proxy_key,
        gateway_timeout_secs,
        gateway_max_429_retries,
        gateway_backoff_base_ms,
        proxy_bind_addr,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SOURCING_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}
