use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Browser-like user agent sent when `PROMOSYNC_USER_AGENT` is unset.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Largest insert batch whose bind parameters fit in one Postgres statement
/// (65535 binds, 13 per promotion row).
pub const MAX_INSERT_BATCH_SIZE: usize = 5000;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
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
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can use a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
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

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(invalid(var, format!("expected true/false, got '{other}'"))),
        }
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("PROMOSYNC_ENV", "development"))?;
    let log_level = or_default("PROMOSYNC_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default(
        "PROMOSYNC_SOURCES_PATH",
        "./config/sources.yaml",
    ));

    let db_max_connections = parse_u32("PROMOSYNC_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("PROMOSYNC_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PROMOSYNC_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let request_timeout_secs = parse_u64("PROMOSYNC_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("PROMOSYNC_USER_AGENT", DEFAULT_USER_AGENT);
    let max_retries = parse_u32("PROMOSYNC_MAX_RETRIES", "3")?;
    if max_retries == 0 {
        return Err(invalid(
            "PROMOSYNC_MAX_RETRIES",
            "must allow at least one attempt".to_string(),
        ));
    }
    let crawl_delay_ms = parse_u64("PROMOSYNC_CRAWL_DELAY_MS", "1000")?;
    let backoff_base_secs = parse_u64("PROMOSYNC_BACKOFF_BASE_SECS", "1")?;

    let insert_batch_size = parse_usize("PROMOSYNC_INSERT_BATCH_SIZE", "100")?;
    if !(1..=MAX_INSERT_BATCH_SIZE).contains(&insert_batch_size) {
        return Err(invalid(
            "PROMOSYNC_INSERT_BATCH_SIZE",
            format!("must be between 1 and {MAX_INSERT_BATCH_SIZE}"),
        ));
    }
    let key_includes_barcode = parse_bool("PROMOSYNC_KEY_INCLUDES_BARCODE", "false")?;
    let data_dir = lookup("PROMOSYNC_DATA_DIR")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        sources_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        request_timeout_secs,
        user_agent,
        max_retries,
        crawl_delay_ms,
        backoff_base_secs,
        insert_batch_size,
        key_includes_barcode,
        data_dir,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PROMOSYNC_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
