use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment, PipelineConfig, SinkConfig};
use crate::ConfigError;

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

fn parse_var<T, F>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    match lookup(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, var: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let Ok(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

fn parse_quality<F>(lookup: &F, var: &str, default: u8) -> Result<u8, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let quality = parse_var(lookup, var, default)?;
    if (1..=100).contains(&quality) {
        Ok(quality)
    } else {
        Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("quality must be between 1 and 100, got {quality}"),
        })
    }
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("ASSETSYNC_ENV", "development"))?;
    let log_level = or_default("ASSETSYNC_LOG_LEVEL", "info");
    let db_max_connections = parse_var(&lookup, "ASSETSYNC_DB_MAX_CONNECTIONS", 5u32)?;
    let db_acquire_timeout_secs = parse_var(&lookup, "ASSETSYNC_DB_ACQUIRE_TIMEOUT_SECS", 10u64)?;

    let sink = match or_default("ASSETSYNC_SINK", "local").as_str() {
        "local" => SinkConfig::Local {
            root: PathBuf::from(or_default("ASSETSYNC_LOCAL_ROOT", "./public/product-images")),
            public_base_url: or_default("ASSETSYNC_LOCAL_PUBLIC_BASE_URL", "/product-images"),
        },
        "supabase" => SinkConfig::Supabase {
            url: require("ASSETSYNC_SUPABASE_URL")?,
            service_key: require("ASSETSYNC_SUPABASE_SERVICE_KEY")?,
            bucket: or_default("ASSETSYNC_SUPABASE_BUCKET", "product-images"),
        },
        other => {
            return Err(ConfigError::InvalidEnvVar {
                var: "ASSETSYNC_SINK".to_string(),
                reason: format!("expected \"local\" or \"supabase\", got \"{other}\""),
            })
        }
    };

    let defaults = PipelineConfig::default();
    let pipeline = PipelineConfig {
        max_edge_length: parse_var(&lookup, "ASSETSYNC_MAX_EDGE_LENGTH", defaults.max_edge_length)?,
        jpeg_quality: parse_quality(&lookup, "ASSETSYNC_JPEG_QUALITY", defaults.jpeg_quality)?,
        max_file_size_bytes: parse_var(
            &lookup,
            "ASSETSYNC_MAX_FILE_SIZE_BYTES",
            defaults.max_file_size_bytes,
        )?,
        fallback_max_edge_length: parse_var(
            &lookup,
            "ASSETSYNC_FALLBACK_MAX_EDGE_LENGTH",
            defaults.fallback_max_edge_length,
        )?,
        fallback_jpeg_quality: parse_quality(
            &lookup,
            "ASSETSYNC_FALLBACK_JPEG_QUALITY",
            defaults.fallback_jpeg_quality,
        )?,
        dry_run: parse_bool(&lookup, "ASSETSYNC_DRY_RUN", defaults.dry_run)?,
        per_record_delay_ms: parse_var(
            &lookup,
            "ASSETSYNC_PER_RECORD_DELAY_MS",
            defaults.per_record_delay_ms,
        )?,
        max_concurrent_records: parse_var(
            &lookup,
            "ASSETSYNC_MAX_CONCURRENT_RECORDS",
            defaults.max_concurrent_records,
        )?
        .max(1),
        fetch_timeout_secs: parse_var(
            &lookup,
            "ASSETSYNC_FETCH_TIMEOUT_SECS",
            defaults.fetch_timeout_secs,
        )?,
        fetch_max_retries: parse_var(
            &lookup,
            "ASSETSYNC_FETCH_MAX_RETRIES",
            defaults.fetch_max_retries,
        )?,
        retry_backoff_base_ms: parse_var(
            &lookup,
            "ASSETSYNC_RETRY_BACKOFF_BASE_MS",
            defaults.retry_backoff_base_ms,
        )?,
        user_agent: or_default("ASSETSYNC_USER_AGENT", &defaults.user_agent),
        key_prefix: or_default("ASSETSYNC_KEY_PREFIX", &defaults.key_prefix),
    };

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_acquire_timeout_secs,
        sink,
        pipeline,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ASSETSYNC_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}
