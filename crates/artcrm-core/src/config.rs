use std::path::PathBuf;

use thiserror::Error;

use crate::app_config::AppConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

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

    // Empty strings count as unset so a blank `KEY=` line in `.env` does not
    // masquerade as a credential.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;
    let log_level = or_default("ARTCRM_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("ARTCRM_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("ARTCRM_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("ARTCRM_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let google_maps_api_key = optional("GOOGLE_MAPS_API_KEY");
    let anthropic_api_key = optional("ANTHROPIC_API_KEY");
    let claude_model = or_default("ARTCRM_CLAUDE_MODEL", "claude-3-5-sonnet-20241022");
    let deepseek_api_key = optional("DEEPSEEK_API_KEY");
    let deepseek_base_url = or_default("DEEPSEEK_BASE_URL", "https://api.deepseek.com");

    let request_timeout_secs = parse_u64("ARTCRM_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("ARTCRM_USER_AGENT", "artcrm/0.1 (lead-scout)");

    let scout_rate_limit_ms = parse_u64("ARTCRM_SCOUT_RATE_LIMIT_MS", "1000")?;
    let scout_fallback_min_results = parse_usize("ARTCRM_SCOUT_FALLBACK_MIN_RESULTS", "5")?;
    let scout_results_dir = PathBuf::from(or_default(
        "ARTCRM_SCOUT_RESULTS_DIR",
        "./data/scout_results",
    ));
    let overpass_url = or_default(
        "ARTCRM_OVERPASS_URL",
        "https://overpass-api.de/api/interpreter",
    );
    let default_language = or_default("ARTCRM_DEFAULT_LANGUAGE", "de");

    Ok(AppConfig {
        database_url,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        google_maps_api_key,
        anthropic_api_key,
        claude_model,
        deepseek_api_key,
        deepseek_base_url,
        request_timeout_secs,
        user_agent,
        scout_rate_limit_ms,
        scout_fallback_min_results,
        scout_results_dir,
        overpass_url,
        default_language,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
