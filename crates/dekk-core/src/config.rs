use rust_decimal::Decimal;

use crate::app_config::{AppConfig, Environment};
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

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `.env` templates can leave keys blank.
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

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("DEKK_ENV", "development"))?;

    let bind_addr = or_default("DEKK_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("DEKK_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("DEKK_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("DEKK_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("DEKK_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "DEKK_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds DEKK_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("DEKK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let supplier_a_stock_url = optional("DEKK_SUPPLIER_A_STOCK_URL");
    let supplier_a_images_url = optional("DEKK_SUPPLIER_A_IMAGES_URL");
    let supplier_b_url = optional("DEKK_SUPPLIER_B_URL");
    let feed_request_timeout_secs = parse_u64("DEKK_FEED_REQUEST_TIMEOUT_SECS", "30")?;
    let feed_user_agent = or_default("DEKK_FEED_USER_AGENT", "dekk/0.1 (catalog-sync)");

    let price_markup_isk = or_default("DEKK_PRICE_MARKUP_ISK", "400")
        .parse::<Decimal>()
        .map_err(|e| invalid("DEKK_PRICE_MARKUP_ISK", e.to_string()))?;
    if price_markup_isk.is_sign_negative() {
        return Err(invalid(
            "DEKK_PRICE_MARKUP_ISK",
            "must not be negative".to_string(),
        ));
    }

    let sync_batch_size = parse_positive_usize("DEKK_SYNC_BATCH_SIZE", "50")?;
    let sync_batch_pause_ms = parse_u64("DEKK_SYNC_BATCH_PAUSE_MS", "100")?;
    let sync_handle_obsolete = parse_bool(
        "DEKK_SYNC_HANDLE_OBSOLETE",
        &or_default("DEKK_SYNC_HANDLE_OBSOLETE", "true"),
    )?;
    let obsolete_batch_size = parse_positive_usize("DEKK_OBSOLETE_BATCH_SIZE", "20")?;
    let obsolete_grace_days = optional("DEKK_OBSOLETE_GRACE_DAYS")
        .map(|raw| {
            raw.parse::<u32>()
                .map_err(|e| invalid("DEKK_OBSOLETE_GRACE_DAYS", e.to_string()))
        })
        .transpose()?;
    let obsolete_skip_silent_suppliers = parse_bool(
        "DEKK_OBSOLETE_SKIP_SILENT_SUPPLIERS",
        &or_default("DEKK_OBSOLETE_SKIP_SILENT_SUPPLIERS", "false"),
    )?;
    let sync_lock_timeout_secs = parse_u64("DEKK_SYNC_LOCK_TIMEOUT_SECS", "3600")?;

    let notify_email = optional("DEKK_NOTIFY_EMAIL");
    let sync_schedule = or_default("DEKK_SYNC_SCHEDULE", "0 0 */6 * * *");
    let record_patches_path = PathBuf::from(or_default(
        "DEKK_RECORD_PATCHES_PATH",
        "./config/record_patches.yaml",
    ));

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        supplier_a_stock_url,
        supplier_a_images_url,
        supplier_b_url,
        feed_request_timeout_secs,
        feed_user_agent,
        price_markup_isk,
        sync_batch_size,
        sync_batch_pause_ms,
        sync_handle_obsolete,
        obsolete_batch_size,
        obsolete_grace_days,
        obsolete_skip_silent_suppliers,
        sync_lock_timeout_secs,
        notify_email,
        sync_schedule,
        record_patches_path,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DEKK_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
