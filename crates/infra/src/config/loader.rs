//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required ones are missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `AUTHDESK_TENANT_ID`: Directory (tenant) id
//! - `AUTHDESK_CLIENT_ID`: Application (client) id
//! - `AUTHDESK_SCOPE`: Space-separated scopes
//!
//! Optional:
//! - `AUTHDESK_AUTHORITY`: Identity provider base URL
//! - `AUTHDESK_CATCHER_PROTOCOL`, `AUTHDESK_CATCHER_HOST`,
//!   `AUTHDESK_CATCHER_PORT`: Redirect URI parts
//! - `AUTHDESK_STORAGE_SERVICE`: Keychain service name
//! - `AUTHDESK_REFRESH_TTL_DAYS`: Lifetime of the stored refresh token
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./authdesk.json` or `./authdesk.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use authdesk_domain::{AuthDeskError, Config, Result};

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `AuthDeskError::Config` if configuration cannot be loaded from
/// either source or the file is malformed.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Unset optional variables keep their defaults.
///
/// # Errors
/// Returns `AuthDeskError::Config` if required variables are missing
/// or any value is invalid.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.identity.tenant_id = env_var("AUTHDESK_TENANT_ID")?;
    config.identity.client_id = env_var("AUTHDESK_CLIENT_ID")?;
    config.identity.scope = env_var("AUTHDESK_SCOPE")?;
    if let Some(authority) = env_opt("AUTHDESK_AUTHORITY") {
        config.identity.authority = authority;
    }

    if let Some(protocol) = env_opt("AUTHDESK_CATCHER_PROTOCOL") {
        config.catcher.protocol = protocol;
    }
    if let Some(host) = env_opt("AUTHDESK_CATCHER_HOST") {
        config.catcher.host = host;
    }
    if let Some(port) = env_parse::<u16>("AUTHDESK_CATCHER_PORT")? {
        config.catcher.port = port;
    }

    if let Some(service) = env_opt("AUTHDESK_STORAGE_SERVICE") {
        config.storage.service_name = service;
    }
    if let Some(days) = env_parse::<i64>("AUTHDESK_REFRESH_TTL_DAYS")? {
        config.storage.refresh_token_ttl_days = days;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `AuthDeskError::Config` if no file is found, it cannot be read,
/// or its contents do not parse.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AuthDeskError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AuthDeskError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AuthDeskError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AuthDeskError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AuthDeskError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(AuthDeskError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations, returning the first config file found.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 6] = [
        "config.json",
        "config.toml",
        "authdesk.json",
        "authdesk.toml",
        "../config.json",
        "../config.toml",
    ];

    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        AuthDeskError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Set and non-blank.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| AuthDeskError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}
