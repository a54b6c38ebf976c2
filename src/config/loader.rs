//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (SARI__*)
//! 2. Configuration file (TOML)
//! 3. Default values
//!
//! Loaded documents are structurally validated before anything is resolved.

use crate::config::types::AppConfig;
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "sari.toml",
    ".sari.toml",
    "~/.config/sari/config.toml",
    "/etc/sari/config.toml",
];

/// Lowercase email address
const LOGIN_PATTERN: &str = r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)+$";

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // e.g., SARI__LOGGING__LEVEL, SARI__SCHEDULER__REFRESH_INTERVAL_SECS
    // Double underscore (__) maps to nested keys (logging.level)
    builder = builder.add_source(
        Environment::with_prefix("SARI")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.scheduler.min_interval_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "scheduler.min_interval_secs must be greater than 0".to_string(),
        });
    }

    if config.scheduler.refresh_interval_secs < config.scheduler.min_interval_secs {
        return Err(ConfigError::Invalid {
            message: format!(
                "scheduler.refresh_interval_secs must be at least min_interval_secs ({}), got: {}",
                config.scheduler.min_interval_secs, config.scheduler.refresh_interval_secs
            ),
        });
    }

    validate_databases(config)?;
    validate_users(config)?;

    Ok(())
}

fn validate_databases(config: &AppConfig) -> Result<(), ConfigError> {
    let mut ids = HashSet::new();

    for (i, db) in config.databases.iter().enumerate() {
        if db.id.is_empty() {
            return Err(ConfigError::Missing {
                field: format!("databases[{}].id", i),
            });
        }
        if !ids.insert(db.id.as_str()) {
            return Err(ConfigError::Duplicate {
                kind: "database ID",
                id: db.id.clone(),
            });
        }
        if db.status().is_eligible() && db.master_password.is_none() {
            return Err(ConfigError::Missing {
                field: format!("databases[{}].master_password", i),
            });
        }
    }

    Ok(())
}

fn validate_users(config: &AppConfig) -> Result<(), ConfigError> {
    let login_pattern = Regex::new(LOGIN_PATTERN).map_err(|e| ConfigError::Invalid {
        message: format!("login pattern: {}", e),
    })?;
    let mut logins = HashSet::new();

    for (i, user) in config.users.iter().enumerate() {
        if user.login.is_empty() {
            return Err(ConfigError::Missing {
                field: format!("users[{}].login", i),
            });
        }
        if !login_pattern.is_match(&user.login) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "users[{}].login must be a lowercase email address, got: {}",
                    i, user.login
                ),
            });
        }
        if !logins.insert(user.login.as_str()) {
            return Err(ConfigError::Duplicate {
                kind: "user login",
                id: user.login.clone(),
            });
        }

        for (j, perm) in user.permissions.iter().enumerate() {
            if perm.db.is_empty() {
                return Err(ConfigError::Missing {
                    field: format!("users[{}].permissions[{}].db", i, j),
                });
            }
            if perm.db != perm.db.to_lowercase() {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "users[{}].permissions[{}].db must be lowercase, got: {}",
                        i, j, perm.db
                    ),
                });
            }
            perm.validity()
                .map_err(|source| ConfigError::IllDefinedPeriod {
                    field: format!("users[{}].permissions[{}]", i, j),
                    source,
                })?;
        }
    }

    Ok(())
}
