//! Configuration types for sari
//!
//! This module defines the configuration document that can be loaded from
//! TOML files and/or environment variables, and its conversion into the
//! types the grant resolver works on.

use crate::error::{ConfigError, GrantError, PeriodError};
use crate::grants::{
    Database, DatabaseRegistry, DatabaseStatus, GrantClass, PermissionSpec, User, ValidityPeriod,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

fn default_true() -> bool {
    true
}

fn default_fallback_grant_class() -> GrantClass {
    GrantClass::DEFAULT_FALLBACK
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Re-evaluation loop settings
    pub scheduler: SchedulerConfig,

    /// Known databases, in match priority order
    pub databases: Vec<DatabaseConfig>,

    /// Users and their declared permissions
    pub users: Vec<UserConfig>,
}

impl AppConfig {
    /// Build the database registry for a resolution pass
    pub fn registry(&self) -> Result<DatabaseRegistry, GrantError> {
        DatabaseRegistry::new(self.databases.iter().map(DatabaseConfig::to_database).collect())
    }

    /// Convert the declared users into resolver input
    pub fn users(&self) -> Result<Vec<User>, ConfigError> {
        self.users
            .iter()
            .enumerate()
            .map(|(i, user)| user.to_user(i))
            .collect()
    }
}

/// A database entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Unique database id
    pub id: String,

    /// Disabled databases never receive grants
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Master password spec (`env:NAME` or `file:PATH`)
    #[serde(default)]
    pub master_password: Option<String>,

    /// Declared schemas; the first is the default schema
    #[serde(default)]
    pub schemas: Vec<String>,
}

impl DatabaseConfig {
    pub fn status(&self) -> DatabaseStatus {
        if self.enabled {
            DatabaseStatus::Enabled
        } else {
            DatabaseStatus::Disabled
        }
    }

    pub fn to_database(&self) -> Database {
        Database::new(self.id.clone(), self.status(), self.schemas.iter().cloned())
    }
}

/// A user entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    /// Lowercase email address, unique across users
    pub login: String,

    /// Class applied to permissions outside their validity window
    #[serde(default = "default_fallback_grant_class")]
    pub fallback_grant_class: GrantClass,

    #[serde(default)]
    pub permissions: Vec<PermissionConfig>,
}

impl UserConfig {
    fn to_user(&self, index: usize) -> Result<User, ConfigError> {
        let permissions = self
            .permissions
            .iter()
            .enumerate()
            .map(|(j, perm)| {
                perm.to_spec()
                    .map_err(|source| ConfigError::IllDefinedPeriod {
                        field: format!("users[{}].permissions[{}]", index, j),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(User {
            login: self.login.clone(),
            fallback_grant_class: self.fallback_grant_class,
            permissions,
        })
    }
}

/// A permission entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionConfig {
    /// Database id or glob pattern (`*`, `?`)
    pub db: String,

    /// Requested schemas (empty: the database's default schema)
    #[serde(default)]
    pub schemas: Vec<String>,

    /// Grant class while the permission is valid
    #[serde(default)]
    pub grant_class: GrantClass,

    #[serde(default)]
    pub not_valid_before: Option<DateTime<Utc>>,

    #[serde(default)]
    pub not_valid_after: Option<DateTime<Utc>>,
}

impl PermissionConfig {
    pub fn validity(&self) -> Result<ValidityPeriod, PeriodError> {
        ValidityPeriod::new(self.not_valid_before, self.not_valid_after)
    }

    pub fn to_spec(&self) -> Result<PermissionSpec, PeriodError> {
        Ok(PermissionSpec::new(self.db.clone())
            .with_schemas(self.schemas.iter().cloned())
            .with_grant_class(self.grant_class)
            .with_validity(self.validity()?))
    }
}

/// Re-evaluation loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Shortest wait between two passes
    pub min_interval_secs: u64,

    /// Longest wait between two passes, also used when nothing is scheduled
    pub refresh_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 1,
            refresh_interval_secs: 3600,
        }
    }
}

impl SchedulerConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
