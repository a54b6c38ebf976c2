//! Error types for sari
//!
//! This module defines the error hierarchy used throughout the application.
//! Every error here is a configuration or input error: none of them is
//! transient, so nothing is retried and the caller must fix its input.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Grant resolution error: {0}")]
    Grant(#[from] GrantError),

    #[error("Secret resolution error: {0}")]
    Secret(#[from] SecretError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Duplicated {kind} '{id}'")]
    Duplicate { kind: &'static str, id: String },

    #[error("Invalid validity period in {field}: {source}")]
    IllDefinedPeriod {
        field: String,
        #[source]
        source: PeriodError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A validity window whose bounds are out of order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error(
        "not_valid_before ({not_valid_before}) must precede not_valid_after ({not_valid_after})"
    )]
    IllDefined {
        not_valid_before: DateTime<Utc>,
        not_valid_after: DateTime<Utc>,
    },
}

/// Failure to turn a selector into concrete database ids
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("id='{id}' not found")]
    NotFound { id: String },

    #[error("duplicated match for id='{id}'")]
    AlreadyMatched { id: String },

    #[error("no match found for spec '{selector}'")]
    NoMatch { selector: String },
}

/// Failure while resolving a single permission spec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error(transparent)]
    Expansion(#[from] ExpansionError),

    #[error("unknown schema(s)={schemas:?} for database='{database}'")]
    SchemaMismatch {
        database: String,
        schemas: Vec<String>,
    },

    #[error("database='{database}' declares no schemas to default to")]
    NoSchemas { database: String },
}

/// Errors raised by the grant resolution engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrantError {
    #[error("duplicated database ID '{0}'")]
    DuplicateDatabase(String),

    #[error("duplicated user login '{0}'")]
    DuplicateUser(String),

    /// The failing spec is identified by its zero-based position in the
    /// user's permission list.
    #[error("user[{login}].permission[{index}]: {cause}")]
    Permission {
        login: String,
        index: usize,
        cause: PermissionError,
    },
}

impl GrantError {
    pub fn permission(
        login: impl Into<String>,
        index: usize,
        cause: impl Into<PermissionError>,
    ) -> Self {
        Self::Permission {
            login: login.into(),
            index,
            cause: cause.into(),
        }
    }
}

/// Master password resolution errors
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("unsupported password spec")]
    UnsupportedSpec,

    #[error("no master password configured")]
    NotConfigured,

    #[error("ssm: password spec used but no SSM client is configured")]
    SsmUnavailable,

    #[error("failed to read SSM parameter '{name}': {message}")]
    Ssm { name: String, message: String },

    #[error("environment variable '{0}' is not set")]
    MissingEnv(String),

    #[error("failed to read password file '{path}': {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("database[{database}]: {source}")]
    Database {
        database: String,
        #[source]
        source: Box<SecretError>,
    },
}

/// Report rendering errors
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for grant resolution
pub type GrantResult<T> = std::result::Result<T, GrantError>;
