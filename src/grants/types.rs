//! Grant types
//!
//! Core types used by the grant resolution engine.

use crate::grants::validity::ValidityPeriod;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege level granted on a database, ordered by increasing privilege
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GrantClass {
    /// No access
    None,
    /// Read-only queries
    #[default]
    Query,
    /// Create, read, update
    Cru,
    /// Create, read, update, delete
    Crud,
}

impl GrantClass {
    /// Class applied to a permission when the user declares no explicit one
    pub const DEFAULT: GrantClass = GrantClass::Query;

    /// Class a user falls back to when none is declared
    pub const DEFAULT_FALLBACK: GrantClass = GrantClass::None;

    /// Get the class name as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            GrantClass::None => "none",
            GrantClass::Query => "query",
            GrantClass::Cru => "cru",
            GrantClass::Crud => "crud",
        }
    }

    /// Try to parse a class from a string
    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(GrantClass::None),
            "query" => Some(GrantClass::Query),
            "cru" => Some(GrantClass::Cru),
            "crud" => Some(GrantClass::Crud),
            _ => None,
        }
    }

    /// Get all classes, lowest privilege first
    pub fn all() -> &'static [GrantClass] {
        &[
            GrantClass::None,
            GrantClass::Query,
            GrantClass::Cru,
            GrantClass::Crud,
        ]
    }
}

impl fmt::Display for GrantClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a database. Only `Enabled` and above receive grants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseStatus {
    #[default]
    Absent,
    Disabled,
    Enabled,
    AutoEnabled,
    Accessible,
}

impl DatabaseStatus {
    /// Check if a database in this status may receive grants
    pub fn is_eligible(&self) -> bool {
        *self >= DatabaseStatus::Enabled
    }

    /// Get the status name as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            DatabaseStatus::Absent => "absent",
            DatabaseStatus::Disabled => "disabled",
            DatabaseStatus::Enabled => "enabled",
            DatabaseStatus::AutoEnabled => "auto_enabled",
            DatabaseStatus::Accessible => "accessible",
        }
    }
}

impl fmt::Display for DatabaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A database known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Database {
    pub id: String,
    pub status: DatabaseStatus,
    /// Declared schemas; the first one is the default for specs naming none.
    pub schemas: Vec<String>,
}

impl Database {
    /// Create a database; `schemas` keeps its order
    pub fn new(
        id: impl Into<String>,
        status: DatabaseStatus,
        schemas: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            status,
            schemas: schemas.into_iter().map(Into::into).collect(),
        }
    }

    /// First declared schema, used when a permission names none
    pub fn default_schema(&self) -> Option<&str> {
        self.schemas.first().map(String::as_str)
    }
}

/// A permission as declared for a user, before expansion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionSpec {
    /// Exact database id, or a pathname-style glob over ids
    pub selector: String,
    /// Requested schemas; empty means "the database's default schema"
    pub schemas: Vec<String>,
    pub grant_class: GrantClass,
    pub validity: ValidityPeriod,
}

impl PermissionSpec {
    /// Spec with default class, default schema and no validity bounds
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            schemas: Vec::new(),
            grant_class: GrantClass::DEFAULT,
            validity: ValidityPeriod::unbounded(),
        }
    }

    /// Request explicit schemas instead of the default one
    pub fn with_schemas(mut self, schemas: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.schemas = schemas.into_iter().map(Into::into).collect();
        self
    }

    /// Set the class granted while the spec is valid
    pub fn with_grant_class(mut self, grant_class: GrantClass) -> Self {
        self.grant_class = grant_class;
        self
    }

    /// Bound the spec to a validity window
    pub fn with_validity(mut self, validity: ValidityPeriod) -> Self {
        self.validity = validity;
        self
    }
}

/// A concrete grant produced by resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedGrant {
    pub database: String,
    pub schemas: Vec<String>,
    /// Class as configured on the permission spec
    pub grant_class: GrantClass,
    /// Class to provision right now: `grant_class` while the validity window
    /// is active, the user's fallback class otherwise
    pub effective_grant_class: GrantClass,
    pub validity: ValidityPeriod,
}

impl ResolvedGrant {
    /// Check if the grant currently runs at the fallback class
    pub fn is_downgraded(&self) -> bool {
        self.effective_grant_class != self.grant_class
    }
}

/// A user and its permissions.
///
/// Before resolution `P` is [`PermissionSpec`]; resolution consumes the user
/// and hands back a `User<ResolvedGrant>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User<P = PermissionSpec> {
    pub login: String,
    pub fallback_grant_class: GrantClass,
    pub permissions: Vec<P>,
}

impl<P> User<P> {
    /// User with the default fallback class and no permissions
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            fallback_grant_class: GrantClass::DEFAULT_FALLBACK,
            permissions: Vec::new(),
        }
    }

    /// Set the class applied outside validity windows
    pub fn with_fallback(mut self, fallback: GrantClass) -> Self {
        self.fallback_grant_class = fallback;
        self
    }

    /// Append a permission; order decides which spec consumes a database
    pub fn with_permission(mut self, permission: P) -> Self {
        self.permissions.push(permission);
        self
    }
}
