//! Grant resolver
//!
//! Resolves every user's permission specs into concrete grants:
//! 1. Evaluate the validity window to pick the effective grant class
//! 2. Expand the selector into unconsumed eligible databases
//! 3. Default or validate schemas per matched database
//!
//! Any failure aborts the whole pass. Partial grant sets are never returned.

use crate::error::{ExpansionError, GrantError, GrantResult, PermissionError};
use crate::grants::expansion::{UsageTracker, expand};
use crate::grants::registry::DatabaseRegistry;
use crate::grants::types::{ResolvedGrant, User};
use crate::grants::validity::{TrackingValidityChecker, ValidityChecker};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, trace};

/// Outcome of one resolution pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Instant the pass was evaluated at
    pub time_ref: DateTime<Utc>,
    /// Earliest instant at which re-running the pass could change some
    /// effective grant class; `None` means never
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_transition: Option<DateTime<Utc>>,
    pub users: Vec<User<ResolvedGrant>>,
}

impl Resolution {
    /// Resolved user by login
    pub fn user(&self, login: &str) -> Option<&User<ResolvedGrant>> {
        self.users.iter().find(|u| u.login == login)
    }

    /// Total number of grants across users
    pub fn grant_count(&self) -> usize {
        self.users.iter().map(|u| u.permissions.len()).sum()
    }
}

/// Resolves users against a read-only registry snapshot
pub struct GrantResolver<'a> {
    registry: &'a DatabaseRegistry,
}

impl<'a> GrantResolver<'a> {
    /// Create a resolver over a registry snapshot
    pub fn new(registry: &'a DatabaseRegistry) -> Self {
        Self { registry }
    }

    /// Resolve all users at `time_ref`
    pub fn resolve(&self, users: Vec<User>, time_ref: DateTime<Utc>) -> GrantResult<Resolution> {
        let mut logins = HashSet::with_capacity(users.len());
        for user in &users {
            if !logins.insert(user.login.as_str()) {
                return Err(GrantError::DuplicateUser(user.login.clone()));
            }
        }

        let mut checker = TrackingValidityChecker::new(time_ref);
        let mut usage = self.registry.usage_tracker();

        let resolved = users
            .into_iter()
            .map(|user| self.resolve_user(user, &mut checker, &mut usage))
            .collect::<GrantResult<Vec<_>>>()?;

        let resolution = Resolution {
            time_ref,
            next_transition: checker.next_transition(),
            users: resolved,
        };

        info!(
            users = resolution.users.len(),
            grants = resolution.grant_count(),
            next_transition = ?resolution.next_transition,
            "Resolved grants"
        );

        Ok(resolution)
    }

    /// Resolve a single user.
    ///
    /// `usage` is reset before use, so one tracker can be reused across users.
    /// The user is only handed back, with its permissions replaced by grants,
    /// when every spec resolved.
    pub fn resolve_user<C>(
        &self,
        user: User,
        checker: &mut C,
        usage: &mut UsageTracker,
    ) -> GrantResult<User<ResolvedGrant>>
    where
        C: ValidityChecker + ?Sized,
    {
        debug!(
            login = %user.login,
            permissions = user.permissions.len(),
            "Resolving user"
        );

        usage.reset();
        let mut grants = Vec::with_capacity(user.permissions.len());

        for (index, spec) in user.permissions.iter().enumerate() {
            let effective_grant_class = if checker.check(&spec.validity) {
                spec.grant_class
            } else {
                trace!(
                    login = %user.login,
                    index,
                    fallback = %user.fallback_grant_class,
                    "Permission outside its validity window"
                );
                user.fallback_grant_class
            };

            let ids = expand(&spec.selector, usage)
                .map_err(|e| GrantError::permission(&user.login, index, e))?;

            for id in ids {
                let schemas = self
                    .resolve_schemas(&id, &spec.schemas)
                    .map_err(|e| GrantError::permission(&user.login, index, e))?;

                trace!(
                    login = %user.login,
                    database = %id,
                    schemas = ?schemas,
                    effective = %effective_grant_class,
                    "Granted"
                );

                grants.push(ResolvedGrant {
                    database: id,
                    schemas,
                    grant_class: spec.grant_class,
                    effective_grant_class,
                    validity: spec.validity,
                });
            }
        }

        Ok(User {
            login: user.login,
            fallback_grant_class: user.fallback_grant_class,
            permissions: grants,
        })
    }

    /// Default to the database's first schema, or check the requested ones
    fn resolve_schemas(
        &self,
        database: &str,
        requested: &[String],
    ) -> Result<Vec<String>, PermissionError> {
        let db = self
            .registry
            .get(database)
            .ok_or_else(|| ExpansionError::NotFound {
                id: database.to_string(),
            })?;

        if requested.is_empty() {
            return match db.default_schema() {
                Some(schema) => Ok(vec![schema.to_string()]),
                None => Err(PermissionError::NoSchemas {
                    database: db.id.clone(),
                }),
            };
        }

        let unknown: Vec<String> = requested
            .iter()
            .filter(|&schema| !db.schemas.contains(schema))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(PermissionError::SchemaMismatch {
                database: db.id.clone(),
                schemas: unknown,
            });
        }

        Ok(requested.to_vec())
    }
}
