//! Grant resolution module
//!
//! Expands declarative per-user permission specs into concrete grants.
//!
//! ## Resolution Model
//!
//! For every user, permission specs are processed in declaration order:
//!
//! 1. **Validity** - a spec whose window is not active right now gets the
//!    user's fallback grant class instead of its configured one
//! 2. **Expansion** - the selector is an exact database id or a
//!    pathname-style glob (`*`, `?`), matched against eligible databases
//!    (status `enabled` or higher) in registry order
//! 3. **Schemas** - no schemas means the database's first declared schema;
//!    explicit schemas must all be declared by the database
//!
//! A database matched by one spec is consumed for that user: later specs of
//! the same user can no longer match it, so every user receives each database
//! at most once.
//!
//! ## Example
//!
//! ```toml
//! [[users]]
//! login = "alice@example.com"
//! fallback_grant_class = "query"
//!
//! [[users.permissions]]
//! db = "billing"                       # Exact id, consumed first
//! grant_class = "crud"
//! not_valid_after = "2026-12-31T00:00:00Z"
//!
//! [[users.permissions]]
//! db = "*"                             # Everything billing left over
//! ```

pub mod expansion;
pub mod patterns;
pub mod registry;
pub mod resolver;
pub mod types;
pub mod validity;

pub use expansion::{UsageTracker, expand};
pub use patterns::{GlobPattern, is_wildcard};
pub use registry::DatabaseRegistry;
pub use resolver::{GrantResolver, Resolution};
pub use types::{Database, DatabaseStatus, GrantClass, PermissionSpec, ResolvedGrant, User};
pub use validity::{TrackingValidityChecker, ValidityChecker, ValidityPeriod};
