//! Database Access Grant Resolver
//!
//! Computes, from a declarative description of databases and users, the
//! concrete grants each user currently holds, and when that computation must
//! be redone.
//!
//! ## Features
//!
//! - **Wildcard selectors** with pathname-style globbing over database ids
//! - **Exclusive matching** - a database is granted to a user at most once,
//!   earlier permissions win
//! - **Validity windows** that downgrade a grant to the user's fallback
//!   class outside of them
//! - **Next transition** tracking, so a scheduler re-runs exactly when some
//!   window opens or closes
//!
//! ## Resolution Model
//!
//! ```text
//! validity → effective class → selector expansion → schema defaulting
//! ```
//!
//! ## Example Configuration
//!
//! ```toml
//! [[databases]]
//! id = "billing"
//! master_password = "env:BILLING_MASTER_PASSWORD"
//! schemas = ["public", "audit"]
//!
//! [[databases]]
//! id = "legacy"
//! enabled = false                 # Never granted
//!
//! [[users]]
//! login = "alice@example.com"
//! fallback_grant_class = "none"
//!
//! [[users.permissions]]
//! db = "*"                        # Every enabled database
//! grant_class = "crud"
//! not_valid_after = "2026-12-31T00:00:00Z"
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod grants;
pub mod report;
pub mod scheduler;
pub mod util;

use chrono::{DateTime, Utc};

// Re-export main types
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use grants::{GrantResolver, Resolution};

/// Run one resolution pass over a loaded configuration
pub fn resolve(config: &AppConfig, time_ref: DateTime<Utc>) -> Result<Resolution> {
    let registry = config.registry()?;
    let users = config.users()?;
    Ok(GrantResolver::new(&registry).resolve(users, time_ref)?)
}
