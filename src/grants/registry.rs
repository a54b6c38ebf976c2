//! Database registry
//!
//! Holds the known databases in declaration order. Declaration order matters:
//! it is the order in which wildcard selectors consume databases.

use crate::error::GrantError;
use crate::grants::expansion::UsageTracker;
use crate::grants::types::Database;
use std::collections::HashMap;

/// Read-only set of known databases for one resolution pass
#[derive(Debug, Clone, Default)]
pub struct DatabaseRegistry {
    databases: Vec<Database>,
    index: HashMap<String, usize>,
}

impl DatabaseRegistry {
    /// Build a registry, rejecting duplicated ids
    pub fn new(databases: Vec<Database>) -> Result<Self, GrantError> {
        let mut index = HashMap::with_capacity(databases.len());
        for (position, db) in databases.iter().enumerate() {
            if index.insert(db.id.clone(), position).is_some() {
                return Err(GrantError::DuplicateDatabase(db.id.clone()));
            }
        }
        Ok(Self { databases, index })
    }

    /// Look up a database by id, eligible or not
    pub fn get(&self, id: &str) -> Option<&Database> {
        self.index.get(id).map(|&position| &self.databases[position])
    }

    /// All databases in declaration order, eligible or not
    pub fn databases(&self) -> &[Database] {
        &self.databases
    }

    /// Databases that may receive grants, in declaration order
    pub fn eligible(&self) -> impl Iterator<Item = &Database> {
        self.databases.iter().filter(|db| db.status.is_eligible())
    }

    /// Fresh tracker with every eligible database unconsumed
    pub fn usage_tracker(&self) -> UsageTracker {
        UsageTracker::new(self.eligible().map(|db| db.id.clone()))
    }

    /// Number of databases, eligible or not
    pub fn len(&self) -> usize {
        self.databases.len()
    }

    /// Check if the registry holds no database
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grants::types::DatabaseStatus;

    fn registry() -> DatabaseRegistry {
        DatabaseRegistry::new(vec![
            Database::new("zeta", DatabaseStatus::Enabled, ["public"]),
            Database::new("alpha", DatabaseStatus::Disabled, ["public"]),
            Database::new("mid", DatabaseStatus::Accessible, ["main"]),
            Database::new("gone", DatabaseStatus::Absent, ["public"]),
            Database::new("auto", DatabaseStatus::AutoEnabled, ["public"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_eligible_keeps_declaration_order() {
        let binding = registry();
        let ids: Vec<_> = binding.eligible().map(|db| db.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "mid", "auto"]);
    }

    #[test]
    fn test_lookup_includes_ineligible() {
        let registry = registry();
        assert_eq!(registry.len(), 5);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = DatabaseRegistry::new(vec![
            Database::new("billing", DatabaseStatus::Enabled, ["public"]),
            Database::new("billing", DatabaseStatus::Disabled, ["public"]),
        ]);
        assert_eq!(
            result.unwrap_err(),
            GrantError::DuplicateDatabase("billing".into())
        );
    }

    #[test]
    fn test_usage_tracker_seeded_from_eligible() {
        let tracker = registry().usage_tracker();
        let ids: Vec<_> = tracker.ids().collect();
        assert_eq!(ids, vec!["zeta", "mid", "auto"]);
        assert_eq!(tracker.is_consumed("zeta"), Some(false));
        assert_eq!(tracker.is_consumed("alpha"), None);
    }
}
