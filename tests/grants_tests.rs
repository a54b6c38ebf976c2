//! Grant resolution integration tests
//!
//! Covers:
//! - Selector expansion (exact ids, globs, pathname segments)
//! - Exclusive consumption across a user's permissions
//! - Schema defaulting and validation
//! - Validity windows, fallback classes and next-transition tracking
//! - Failure attribution and all-or-nothing passes

use chrono::{DateTime, Duration, TimeZone, Utc};
use sari::error::{ExpansionError, GrantError, PermissionError};
use sari::grants::{
    Database, DatabaseRegistry, DatabaseStatus, GrantClass, GrantResolver, PermissionSpec,
    Resolution, TrackingValidityChecker, User, ValidityPeriod,
};
use std::collections::HashSet;

// =============================================================================
// Test Helpers
// =============================================================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

fn fleet() -> DatabaseRegistry {
    DatabaseRegistry::new(vec![
        Database::new("billing-eu", DatabaseStatus::Enabled, ["public", "audit"]),
        Database::new("billing-us", DatabaseStatus::Accessible, ["public"]),
        Database::new("payroll", DatabaseStatus::Enabled, ["hr", "public"]),
        Database::new("archive", DatabaseStatus::Disabled, ["public"]),
        Database::new("reports/daily", DatabaseStatus::AutoEnabled, ["main"]),
        Database::new("staging", DatabaseStatus::Absent, ["public"]),
    ])
    .unwrap()
}

fn resolve(users: Vec<User>) -> Result<Resolution, GrantError> {
    GrantResolver::new(&fleet()).resolve(users, now())
}

fn databases(resolution: &Resolution, login: &str) -> Vec<String> {
    resolution
        .user(login)
        .unwrap()
        .permissions
        .iter()
        .map(|g| g.database.clone())
        .collect()
}

// =============================================================================
// 1. Expansion
// =============================================================================

mod expansion {
    use super::*;

    #[test]
    fn test_two_database_scenario() {
        let registry = DatabaseRegistry::new(vec![
            Database::new("a", DatabaseStatus::Enabled, ["s1", "s2"]),
            Database::new("b", DatabaseStatus::Enabled, ["s3"]),
        ])
        .unwrap();
        let user = User::new("alice@example.com").with_permission(PermissionSpec::new("*"));

        let resolution = GrantResolver::new(&registry)
            .resolve(vec![user], now())
            .unwrap();

        let grants = &resolution.users[0].permissions;
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].database, "a");
        assert_eq!(grants[0].schemas, vec!["s1"]);
        assert_eq!(grants[1].database, "b");
        assert_eq!(grants[1].schemas, vec!["s3"]);
    }

    #[test]
    fn test_star_does_not_cross_slash() {
        let user = User::new("alice@example.com").with_permission(PermissionSpec::new("*"));
        let resolution = resolve(vec![user]).unwrap();
        assert_eq!(
            databases(&resolution, "alice@example.com"),
            vec!["billing-eu", "billing-us", "payroll"]
        );
    }

    #[test]
    fn test_segment_wildcard() {
        let user = User::new("alice@example.com").with_permission(PermissionSpec::new("reports/*"));
        let resolution = resolve(vec![user]).unwrap();
        assert_eq!(databases(&resolution, "alice@example.com"), vec!["reports/daily"]);
    }

    #[test]
    fn test_ineligible_databases_never_match() {
        let user = User::new("alice@example.com")
            .with_permission(PermissionSpec::new("*"))
            .with_permission(PermissionSpec::new("*/*"));
        let resolution = resolve(vec![user]).unwrap();
        let ids = databases(&resolution, "alice@example.com");
        assert!(!ids.contains(&"archive".to_string()));
        assert!(!ids.contains(&"staging".to_string()));
    }

    #[test]
    fn test_exact_disabled_database_not_found() {
        let user = User::new("alice@example.com").with_permission(PermissionSpec::new("archive"));
        let err = resolve(vec![user]).unwrap_err();
        assert_eq!(
            err,
            GrantError::permission(
                "alice@example.com",
                0,
                ExpansionError::NotFound {
                    id: "archive".into()
                }
            )
        );
    }

    #[test]
    fn test_empty_wildcard_is_an_error() {
        let user = User::new("alice@example.com").with_permission(PermissionSpec::new("crm-*"));
        let err = resolve(vec![user]).unwrap_err();
        assert!(matches!(
            err,
            GrantError::Permission {
                cause: PermissionError::Expansion(ExpansionError::NoMatch { .. }),
                ..
            }
        ));
    }
}

// =============================================================================
// 2. Exclusive consumption
// =============================================================================

mod consumption {
    use super::*;

    #[test]
    fn test_same_exact_id_twice() {
        let user = User::new("alice@example.com")
            .with_permission(PermissionSpec::new("payroll"))
            .with_permission(PermissionSpec::new("payroll"));

        let err = resolve(vec![user]).unwrap_err();
        assert_eq!(
            err,
            GrantError::permission(
                "alice@example.com",
                1,
                ExpansionError::AlreadyMatched {
                    id: "payroll".into()
                }
            )
        );
    }

    #[test]
    fn test_exact_then_wildcard_takes_the_rest() {
        let user = User::new("alice@example.com")
            .with_permission(PermissionSpec::new("billing-us").with_grant_class(GrantClass::Crud))
            .with_permission(PermissionSpec::new("billing-*"));

        let resolution = resolve(vec![user]).unwrap();
        let grants = &resolution.users[0].permissions;
        assert_eq!(grants[0].database, "billing-us");
        assert_eq!(grants[0].grant_class, GrantClass::Crud);
        assert_eq!(grants[1].database, "billing-eu");
        assert_eq!(grants[1].grant_class, GrantClass::Query);
    }

    #[test]
    fn test_wildcard_then_exact_fails() {
        let user = User::new("alice@example.com")
            .with_permission(PermissionSpec::new("billing-*"))
            .with_permission(PermissionSpec::new("billing-us"));

        let err = resolve(vec![user]).unwrap_err();
        assert!(matches!(
            err,
            GrantError::Permission {
                index: 1,
                cause: PermissionError::Expansion(ExpansionError::AlreadyMatched { .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_wildcard_after_wildcard_gets_leftovers_only() {
        let user = User::new("alice@example.com")
            .with_permission(PermissionSpec::new("billing-*"))
            .with_permission(PermissionSpec::new("*"));

        let resolution = resolve(vec![user]).unwrap();
        assert_eq!(
            databases(&resolution, "alice@example.com"),
            vec!["billing-eu", "billing-us", "payroll"]
        );
    }

    #[test]
    fn test_no_database_twice_per_user() {
        let users = vec![
            User::new("alice@example.com")
                .with_permission(PermissionSpec::new("pay*"))
                .with_permission(PermissionSpec::new("*-eu"))
                .with_permission(PermissionSpec::new("*"))
                .with_permission(PermissionSpec::new("*/*")),
            User::new("bob@example.com")
                .with_permission(PermissionSpec::new("*"))
                .with_permission(PermissionSpec::new("reports/daily")),
        ];

        let registry = fleet();
        let resolution = GrantResolver::new(&registry).resolve(users, now()).unwrap();
        for user in &resolution.users {
            let mut seen = HashSet::new();
            for grant in &user.permissions {
                assert!(seen.insert(&grant.database), "{} granted twice", grant.database);
                assert!(registry.get(&grant.database).unwrap().status.is_eligible());
            }
        }
    }

    #[test]
    fn test_users_do_not_share_consumption() {
        let users = vec![
            User::new("alice@example.com").with_permission(PermissionSpec::new("*")),
            User::new("bob@example.com").with_permission(PermissionSpec::new("*")),
        ];

        let resolution = resolve(users).unwrap();
        assert_eq!(
            databases(&resolution, "alice@example.com"),
            databases(&resolution, "bob@example.com")
        );
    }
}

// =============================================================================
// 3. Schemas
// =============================================================================

mod schemas {
    use super::*;

    #[test]
    fn test_default_is_first_declared_schema() {
        let user = User::new("alice@example.com").with_permission(PermissionSpec::new("payroll"));
        let resolution = resolve(vec![user]).unwrap();
        assert_eq!(resolution.users[0].permissions[0].schemas, vec!["hr"]);
    }

    #[test]
    fn test_explicit_subset_kept() {
        let user = User::new("alice@example.com")
            .with_permission(PermissionSpec::new("billing-eu").with_schemas(["audit", "public"]));
        let resolution = resolve(vec![user]).unwrap();
        assert_eq!(
            resolution.users[0].permissions[0].schemas,
            vec!["audit", "public"]
        );
    }

    #[test]
    fn test_explicit_schemas_checked_per_matched_database() {
        // billing-us declares no "audit" schema
        let user = User::new("alice@example.com")
            .with_permission(PermissionSpec::new("billing-*").with_schemas(["audit"]));

        let err = resolve(vec![user]).unwrap_err();
        assert_eq!(
            err,
            GrantError::permission(
                "alice@example.com",
                0,
                PermissionError::SchemaMismatch {
                    database: "billing-us".into(),
                    schemas: vec!["audit".into()],
                }
            )
        );
    }
}

// =============================================================================
// 4. Validity
// =============================================================================

mod validity {
    use super::*;

    #[test]
    fn test_expired_grant_kept_with_fallback_class() {
        let user = User::new("alice@example.com").with_permission(
            PermissionSpec::new("payroll")
                .with_grant_class(GrantClass::Crud)
                .with_validity(ValidityPeriod::ending(now() - Duration::seconds(1))),
        );

        let resolution = resolve(vec![user]).unwrap();
        let grant = &resolution.users[0].permissions[0];
        assert_eq!(grant.database, "payroll");
        assert_eq!(grant.grant_class, GrantClass::Crud);
        assert_eq!(grant.effective_grant_class, GrantClass::None);
    }

    #[test]
    fn test_future_grant_uses_fallback_until_start() {
        let start = now() + Duration::hours(6);
        let user = User::new("alice@example.com")
            .with_fallback(GrantClass::Query)
            .with_permission(
                PermissionSpec::new("payroll")
                    .with_grant_class(GrantClass::Cru)
                    .with_validity(ValidityPeriod::starting(start)),
            );

        let before = GrantResolver::new(&fleet())
            .resolve(vec![user.clone()], now())
            .unwrap();
        assert_eq!(
            before.users[0].permissions[0].effective_grant_class,
            GrantClass::Query
        );
        assert_eq!(before.next_transition, Some(start));

        let after = GrantResolver::new(&fleet())
            .resolve(vec![user], start)
            .unwrap();
        assert_eq!(
            after.users[0].permissions[0].effective_grant_class,
            GrantClass::Cru
        );
        assert_eq!(after.next_transition, None);
    }

    #[test]
    fn test_next_transition_is_minimum_across_users() {
        let users = vec![
            User::new("alice@example.com").with_permission(
                PermissionSpec::new("payroll")
                    .with_validity(ValidityPeriod::ending(now() + Duration::days(9))),
            ),
            User::new("bob@example.com")
                .with_permission(
                    PermissionSpec::new("billing-eu")
                        .with_validity(ValidityPeriod::starting(now() + Duration::days(4))),
                )
                .with_permission(
                    PermissionSpec::new("billing-us")
                        .with_validity(ValidityPeriod::ending(now() - Duration::days(1))),
                ),
        ];

        let resolution = resolve(users).unwrap();
        assert_eq!(resolution.next_transition, Some(now() + Duration::days(4)));
    }

    #[test]
    fn test_unbounded_permissions_never_transition() {
        let user = User::new("alice@example.com").with_permission(PermissionSpec::new("*"));
        assert_eq!(resolve(vec![user]).unwrap().next_transition, None);
    }

    #[test]
    fn test_per_user_checkers_merge_to_pass_result() {
        let registry = fleet();
        let resolver = GrantResolver::new(&registry);
        let users = vec![
            User::new("alice@example.com").with_permission(
                PermissionSpec::new("payroll")
                    .with_validity(ValidityPeriod::ending(now() + Duration::days(2))),
            ),
            User::new("bob@example.com").with_permission(
                PermissionSpec::new("payroll")
                    .with_validity(ValidityPeriod::ending(now() + Duration::days(1))),
            ),
        ];

        let mut total = TrackingValidityChecker::new(now());
        for user in users.clone() {
            let mut checker = TrackingValidityChecker::new(now());
            let mut usage = registry.usage_tracker();
            resolver.resolve_user(user, &mut checker, &mut usage).unwrap();
            total.merge(&checker);
        }

        let pass = resolver.resolve(users, now()).unwrap();
        assert_eq!(total.next_transition(), pass.next_transition);
    }
}

// =============================================================================
// 5. Passes
// =============================================================================

mod passes {
    use super::*;

    fn users() -> Vec<User> {
        vec![
            User::new("alice@example.com")
                .with_fallback(GrantClass::Query)
                .with_permission(
                    PermissionSpec::new("billing-*")
                        .with_grant_class(GrantClass::Crud)
                        .with_validity(ValidityPeriod::ending(now() + Duration::days(1))),
                )
                .with_permission(PermissionSpec::new("*")),
            User::new("bob@example.com").with_permission(PermissionSpec::new("reports/daily")),
        ]
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let first = resolve(users()).unwrap();
        let second = resolve(users()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_one_failing_user_aborts_the_pass() {
        let mut users = users();
        users.push(User::new("carol@example.com").with_permission(PermissionSpec::new("nope")));

        let err = resolve(users).unwrap_err();
        assert!(matches!(
            err,
            GrantError::Permission { ref login, index: 0, .. } if login == "carol@example.com"
        ));
    }

    #[test]
    fn test_user_without_permissions() {
        let resolution = resolve(vec![User::new("dave@example.com")]).unwrap();
        assert!(resolution.users[0].permissions.is_empty());
        assert_eq!(resolution.grant_count(), 0);
    }

    #[test]
    fn test_time_ref_recorded() {
        assert_eq!(resolve(users()).unwrap().time_ref, now());
    }
}
