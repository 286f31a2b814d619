//! Access Control Tests
//!
//! - Unregistered identities are unrestricted
//! - Rules apply in order: absent key, key allow, namespace allow, deny, default deny
//! - `*` matches exactly one namespace segment
//! - Strict mode raises, lenient mode degrades

use flowstate::access::{NamespacePattern, Operation, PermissionSet};
use flowstate::store::{OperationContext, StateStore, StoreConfig, StoreError};
use serde_json::json;

fn seeded(strict: bool) -> StateStore {
    let config = StoreConfig::default().with_strict_access(strict);
    let mut store = StateStore::new(config).unwrap();
    let admin = OperationContext::new("admin");
    store
        .write("chat", json!("hello"), &admin.clone().with_namespace("sales.chat"))
        .unwrap();
    store
        .write("daily", json!([1, 2]), &admin.clone().with_namespace("sales.reports.daily"))
        .unwrap();
    store.write("loose", json!(0), &admin).unwrap();
    store
}

fn sales_reader() -> PermissionSet {
    PermissionSet::new().allow_read_namespace("sales.*").unwrap()
}

// =============================================================================
// Single-Level Glob Boundary
// =============================================================================

#[test]
fn test_sales_glob_boundary_lenient() {
    let mut store = seeded(false);
    store.register_permissions("analyst", sales_reader());

    assert_eq!(store.read("chat", "analyst").unwrap(), Some(json!("hello")));
    assert_eq!(store.read("daily", "analyst").unwrap(), None);
    assert!(matches!(
        store.read_required("daily", "analyst"),
        Err(StoreError::KeyNotFound { .. })
    ));
}

#[test]
fn test_sales_glob_boundary_strict() {
    let mut store = seeded(true);
    store.register_permissions("analyst", sales_reader());

    assert_eq!(store.read("chat", "analyst").unwrap(), Some(json!("hello")));
    let err = store.read("daily", "analyst").unwrap_err();
    assert_eq!(
        err,
        StoreError::AccessDenied {
            actor_id: "analyst".into(),
            key: "daily".into(),
            operation: Operation::Read,
        }
    );
    assert!(err.is_recoverable());
}

#[test]
fn test_pattern_matching() {
    let sales = NamespacePattern::parse("sales.*").unwrap();
    assert!(sales.matches("sales.chat"));
    assert!(!sales.matches("sales.reports.daily"));
    assert!(!sales.matches("sales"));

    let leading = NamespacePattern::parse("*.chat").unwrap();
    assert!(leading.matches("sales.chat"));
    assert!(leading.matches("support.chat"));

    let exact = NamespacePattern::parse("sales.reports.daily").unwrap();
    assert!(exact.matches("sales.reports.daily"));

    for bad in ["", "sales.**", "sa*les", "sales..x"] {
        assert!(
            matches!(NamespacePattern::parse(bad), Err(StoreError::InvalidPattern { .. })),
            "{:?} should be rejected",
            bad
        );
    }
}

// =============================================================================
// Rule Order
// =============================================================================

#[test]
fn test_unregistered_identity_is_unrestricted() {
    let store = seeded(true);
    assert!(store.check_access("daily", "stranger", Operation::Read));
    assert!(store.check_access("daily", "stranger", Operation::Write));
}

#[test]
fn test_absent_key_is_always_allowed() {
    let mut store = seeded(true);
    store.register_permissions("guest", PermissionSet::new().deny_key("ghost"));
    assert!(store.check_access("ghost", "guest", Operation::Write));
    store
        .write("ghost", json!(1), &OperationContext::new("guest"))
        .unwrap();
    // Now it exists and the deny list applies
    assert!(!store.check_access("ghost", "guest", Operation::Write));
}

#[test]
fn test_allows_win_over_deny_list() {
    let mut store = seeded(true);
    let set = PermissionSet::new()
        .allow_read_key("loose")
        .deny_key("loose")
        .deny_key("chat")
        .allow_read_namespace("sales.*")
        .unwrap();
    store.register_permissions("mixed", set);

    assert!(store.check_access("loose", "mixed", Operation::Read));
    assert!(store.check_access("chat", "mixed", Operation::Read));
    assert!(!store.check_access("daily", "mixed", Operation::Read));
}

#[test]
fn test_read_and_write_grants_are_separate() {
    let mut store = seeded(true);
    store.register_permissions(
        "editor",
        PermissionSet::new()
            .allow_write_key("chat")
            .allow_read_namespace("sales.reports.*")
            .unwrap(),
    );

    assert!(store.check_access("chat", "editor", Operation::Write));
    assert!(!store.check_access("chat", "editor", Operation::Read));
    assert!(!store.check_access("daily", "editor", Operation::Write));
    assert!(store.check_access("daily", "editor", Operation::Read));
}

// =============================================================================
// Failure Modes
// =============================================================================

#[test]
fn test_lenient_write_and_delete_are_no_ops() {
    let mut store = seeded(false);
    store.register_permissions("reader", sales_reader());
    let commits_before = store.commits().len();

    store
        .write("chat", json!("overwritten"), &OperationContext::new("reader"))
        .unwrap();
    assert!(!store.delete("chat", "reader").unwrap());

    assert_eq!(store.get_item("chat").unwrap().value, json!("hello"));
    assert_eq!(store.commits().len(), commits_before);
    assert_eq!(store.metrics().denials, 2);
}

#[test]
fn test_strict_delete_checks_as_write() {
    let mut store = seeded(true);
    store.register_permissions("reader", PermissionSet::new().allow_read_key("loose"));
    assert!(matches!(
        store.delete("loose", "reader"),
        Err(StoreError::AccessDenied { operation: Operation::Write, .. })
    ));
    assert!(store.contains_key("loose"));
}

#[test]
fn test_revoke_restores_unrestricted_access() {
    let mut store = seeded(true);
    store.register_permissions("guest", PermissionSet::new());
    assert!(!store.check_access("loose", "guest", Operation::Read));
    assert!(store.revoke_permissions("guest").is_some());
    assert!(store.permissions("guest").is_none());
    assert!(store.check_access("loose", "guest", Operation::Read));
}

#[test]
fn test_registries_are_per_instance() {
    let mut first = seeded(true);
    let second = seeded(true);
    first.register_permissions("guest", PermissionSet::new());
    assert!(!first.check_access("loose", "guest", Operation::Read));
    assert!(second.check_access("loose", "guest", Operation::Read));
}
