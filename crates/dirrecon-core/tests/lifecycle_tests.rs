//! Object Lifecycle Tests
//!
//! Creation and deletion of users and organizational units, including the
//! user post-create steps and partial failures.

mod common;

use common::{path, Call, MemoryDirectory, Op};
use dirrecon_core::lifecycle::ACCOUNT_CONTROL_ATTRIBUTE;
use dirrecon_core::prelude::*;

const NEW_USER: &str = "CN=jdoe,OU=IT,DC=example,DC=com";
const NEW_OU: &str = "OU=Sales,DC=example,DC=com";

fn manager(dir: &MemoryDirectory) -> ObjectLifecycleManager<'_, MemoryDirectory> {
    ObjectLifecycleManager::new(dir, LifecycleConfig::with_initial_password("Initial#Pass1"))
}

fn user_attributes() -> AttributeSet {
    AttributeSet::new()
        .with("sAMAccountName", "jdoe")
        .with("givenName", "John")
        .with("Sn", "Doe")
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_user_sets_credential_and_enables() {
    let dir = MemoryDirectory::new();

    let result = manager(&dir)
        .create(&path(NEW_USER), ObjectKind::User, user_attributes())
        .await
        .unwrap();

    let writes = dir.writes();
    assert_eq!(writes.len(), 3);
    assert_eq!(
        writes[0],
        Call::Create {
            path: path(NEW_USER),
            object_classes: vec!["user".into(), "posixGroup".into(), "top".into()],
            attributes: user_attributes(),
        }
    );
    assert_eq!(writes[1], Call::SetPassword { path: path(NEW_USER) });
    assert_eq!(
        writes[2],
        Call::Modify {
            path: path(NEW_USER),
            changes: ChangeSet::new().with_replace(ACCOUNT_CONTROL_ATTRIBUTE, 512u32),
        }
    );

    assert!(result.is_success());
    assert_eq!(result.operation, OperationType::Modify);
    assert_eq!(dir.password(NEW_USER).as_deref(), Some("Initial#Pass1"));
    assert_eq!(
        dir.value(NEW_USER, "userAccountControl"),
        Some(vec!["512".to_string()])
    );
    assert!(dir.check_credentials(NEW_USER, "Initial#Pass1").await);
}

#[tokio::test]
async fn test_create_organizational_unit() {
    let dir = MemoryDirectory::new();

    let result = manager(&dir)
        .create(
            &path(NEW_OU),
            ObjectKind::OrganizationalUnit,
            AttributeSet::new().with("description", "Sales team"),
        )
        .await
        .unwrap();

    assert_eq!(dir.count(Op::Create), 1);
    assert_eq!(dir.count(Op::SetPassword), 0);
    assert_eq!(dir.count(Op::Modify), 0);
    assert_eq!(result.operation, OperationType::Add);
    assert_eq!(
        dir.value(NEW_OU, "objectClass"),
        Some(vec![
            "organizationalUnit".to_string(),
            "posixGroup".to_string(),
            "top".to_string()
        ])
    );
}

#[tokio::test]
async fn test_create_custom_account_control() {
    let dir = MemoryDirectory::new();
    let config = LifecycleConfig {
        enabled_account_control: 0x10200,
        ..LifecycleConfig::with_initial_password("Initial#Pass1")
    };

    ObjectLifecycleManager::new(&dir, config)
        .create(&path(NEW_USER), ObjectKind::User, user_attributes())
        .await
        .unwrap();

    assert_eq!(
        dir.value(NEW_USER, "userAccountControl"),
        Some(vec!["66048".to_string()])
    );
}

#[tokio::test]
async fn test_create_rejects_naming_mismatch() {
    let dir = MemoryDirectory::new();

    let err = manager(&dir)
        .create(&path(NEW_OU), ObjectKind::User, user_attributes())
        .await
        .unwrap_err();

    assert!(matches!(err, DirectoryError::NamingMismatch { .. }));
    assert!(dir.calls().is_empty());
}

#[tokio::test]
async fn test_create_user_requires_initial_password() {
    let dir = MemoryDirectory::new();

    let err = ObjectLifecycleManager::new(&dir, LifecycleConfig::default())
        .create(&path(NEW_USER), ObjectKind::User, user_attributes())
        .await
        .unwrap_err();

    assert!(matches!(err, DirectoryError::InvalidConfiguration { .. }));
    assert!(dir.calls().is_empty());
}

#[tokio::test]
async fn test_create_existing_object_fails() {
    let dir = MemoryDirectory::new().with_entry(NEW_OU, &[]);

    let err = manager(&dir)
        .create(&path(NEW_OU), ObjectKind::OrganizationalUnit, AttributeSet::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DirectoryError::ObjectAlreadyExists { .. }));
}

#[tokio::test]
async fn test_create_failure_skips_post_create_steps() {
    let dir = MemoryDirectory::new();
    dir.fail_next(Op::Create, 65);

    let err = manager(&dir)
        .create(&path(NEW_USER), ObjectKind::User, user_attributes())
        .await
        .unwrap_err();

    assert_eq!(err.result().unwrap().description, "objectClassViolation");
    assert_eq!(dir.count(Op::SetPassword), 0);
    assert_eq!(dir.count(Op::Modify), 0);
    assert!(!dir.exists(NEW_USER));
}

// ============================================================================
// Partial Lifecycle
// ============================================================================

#[tokio::test]
async fn test_credential_failure_leaves_object_in_place() {
    let dir = MemoryDirectory::new();
    dir.fail_next(Op::SetPassword, 19);

    let err = manager(&dir)
        .create(&path(NEW_USER), ObjectKind::User, user_attributes())
        .await
        .unwrap_err();

    match &err {
        DirectoryError::PartialLifecycle { path: p, stage, .. } => {
            assert_eq!(p, NEW_USER);
            assert_eq!(*stage, LifecycleStage::SetCredential);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.result().unwrap().result_code, 19);
    assert_eq!(err.error_code(), "PARTIAL_LIFECYCLE");
    assert!(dir.exists(NEW_USER));
    assert_eq!(dir.count(Op::Modify), 0);
    assert_eq!(dir.count(Op::Delete), 0);
}

#[tokio::test]
async fn test_enable_failure_leaves_credentialed_object() {
    let dir = MemoryDirectory::new();
    dir.fail_next(Op::Modify, 53);

    let err = manager(&dir)
        .create(&path(NEW_USER), ObjectKind::User, user_attributes())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DirectoryError::PartialLifecycle {
            stage: LifecycleStage::EnableAccount,
            ..
        }
    ));
    assert!(dir.exists(NEW_USER));
    assert!(dir.password(NEW_USER).is_some());
    assert_eq!(dir.value(NEW_USER, "userAccountControl"), None);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_existing_object() {
    let dir = MemoryDirectory::new().with_entry(NEW_OU, &[]);

    let result = manager(&dir).delete(&path(NEW_OU)).await.unwrap();

    assert!(result.is_success());
    assert_eq!(result.operation, OperationType::Delete);
    assert!(!dir.exists(NEW_OU));
}

#[tokio::test]
async fn test_delete_missing_object() {
    let dir = MemoryDirectory::new();

    let err = manager(&dir).delete(&path(NEW_OU)).await.unwrap_err();

    assert!(matches!(err, DirectoryError::ObjectNotFound { .. }));
    assert_eq!(err.error_code(), "OBJECT_NOT_FOUND");
}

#[tokio::test]
async fn test_delete_refused_by_server() {
    let dir = MemoryDirectory::new().with_entry(NEW_OU, &[]);
    dir.fail_next(Op::Delete, 66);

    let err = manager(&dir).delete(&path(NEW_OU)).await.unwrap_err();

    assert_eq!(err.result().unwrap().description, "notAllowedOnNonLeaf");
    assert!(dir.exists(NEW_OU));
}
