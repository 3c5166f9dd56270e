//! End-to-end reconcile scenarios against the in-memory backend

use pretty_assertions::assert_eq;
use provider_core::{
    CollectionConfig, CollectionReconciler, RoleConfig, RoleReconciler, UserConfig, UserReconciler,
};
use provider_mongo::{DatabaseBackend, Privilege, RoleBinding};
use provider_testkit::{MemoryBackend, Operation};

fn unprotected(database: &str, name: &str) -> CollectionConfig {
    let mut config = CollectionConfig::new(database, name);
    config.deletion_protection = false;
    config
}

#[tokio::test]
async fn collection_lifecycle_create_toggle_delete() {
    let backend = MemoryBackend::new();
    let reconciler = CollectionReconciler::new(&backend);

    // Create with the optional flag unset: read reports false
    let state = reconciler.create(unprotected("mydb", "mycoll")).await.unwrap();
    assert!(!state.config.change_stream_pre_and_post_images);

    // Toggle the flag via update: subsequent read reports true
    let mut desired = state.config.clone();
    desired.change_stream_pre_and_post_images = true;
    let updated = reconciler.update(&state, desired).await.unwrap();
    assert!(updated.config.change_stream_pre_and_post_images);

    let refreshed = reconciler.read(updated.clone()).await.unwrap();
    assert!(refreshed.config.change_stream_pre_and_post_images);

    // Delete, then a read signals the caller to drop the resource
    reconciler.delete(&refreshed).await.unwrap();
    let err = reconciler.read(refreshed).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn create_with_flag_applies_option_after_create() {
    let backend = MemoryBackend::new();
    let reconciler = CollectionReconciler::new(&backend);

    let mut config = unprotected("mydb", "events");
    config.change_stream_pre_and_post_images = true;

    let state = reconciler.create(config).await.unwrap();
    assert!(state.config.change_stream_pre_and_post_images);

    // Post-create option commands follow the create, in declared order
    let ops = backend.operations();
    assert_eq!(
        ops,
        vec![
            Operation::CreateCollection {
                db: "mydb".to_string(),
                name: "events".to_string(),
            },
            Operation::SetCollectionOption {
                db: "mydb".to_string(),
                name: "events".to_string(),
                option: provider_mongo::CollectionOption::ChangeStreamPrePostImages(true),
            },
        ]
    );
}

#[tokio::test]
async fn protected_delete_leaves_collection_intact() {
    let backend = MemoryBackend::new();
    let reconciler = CollectionReconciler::new(&backend);

    // Default config keeps deletion protection on
    let state = reconciler
        .create(CollectionConfig::new("mydb", "precious"))
        .await
        .unwrap();

    let before = backend.operations();
    let err = reconciler.delete(&state).await.unwrap_err();
    assert!(format!("{err}").contains("deletion protection"));
    assert_eq!(backend.operations(), before);

    // Still readable afterwards
    reconciler.read(state).await.unwrap();
}

#[tokio::test]
async fn role_and_user_share_a_database() {
    let backend = MemoryBackend::new();
    let roles = RoleReconciler::new(&backend);
    let users = UserReconciler::new(&backend);

    let role = roles
        .create(RoleConfig {
            database: "appdb".to_string(),
            name: "writer".to_string(),
            privileges: vec![Privilege {
                db: "appdb".to_string(),
                collection: "events".to_string(),
                actions: vec!["find".to_string(), "insert".to_string(), "update".to_string()],
            }],
            inherited_roles: Vec::new(),
        })
        .await
        .unwrap();

    let user = users
        .create(UserConfig {
            auth_database: "appdb".to_string(),
            name: "svc-writer".to_string(),
            password: "s3cret".to_string(),
            roles: vec![RoleBinding {
                db: "appdb".to_string(),
                role: "writer".to_string(),
            }],
        })
        .await
        .unwrap();

    assert_eq!(user.config.roles[0].role, "writer");

    // Grow the role's grants; the user is untouched
    let mut desired = role.config.clone();
    desired.inherited_roles.push(RoleBinding {
        db: "appdb".to_string(),
        role: "read".to_string(),
    });
    let role = roles.update(&role, desired).await.unwrap();
    assert_eq!(role.config.inherited_roles.len(), 1);

    users.delete(&user).await.unwrap();
    roles.delete(&role).await.unwrap();

    assert!(users.read(user).await.unwrap_err().is_not_found());
    assert!(roles.read(role).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn external_drift_is_overwritten_by_read() {
    let backend = MemoryBackend::new();
    let reconciler = CollectionReconciler::new(&backend);

    let state = reconciler.create(unprotected("mydb", "drifty")).await.unwrap();

    // Someone flips the option outside the provider
    backend
        .set_collection_option(
            "mydb",
            "drifty",
            provider_mongo::CollectionOption::ChangeStreamPrePostImages(true),
        )
        .await
        .unwrap();

    // Read copies the observed value into declared state
    let refreshed = reconciler.read(state).await.unwrap();
    assert!(refreshed.config.change_stream_pre_and_post_images);
}
