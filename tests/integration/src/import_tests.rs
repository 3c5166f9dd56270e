//! Importing existing objects from literal external ids
//!
//! The id format is persisted state: users supply the exact
//! `base64(part1 "." part2)` literal, including ids minted by older
//! provider versions.

use pretty_assertions::assert_eq;
use provider_core::{CollectionReconciler, RoleReconciler, UserReconciler};
use provider_id::ExternalId;
use provider_mongo::RoleBinding;
use provider_testkit::MemoryBackend;

#[tokio::test]
async fn import_collection_from_literal_id() {
    let backend = MemoryBackend::new().with_collection("mydb", "mycoll");
    let reconciler = CollectionReconciler::new(&backend);

    // base64("mydb.mycoll")
    let state = reconciler
        .import(ExternalId::from("bXlkYi5teWNvbGw="))
        .await
        .unwrap();

    assert_eq!(state.config.database, "mydb");
    assert_eq!(state.config.name, "mycoll");
    // Imports start protected until the user says otherwise
    assert!(state.config.deletion_protection);
}

#[tokio::test]
async fn import_collection_with_dotted_name() {
    // Legacy ids concatenated the raw parts, so a dotted collection name
    // lives entirely in the final part.
    let backend = MemoryBackend::new().with_collection("mydb", "system.profile");
    let reconciler = CollectionReconciler::new(&backend);

    // base64("mydb.system.profile")
    let state = reconciler
        .import(ExternalId::from("bXlkYi5zeXN0ZW0ucHJvZmlsZQ=="))
        .await
        .unwrap();

    assert_eq!(state.config.database, "mydb");
    assert_eq!(state.config.name, "system.profile");
}

#[tokio::test]
async fn import_user_reads_roles_but_not_password() {
    let backend = MemoryBackend::new().with_user(
        "admin",
        "svc",
        vec![RoleBinding {
            db: "appdb".to_string(),
            role: "readWrite".to_string(),
        }],
    );
    let reconciler = UserReconciler::new(&backend);

    // base64("svc.admin")
    let state = reconciler
        .import(ExternalId::from("c3ZjLmFkbWlu"))
        .await
        .unwrap();

    assert_eq!(state.config.name, "svc");
    assert_eq!(state.config.auth_database, "admin");
    assert_eq!(state.config.roles.len(), 1);
    assert_eq!(state.config.password, "");
}

#[tokio::test]
async fn import_absent_object_fails_with_not_found() {
    let backend = MemoryBackend::new();
    let reconciler = RoleReconciler::new(&backend);

    // base64("ghost.appdb")
    let err = reconciler
        .import(ExternalId::from("Z2hvc3QuYXBwZGI="))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn import_garbage_id_is_malformed() {
    let backend = MemoryBackend::new();
    let reconciler = CollectionReconciler::new(&backend);

    let err = reconciler
        .import(ExternalId::from("this is not base64"))
        .await
        .unwrap_err();
    assert!(format!("{err}").contains("malformed resource id"));
}
