//! In-memory [`DatabaseBackend`] with an operation log

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use provider_mongo::{
    CollectionInfo, CollectionOption, DatabaseBackend, Privilege, Result, RoleBinding, RoleInfo,
    UserInfo,
};

/// A mutating call recorded by [`MemoryBackend`].
///
/// Read-only calls (`collection_info`, `role_info`, `user_info`) are not
/// logged; the log exists to verify what a reconcile operation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateCollection { db: String, name: String },
    DropCollection { db: String, name: String },
    SetCollectionOption { db: String, name: String, option: CollectionOption },
    CreateRole { db: String, name: String },
    UpdateRole { db: String, name: String },
    DropRole { db: String, name: String },
    CreateUser { db: String, name: String },
    UpdateUser { db: String, name: String, password: Option<String> },
    DropUser { db: String, name: String },
}

#[derive(Debug, Default)]
struct State {
    /// (db, collection) -> options metadata
    collections: BTreeMap<(String, String), Value>,
    /// (db, role) -> (privileges, inherited roles)
    roles: BTreeMap<(String, String), (Vec<Privilege>, Vec<RoleBinding>)>,
    /// (db, user) -> granted roles
    users: BTreeMap<(String, String), Vec<RoleBinding>>,
    log: Vec<Operation>,
}

/// In-memory stand-in for a MongoDB deployment.
///
/// Never fails: every backend call succeeds, so tests exercise the
/// reconcile logic rather than transport behavior.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pre-existing collection with default options (not logged)
    #[must_use]
    pub fn with_collection(self, db: &str, name: &str) -> Self {
        self.lock()
            .collections
            .insert(key(db, name), json!({}));
        self
    }

    /// Seed a pre-existing role (not logged)
    #[must_use]
    pub fn with_role(
        self,
        db: &str,
        name: &str,
        privileges: Vec<Privilege>,
        inherited_roles: Vec<RoleBinding>,
    ) -> Self {
        self.lock()
            .roles
            .insert(key(db, name), (privileges, inherited_roles));
        self
    }

    /// Seed a pre-existing user (not logged)
    #[must_use]
    pub fn with_user(self, db: &str, name: &str, roles: Vec<RoleBinding>) -> Self {
        self.lock().users.insert(key(db, name), roles);
        self
    }

    /// Snapshot of every mutating call made so far, in order
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().log.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("backend state lock poisoned")
    }
}

fn key(db: &str, name: &str) -> (String, String) {
    (db.to_string(), name.to_string())
}

#[async_trait]
impl DatabaseBackend for MemoryBackend {
    async fn create_collection(&self, db: &str, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.log.push(Operation::CreateCollection {
            db: db.to_string(),
            name: name.to_string(),
        });
        state.collections.insert(key(db, name), json!({}));
        Ok(())
    }

    async fn drop_collection(&self, db: &str, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.log.push(Operation::DropCollection {
            db: db.to_string(),
            name: name.to_string(),
        });
        state.collections.remove(&key(db, name));
        Ok(())
    }

    async fn collection_info(&self, db: &str, name: &str) -> Result<Option<CollectionInfo>> {
        let state = self.lock();
        Ok(state
            .collections
            .get(&key(db, name))
            .map(|options| CollectionInfo {
                name: name.to_string(),
                options: options.clone(),
            }))
    }

    async fn set_collection_option(
        &self,
        db: &str,
        name: &str,
        option: CollectionOption,
    ) -> Result<()> {
        let mut state = self.lock();
        state.log.push(Operation::SetCollectionOption {
            db: db.to_string(),
            name: name.to_string(),
            option,
        });
        if let Some(options) = state.collections.get_mut(&key(db, name)) {
            match option {
                CollectionOption::ChangeStreamPrePostImages(enabled) => {
                    options["changeStreamPreAndPostImages"] = json!({ "enabled": enabled });
                }
            }
        }
        Ok(())
    }

    async fn create_role(
        &self,
        db: &str,
        name: &str,
        privileges: &[Privilege],
        inherited_roles: &[RoleBinding],
    ) -> Result<()> {
        let mut state = self.lock();
        state.log.push(Operation::CreateRole {
            db: db.to_string(),
            name: name.to_string(),
        });
        state
            .roles
            .insert(key(db, name), (privileges.to_vec(), inherited_roles.to_vec()));
        Ok(())
    }

    async fn update_role(
        &self,
        db: &str,
        name: &str,
        privileges: &[Privilege],
        inherited_roles: &[RoleBinding],
    ) -> Result<()> {
        let mut state = self.lock();
        state.log.push(Operation::UpdateRole {
            db: db.to_string(),
            name: name.to_string(),
        });
        state
            .roles
            .insert(key(db, name), (privileges.to_vec(), inherited_roles.to_vec()));
        Ok(())
    }

    async fn drop_role(&self, db: &str, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.log.push(Operation::DropRole {
            db: db.to_string(),
            name: name.to_string(),
        });
        state.roles.remove(&key(db, name));
        Ok(())
    }

    async fn role_info(&self, db: &str, name: &str) -> Result<Option<RoleInfo>> {
        let state = self.lock();
        Ok(state
            .roles
            .get(&key(db, name))
            .map(|(privileges, inherited_roles)| RoleInfo {
                name: name.to_string(),
                database: db.to_string(),
                privileges: privileges.clone(),
                inherited_roles: inherited_roles.clone(),
            }))
    }

    async fn create_user(
        &self,
        db: &str,
        name: &str,
        _password: &str,
        roles: &[RoleBinding],
    ) -> Result<()> {
        let mut state = self.lock();
        state.log.push(Operation::CreateUser {
            db: db.to_string(),
            name: name.to_string(),
        });
        state.users.insert(key(db, name), roles.to_vec());
        Ok(())
    }

    async fn update_user(
        &self,
        db: &str,
        name: &str,
        password: Option<&str>,
        roles: &[RoleBinding],
    ) -> Result<()> {
        let mut state = self.lock();
        state.log.push(Operation::UpdateUser {
            db: db.to_string(),
            name: name.to_string(),
            password: password.map(str::to_string),
        });
        state.users.insert(key(db, name), roles.to_vec());
        Ok(())
    }

    async fn drop_user(&self, db: &str, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.log.push(Operation::DropUser {
            db: db.to_string(),
            name: name.to_string(),
        });
        state.users.remove(&key(db, name));
        Ok(())
    }

    async fn user_info(&self, db: &str, name: &str) -> Result<Option<UserInfo>> {
        let state = self.lock();
        Ok(state.users.get(&key(db, name)).map(|roles| UserInfo {
            name: name.to_string(),
            database: db.to_string(),
            roles: roles.clone(),
        }))
    }
}
