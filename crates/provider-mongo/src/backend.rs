//! Backend trait for administrative database operations
//!
//! Reconcilers program against [`DatabaseBackend`] so that tests can
//! substitute an in-memory implementation for the wire client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A role granted on a database, as declared on users and as inherited
/// by roles. Field names match the MongoDB wire format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleBinding {
    pub db: String,
    pub role: String,
}

/// A privilege granted by a role: a set of actions on one resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Privilege {
    pub db: String,
    pub collection: String,
    pub actions: Vec<String>,
}

/// Observed metadata for a collection.
///
/// `options` carries the raw option document from `listCollections`;
/// callers extract the named flags they care about and ignore the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    pub options: serde_json::Value,
}

/// Observed definition of a role
#[derive(Debug, Clone, PartialEq)]
pub struct RoleInfo {
    pub name: String,
    pub database: String,
    pub privileges: Vec<Privilege>,
    pub inherited_roles: Vec<RoleBinding>,
}

/// Observed definition of a user. Passwords are never observable.
#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub name: String,
    pub database: String,
    pub roles: Vec<RoleBinding>,
}

/// A post-create collection option, applied via `collMod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionOption {
    /// Toggle `changeStreamPreAndPostImages.enabled`
    ChangeStreamPrePostImages(bool),
}

/// Administrative operations the reconcilers need from the database.
///
/// Every method is a single synchronous round trip from the caller's
/// point of view: no retries, no internal queuing. Cross-resource
/// consistency is not this trait's concern.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    // Collections

    async fn create_collection(&self, db: &str, name: &str) -> Result<()>;

    async fn drop_collection(&self, db: &str, name: &str) -> Result<()>;

    /// Fetch collection metadata; `None` means the collection is absent.
    async fn collection_info(&self, db: &str, name: &str) -> Result<Option<CollectionInfo>>;

    async fn set_collection_option(
        &self,
        db: &str,
        name: &str,
        option: CollectionOption,
    ) -> Result<()>;

    // Roles

    async fn create_role(
        &self,
        db: &str,
        name: &str,
        privileges: &[Privilege],
        inherited_roles: &[RoleBinding],
    ) -> Result<()>;

    /// Replace a role's grants with the given definition.
    async fn update_role(
        &self,
        db: &str,
        name: &str,
        privileges: &[Privilege],
        inherited_roles: &[RoleBinding],
    ) -> Result<()>;

    async fn drop_role(&self, db: &str, name: &str) -> Result<()>;

    /// Fetch a role definition; `None` means the role is absent.
    async fn role_info(&self, db: &str, name: &str) -> Result<Option<RoleInfo>>;

    // Users

    async fn create_user(
        &self,
        db: &str,
        name: &str,
        password: &str,
        roles: &[RoleBinding],
    ) -> Result<()>;

    /// Update a user's roles and, when given, the password.
    async fn update_user(
        &self,
        db: &str,
        name: &str,
        password: Option<&str>,
        roles: &[RoleBinding],
    ) -> Result<()>;

    async fn drop_user(&self, db: &str, name: &str) -> Result<()>;

    /// Fetch a user definition; `None` means the user is absent.
    async fn user_info(&self, db: &str, name: &str) -> Result<Option<UserInfo>>;
}
