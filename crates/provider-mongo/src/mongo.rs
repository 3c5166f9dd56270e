//! Wire implementation of [`DatabaseBackend`] over the MongoDB driver

use async_trait::async_trait;
use mongodb::Client;
use mongodb::bson::{self, Bson, Document, doc};
use serde::Deserialize;

use crate::backend::{
    CollectionInfo, CollectionOption, DatabaseBackend, Privilege, RoleBinding, RoleInfo, UserInfo,
};
use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Administrative backend speaking to a live MongoDB deployment.
///
/// Holds a driver client handle; cloning is cheap and shares the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct MongoBackend {
    client: Client,
}

impl MongoBackend {
    /// Connect to the server described by `config` and verify the
    /// connection with a `ping`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the URI is rejected or the
    /// server does not answer the ping.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let endpoint = config.endpoint();
        tracing::debug!(%endpoint, "Connecting to MongoDB");

        let client = Client::with_uri_str(config.connection_uri())
            .await
            .map_err(|source| Error::Connection {
                endpoint: endpoint.clone(),
                source,
            })?;

        client
            .database(&config.auth_database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| Error::Connection { endpoint, source })?;

        Ok(Self { client })
    }

    /// Wrap an already-built driver client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn run_command(&self, db: &str, command: Document) -> Result<Document> {
        Ok(self.client.database(db).run_command(command).await?)
    }
}

#[async_trait]
impl DatabaseBackend for MongoBackend {
    async fn create_collection(&self, db: &str, name: &str) -> Result<()> {
        tracing::debug!(db, collection = name, "Creating collection");
        self.client.database(db).create_collection(name).await?;
        Ok(())
    }

    async fn drop_collection(&self, db: &str, name: &str) -> Result<()> {
        tracing::debug!(db, collection = name, "Dropping collection");
        self.client
            .database(db)
            .collection::<Document>(name)
            .drop()
            .await?;
        Ok(())
    }

    async fn collection_info(&self, db: &str, name: &str) -> Result<Option<CollectionInfo>> {
        let reply = self
            .run_command(
                db,
                doc! {
                    "listCollections": 1,
                    "filter": { "name": name },
                },
            )
            .await?;

        let Some(entry) = first_batch_entry(&reply, "listCollections")? else {
            return Ok(None);
        };

        let options = entry.get_document("options").cloned().unwrap_or_default();
        let options = serde_json::to_value(&options)
            .map_err(|e| Error::reply("listCollections", e.to_string()))?;

        Ok(Some(CollectionInfo {
            name: name.to_string(),
            options,
        }))
    }

    async fn set_collection_option(
        &self,
        db: &str,
        name: &str,
        option: CollectionOption,
    ) -> Result<()> {
        tracing::debug!(db, collection = name, ?option, "Applying collMod");
        let command = match option {
            CollectionOption::ChangeStreamPrePostImages(enabled) => doc! {
                "collMod": name,
                "changeStreamPreAndPostImages": { "enabled": enabled },
            },
        };
        self.run_command(db, command).await?;
        Ok(())
    }

    async fn create_role(
        &self,
        db: &str,
        name: &str,
        privileges: &[Privilege],
        inherited_roles: &[RoleBinding],
    ) -> Result<()> {
        tracing::debug!(db, role = name, "Creating role");
        self.run_command(
            db,
            doc! {
                "createRole": name,
                "privileges": privileges_to_bson(privileges),
                "roles": bindings_to_bson(inherited_roles),
            },
        )
        .await?;
        Ok(())
    }

    async fn update_role(
        &self,
        db: &str,
        name: &str,
        privileges: &[Privilege],
        inherited_roles: &[RoleBinding],
    ) -> Result<()> {
        tracing::debug!(db, role = name, "Updating role");
        self.run_command(
            db,
            doc! {
                "updateRole": name,
                "privileges": privileges_to_bson(privileges),
                "roles": bindings_to_bson(inherited_roles),
            },
        )
        .await?;
        Ok(())
    }

    async fn drop_role(&self, db: &str, name: &str) -> Result<()> {
        tracing::debug!(db, role = name, "Dropping role");
        self.run_command(db, doc! { "dropRole": name }).await?;
        Ok(())
    }

    async fn role_info(&self, db: &str, name: &str) -> Result<Option<RoleInfo>> {
        let reply = self
            .run_command(
                db,
                doc! {
                    "rolesInfo": name,
                    "showPrivileges": true,
                    "showBuiltinRoles": false,
                },
            )
            .await?;

        let parsed: RolesReply = bson::from_document(reply)
            .map_err(|e| Error::reply("rolesInfo", e.to_string()))?;

        Ok(parsed.roles.into_iter().next().map(|role| RoleInfo {
            name: role.role,
            database: role.db,
            privileges: role.privileges.into_iter().map(Privilege::from).collect(),
            inherited_roles: role.roles,
        }))
    }

    async fn create_user(
        &self,
        db: &str,
        name: &str,
        password: &str,
        roles: &[RoleBinding],
    ) -> Result<()> {
        tracing::debug!(db, user = name, "Creating user");
        self.run_command(
            db,
            doc! {
                "createUser": name,
                "pwd": password,
                "roles": bindings_to_bson(roles),
            },
        )
        .await?;
        Ok(())
    }

    async fn update_user(
        &self,
        db: &str,
        name: &str,
        password: Option<&str>,
        roles: &[RoleBinding],
    ) -> Result<()> {
        tracing::debug!(db, user = name, "Updating user");
        let mut command = doc! { "updateUser": name };
        if let Some(password) = password {
            command.insert("pwd", password);
        }
        command.insert("roles", bindings_to_bson(roles));
        self.run_command(db, command).await?;
        Ok(())
    }

    async fn drop_user(&self, db: &str, name: &str) -> Result<()> {
        tracing::debug!(db, user = name, "Dropping user");
        self.run_command(db, doc! { "dropUser": name }).await?;
        Ok(())
    }

    async fn user_info(&self, db: &str, name: &str) -> Result<Option<UserInfo>> {
        let reply = self.run_command(db, doc! { "usersInfo": name }).await?;

        let parsed: UsersReply = bson::from_document(reply)
            .map_err(|e| Error::reply("usersInfo", e.to_string()))?;

        Ok(parsed.users.into_iter().next().map(|user| UserInfo {
            name: user.user,
            database: user.db,
            roles: user.roles,
        }))
    }
}

/// Pull the first document out of a cursor-shaped command reply.
fn first_batch_entry(reply: &Document, command: &str) -> Result<Option<Document>> {
    let cursor = reply
        .get_document("cursor")
        .map_err(|e| Error::reply(command, e.to_string()))?;
    let batch = cursor
        .get_array("firstBatch")
        .map_err(|e| Error::reply(command, e.to_string()))?;

    match batch.first() {
        Some(Bson::Document(entry)) => Ok(Some(entry.clone())),
        Some(_) => Err(Error::reply(command, "first batch entry is not a document")),
        None => Ok(None),
    }
}

fn privileges_to_bson(privileges: &[Privilege]) -> Vec<Document> {
    privileges
        .iter()
        .map(|p| {
            doc! {
                "resource": { "db": p.db.as_str(), "collection": p.collection.as_str() },
                "actions": p.actions.clone(),
            }
        })
        .collect()
}

fn bindings_to_bson(roles: &[RoleBinding]) -> Vec<Document> {
    roles
        .iter()
        .map(|r| doc! { "role": r.role.as_str(), "db": r.db.as_str() })
        .collect()
}

// Wire shapes for the rolesInfo / usersInfo replies. Unknown fields
// (isBuiltin, inheritedRoles, ok, ...) are ignored.

#[derive(Debug, Deserialize)]
struct RolesReply {
    #[serde(default)]
    roles: Vec<RoleDoc>,
}

#[derive(Debug, Deserialize)]
struct RoleDoc {
    role: String,
    db: String,
    /// Directly granted roles, not the transitively inherited set
    #[serde(default)]
    roles: Vec<RoleBinding>,
    #[serde(default)]
    privileges: Vec<PrivilegeDoc>,
}

#[derive(Debug, Deserialize)]
struct PrivilegeDoc {
    resource: ResourceDoc,
    #[serde(default)]
    actions: Vec<String>,
}

/// Privilege resource; cluster-scoped resources leave db/collection empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResourceDoc {
    db: String,
    collection: String,
}

impl From<PrivilegeDoc> for Privilege {
    fn from(doc: PrivilegeDoc) -> Self {
        Self {
            db: doc.resource.db,
            collection: doc.resource.collection,
            actions: doc.actions,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsersReply {
    #[serde(default)]
    users: Vec<UserDoc>,
}

#[derive(Debug, Deserialize)]
struct UserDoc {
    user: String,
    db: String,
    #[serde(default)]
    roles: Vec<RoleBinding>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_batch_entry_empty_batch_is_none() {
        let reply = doc! { "cursor": { "firstBatch": [] }, "ok": 1 };
        assert_eq!(first_batch_entry(&reply, "listCollections").unwrap(), None);
    }

    #[test]
    fn first_batch_entry_returns_first_document() {
        let reply = doc! {
            "cursor": { "firstBatch": [ { "name": "mycoll" } ] },
            "ok": 1,
        };
        let entry = first_batch_entry(&reply, "listCollections").unwrap().unwrap();
        assert_eq!(entry.get_str("name").unwrap(), "mycoll");
    }

    #[test]
    fn first_batch_entry_rejects_missing_cursor() {
        let reply = doc! { "ok": 1 };
        let err = first_batch_entry(&reply, "listCollections").unwrap_err();
        assert!(matches!(err, Error::Reply { .. }));
    }

    #[test]
    fn roles_reply_parses_privileges_and_grants() {
        let reply = doc! {
            "roles": [ {
                "role": "reporting",
                "db": "analytics",
                "isBuiltin": false,
                "roles": [ { "role": "read", "db": "analytics" } ],
                "privileges": [ {
                    "resource": { "db": "analytics", "collection": "events" },
                    "actions": [ "find", "insert" ],
                } ],
            } ],
            "ok": 1,
        };

        let parsed: RolesReply = bson::from_document(reply).unwrap();
        assert_eq!(parsed.roles.len(), 1);
        let role = &parsed.roles[0];
        assert_eq!(role.role, "reporting");
        assert_eq!(role.roles.len(), 1);
        assert_eq!(role.privileges[0].resource.collection, "events");
        assert_eq!(role.privileges[0].actions, vec!["find", "insert"]);
    }

    #[test]
    fn users_reply_tolerates_missing_roles() {
        let reply = doc! {
            "users": [ { "user": "svc", "db": "admin" } ],
            "ok": 1,
        };
        let parsed: UsersReply = bson::from_document(reply).unwrap();
        assert_eq!(parsed.users[0].user, "svc");
        assert!(parsed.users[0].roles.is_empty());
    }
}
