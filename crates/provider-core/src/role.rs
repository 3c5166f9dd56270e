//! Reconciler for database roles
//!
//! A role is addressed by the composite key `[name, database]`, persisted
//! as `base64(name "." database)`. Note the order: the role name comes
//! first, matching the historical id format.

use provider_id::{CompositeKey, ExternalId};
use provider_mongo::{DatabaseBackend, Privilege, RoleBinding};

use crate::error::{Error, ResourceKind, Result};

const ID_PARTS: usize = 2;

/// Declared attributes of a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleConfig {
    /// Database the role is defined on (immutable)
    pub database: String,
    /// Role name (immutable)
    pub name: String,
    /// Privileges granted directly by this role
    pub privileges: Vec<Privilege>,
    /// Roles this role inherits from
    pub inherited_roles: Vec<RoleBinding>,
}

/// Tracked state of a role resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleState {
    pub id: ExternalId,
    pub config: RoleConfig,
}

/// Create/read/update/delete for role resources
pub struct RoleReconciler<'a> {
    backend: &'a dyn DatabaseBackend,
}

impl<'a> RoleReconciler<'a> {
    pub fn new(backend: &'a dyn DatabaseBackend) -> Self {
        Self { backend }
    }

    /// Create the role and return its tracked state.
    ///
    /// A role must grant something: at least one privilege or one
    /// inherited role.
    pub async fn create(&self, config: RoleConfig) -> Result<RoleState> {
        require(&config.database, "database")?;
        require(&config.name, "name")?;
        if config.privileges.is_empty() && config.inherited_roles.is_empty() {
            return Err(Error::MissingAttribute {
                kind: ResourceKind::Role,
                attribute: "privilege",
            });
        }
        // Refuse keys that cannot round-trip before touching the server
        let id = CompositeKey::new([&config.name, &config.database])?.encode();

        tracing::info!(database = %config.database, role = %config.name, "Creating role");
        self.backend
            .create_role(
                &config.database,
                &config.name,
                &config.privileges,
                &config.inherited_roles,
            )
            .await?;

        self.read(RoleState { id, config }).await
    }

    /// Refresh tracked state from the database.
    ///
    /// Privileges and inherited roles are replaced wholesale by the
    /// observed definition. Grants are sorted so that server-side
    /// ordering differences never register as drift.
    pub async fn read(&self, state: RoleState) -> Result<RoleState> {
        let (name, database) = decode_id(&state.id)?;

        let info = self
            .backend
            .role_info(&database, &name)
            .await?
            .ok_or_else(|| Error::NotFound {
                kind: ResourceKind::Role,
                name: name.clone(),
            })?;

        let mut privileges = info.privileges;
        privileges.sort();
        let mut inherited_roles = info.inherited_roles;
        inherited_roles.sort();

        Ok(RoleState {
            id: state.id,
            config: RoleConfig {
                database,
                name,
                privileges,
                inherited_roles,
            },
        })
    }

    /// Adopt an existing role from its literal external id
    pub async fn import(&self, id: ExternalId) -> Result<RoleState> {
        let (name, database) = decode_id(&id)?;
        let config = RoleConfig {
            database,
            name,
            privileges: Vec::new(),
            inherited_roles: Vec::new(),
        };
        self.read(RoleState { id, config }).await
    }

    /// Apply grant changes in place and return the refreshed state.
    ///
    /// Any difference in privileges or inherited roles is pushed as one
    /// `updateRole` command carrying the full desired definition. Name
    /// and database are immutable; see
    /// [`requires_replacement`](Self::requires_replacement).
    pub async fn update(&self, state: &RoleState, desired: RoleConfig) -> Result<RoleState> {
        let (name, database) = decode_id(&state.id)?;

        if grants_changed(&state.config, &desired) {
            self.backend
                .update_role(&database, &name, &desired.privileges, &desired.inherited_roles)
                .await?;
        }

        self.read(RoleState {
            id: state.id.clone(),
            config: desired,
        })
        .await
    }

    /// Drop the role
    pub async fn delete(&self, state: &RoleState) -> Result<()> {
        let (name, database) = decode_id(&state.id)?;
        tracing::info!(%database, role = %name, "Dropping role");
        self.backend.drop_role(&database, &name).await?;
        Ok(())
    }

    /// Whether a config change touches immutable identity fields
    pub fn requires_replacement(prior: &RoleConfig, desired: &RoleConfig) -> bool {
        prior.database != desired.database || prior.name != desired.name
    }
}

fn grants_changed(prior: &RoleConfig, desired: &RoleConfig) -> bool {
    let mut prior_privileges = prior.privileges.clone();
    prior_privileges.sort();
    let mut desired_privileges = desired.privileges.clone();
    desired_privileges.sort();

    let mut prior_inherited = prior.inherited_roles.clone();
    prior_inherited.sort();
    let mut desired_inherited = desired.inherited_roles.clone();
    desired_inherited.sort();

    prior_privileges != desired_privileges || prior_inherited != desired_inherited
}

fn decode_id(id: &ExternalId) -> Result<(String, String)> {
    let mut parts = CompositeKey::decode(id, ID_PARTS)?.into_parts().into_iter();
    // decode guarantees exactly ID_PARTS non-empty parts
    let name = parts.next().unwrap_or_default();
    let database = parts.next().unwrap_or_default();
    Ok((name, database))
}

fn require(value: &str, attribute: &'static str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::MissingAttribute {
            kind: ResourceKind::Role,
            attribute,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use provider_testkit::MemoryBackend;

    fn find_insert(db: &str, collection: &str) -> Privilege {
        Privilege {
            db: db.to_string(),
            collection: collection.to_string(),
            actions: vec!["find".to_string(), "insert".to_string()],
        }
    }

    #[tokio::test]
    async fn create_encodes_name_before_database() {
        let backend = MemoryBackend::new();
        let reconciler = RoleReconciler::new(&backend);

        let state = reconciler
            .create(RoleConfig {
                database: "appdb".to_string(),
                name: "reporting".to_string(),
                privileges: vec![find_insert("appdb", "events")],
                inherited_roles: Vec::new(),
            })
            .await
            .unwrap();

        let key = CompositeKey::decode(&state.id, 2).unwrap();
        assert_eq!(key.part(0), Some("reporting"));
        assert_eq!(key.part(1), Some("appdb"));
    }

    #[tokio::test]
    async fn create_requires_a_grant() {
        let backend = MemoryBackend::new();
        let reconciler = RoleReconciler::new(&backend);

        let err = reconciler
            .create(RoleConfig {
                database: "appdb".to_string(),
                name: "empty".to_string(),
                privileges: Vec::new(),
                inherited_roles: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingAttribute {
                attribute: "privilege",
                ..
            }
        ));
        assert!(backend.operations().is_empty());
    }

    #[tokio::test]
    async fn read_sorts_observed_grants() {
        let backend = MemoryBackend::new();
        let reconciler = RoleReconciler::new(&backend);

        let state = reconciler
            .create(RoleConfig {
                database: "appdb".to_string(),
                name: "reporting".to_string(),
                privileges: vec![find_insert("appdb", "zebra"), find_insert("appdb", "alpha")],
                inherited_roles: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(state.config.privileges[0].collection, "alpha");
        assert_eq!(state.config.privileges[1].collection, "zebra");
    }

    #[tokio::test]
    async fn reordered_grants_do_not_trigger_an_update() {
        let backend = MemoryBackend::new();
        let reconciler = RoleReconciler::new(&backend);

        let config = RoleConfig {
            database: "appdb".to_string(),
            name: "reporting".to_string(),
            privileges: vec![find_insert("appdb", "a"), find_insert("appdb", "b")],
            inherited_roles: Vec::new(),
        };
        let state = reconciler.create(config.clone()).await.unwrap();

        let mut reordered = config;
        reordered.privileges.reverse();

        let before = backend.operations().len();
        reconciler.update(&state, reordered).await.unwrap();
        assert_eq!(backend.operations().len(), before);
    }

    #[tokio::test]
    async fn update_replaces_grants_in_one_command() {
        let backend = MemoryBackend::new();
        let reconciler = RoleReconciler::new(&backend);

        let config = RoleConfig {
            database: "appdb".to_string(),
            name: "reporting".to_string(),
            privileges: vec![find_insert("appdb", "events")],
            inherited_roles: Vec::new(),
        };
        let state = reconciler.create(config.clone()).await.unwrap();

        let mut desired = config;
        desired.inherited_roles.push(RoleBinding {
            db: "appdb".to_string(),
            role: "read".to_string(),
        });

        let updated = reconciler.update(&state, desired).await.unwrap();
        assert_eq!(updated.config.inherited_roles.len(), 1);
        assert_eq!(updated.config.privileges.len(), 1);
    }

    #[tokio::test]
    async fn delete_then_read_is_not_found() {
        let backend = MemoryBackend::new();
        let reconciler = RoleReconciler::new(&backend);

        let state = reconciler
            .create(RoleConfig {
                database: "appdb".to_string(),
                name: "reporting".to_string(),
                privileges: vec![find_insert("appdb", "events")],
                inherited_roles: Vec::new(),
            })
            .await
            .unwrap();

        reconciler.delete(&state).await.unwrap();
        let err = reconciler.read(state).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
