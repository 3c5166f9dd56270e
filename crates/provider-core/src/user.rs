//! Reconciler for database users
//!
//! A user is addressed by the composite key `[name, auth_database]`,
//! persisted as `base64(name "." auth_database)`.

use provider_id::{CompositeKey, ExternalId};
use provider_mongo::{DatabaseBackend, RoleBinding};

use crate::error::{Error, ResourceKind, Result};

const ID_PARTS: usize = 2;

/// Declared attributes of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserConfig {
    /// Database the user authenticates against (immutable)
    pub auth_database: String,
    /// User name (immutable)
    pub name: String,
    /// Password. Write-only: the server never reports it back, so reads
    /// carry the declared value forward unchanged.
    pub password: String,
    /// Roles granted to the user
    pub roles: Vec<RoleBinding>,
}

/// Tracked state of a user resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserState {
    pub id: ExternalId,
    pub config: UserConfig,
}

/// Create/read/update/delete for user resources
pub struct UserReconciler<'a> {
    backend: &'a dyn DatabaseBackend,
}

impl<'a> UserReconciler<'a> {
    pub fn new(backend: &'a dyn DatabaseBackend) -> Self {
        Self { backend }
    }

    /// Create the user and return its tracked state
    pub async fn create(&self, config: UserConfig) -> Result<UserState> {
        require(&config.auth_database, "auth_database")?;
        require(&config.name, "name")?;
        require(&config.password, "password")?;
        // Refuse keys that cannot round-trip before touching the server
        let id = CompositeKey::new([&config.name, &config.auth_database])?.encode();

        tracing::info!(
            auth_database = %config.auth_database,
            user = %config.name,
            "Creating user"
        );
        self.backend
            .create_user(
                &config.auth_database,
                &config.name,
                &config.password,
                &config.roles,
            )
            .await?;

        self.read(UserState { id, config }).await
    }

    /// Refresh tracked state from the database.
    ///
    /// Observed roles replace the declared list (sorted for stable
    /// comparison); the password is not observable and carries over.
    pub async fn read(&self, state: UserState) -> Result<UserState> {
        let (name, auth_database) = decode_id(&state.id)?;

        let info = self
            .backend
            .user_info(&auth_database, &name)
            .await?
            .ok_or_else(|| Error::NotFound {
                kind: ResourceKind::User,
                name: name.clone(),
            })?;

        let mut roles = info.roles;
        roles.sort();

        Ok(UserState {
            id: state.id,
            config: UserConfig {
                auth_database,
                name,
                password: state.config.password,
                roles,
            },
        })
    }

    /// Adopt an existing user from its literal external id.
    ///
    /// The password cannot be recovered from the server; imports leave it
    /// empty and the caller declares it on the next apply.
    pub async fn import(&self, id: ExternalId) -> Result<UserState> {
        let (name, auth_database) = decode_id(&id)?;
        let config = UserConfig {
            auth_database,
            name,
            password: String::new(),
            roles: Vec::new(),
        };
        self.read(UserState { id, config }).await
    }

    /// Apply password/role changes in place and return refreshed state.
    ///
    /// Both changes ride one `updateUser` command; the password is only
    /// included when it actually changed. Name and auth database are
    /// immutable; see [`requires_replacement`](Self::requires_replacement).
    pub async fn update(&self, state: &UserState, desired: UserConfig) -> Result<UserState> {
        let (name, auth_database) = decode_id(&state.id)?;

        let password_changed = desired.password != state.config.password;
        if password_changed || roles_changed(&state.config, &desired) {
            let password = password_changed.then_some(desired.password.as_str());
            self.backend
                .update_user(&auth_database, &name, password, &desired.roles)
                .await?;
        }

        self.read(UserState {
            id: state.id.clone(),
            config: desired,
        })
        .await
    }

    /// Drop the user
    pub async fn delete(&self, state: &UserState) -> Result<()> {
        let (name, auth_database) = decode_id(&state.id)?;
        tracing::info!(%auth_database, user = %name, "Dropping user");
        self.backend.drop_user(&auth_database, &name).await?;
        Ok(())
    }

    /// Whether a config change touches immutable identity fields
    pub fn requires_replacement(prior: &UserConfig, desired: &UserConfig) -> bool {
        prior.auth_database != desired.auth_database || prior.name != desired.name
    }
}

fn roles_changed(prior: &UserConfig, desired: &UserConfig) -> bool {
    let mut prior_roles = prior.roles.clone();
    prior_roles.sort();
    let mut desired_roles = desired.roles.clone();
    desired_roles.sort();
    prior_roles != desired_roles
}

fn decode_id(id: &ExternalId) -> Result<(String, String)> {
    let mut parts = CompositeKey::decode(id, ID_PARTS)?.into_parts().into_iter();
    // decode guarantees exactly ID_PARTS non-empty parts
    let name = parts.next().unwrap_or_default();
    let auth_database = parts.next().unwrap_or_default();
    Ok((name, auth_database))
}

fn require(value: &str, attribute: &'static str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::MissingAttribute {
            kind: ResourceKind::User,
            attribute,
        });
    }
    Ok(())
}
