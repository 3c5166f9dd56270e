//! Reconciler for database collections
//!
//! A collection is addressed by the composite key `[database, name]`,
//! persisted as `base64(database "." name)`.

use provider_id::{CompositeKey, ExternalId};
use provider_mongo::{CollectionOption, DatabaseBackend};

use crate::drift;
use crate::error::{Error, ResourceKind, Result};

const ID_PARTS: usize = 2;
const CHANGE_STREAM_FLAG: &str = "changeStreamPreAndPostImages.enabled";

/// Declared attributes of a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Database the collection lives in (immutable)
    pub database: String,
    /// Collection name (immutable)
    pub name: String,
    /// Client-side guard: when set, delete refuses to run.
    /// Never sent to the server and never observable from it.
    pub deletion_protection: bool,
    /// Whether change streams record pre- and post-images
    pub change_stream_pre_and_post_images: bool,
}

impl CollectionConfig {
    /// Config with defaults: protection on, optional flags off
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            deletion_protection: true,
            change_stream_pre_and_post_images: false,
        }
    }
}

/// Tracked state of a collection resource: the persisted external id
/// plus the last-known attribute values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionState {
    pub id: ExternalId,
    pub config: CollectionConfig,
}

/// Create/read/update/delete for collection resources.
///
/// Every operation is a single sequential chain of backend calls with no
/// intermediate states. When a later sub-step fails, earlier successful
/// sub-steps stay applied; there is no rollback.
pub struct CollectionReconciler<'a> {
    backend: &'a dyn DatabaseBackend,
}

impl<'a> CollectionReconciler<'a> {
    pub fn new(backend: &'a dyn DatabaseBackend) -> Self {
        Self { backend }
    }

    /// Create the collection and return its tracked state.
    ///
    /// Issues the create command, then any post-create option commands in
    /// declared order, computes the external id, and finishes with a
    /// [`read`](Self::read) so the state reflects what the server reports.
    pub async fn create(&self, config: CollectionConfig) -> Result<CollectionState> {
        require(&config.database, ResourceKind::Collection, "database")?;
        require(&config.name, ResourceKind::Collection, "name")?;
        // Refuse keys that cannot round-trip before touching the server
        let id = CompositeKey::new([&config.database, &config.name])?.encode();

        tracing::info!(
            database = %config.database,
            collection = %config.name,
            "Creating collection"
        );
        self.backend
            .create_collection(&config.database, &config.name)
            .await?;

        if config.change_stream_pre_and_post_images {
            self.backend
                .set_collection_option(
                    &config.database,
                    &config.name,
                    CollectionOption::ChangeStreamPrePostImages(true),
                )
                .await?;
        }

        self.read(CollectionState { id, config }).await
    }

    /// Refresh tracked state from the database.
    ///
    /// The external id is authoritative for identity; observed option
    /// values overwrite the declared copies. The protection flag is
    /// client-side only and carries over from the prior state.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the collection no longer exists; the
    /// caller drops the resource from tracked state in response.
    pub async fn read(&self, state: CollectionState) -> Result<CollectionState> {
        let (database, name) = decode_id(&state.id)?;

        let info = self
            .backend
            .collection_info(&database, &name)
            .await?
            .ok_or_else(|| Error::NotFound {
                kind: ResourceKind::Collection,
                name: format!("{database}.{name}"),
            })?;

        let change_stream = drift::nested_flag(&info.options, CHANGE_STREAM_FLAG);
        Ok(CollectionState {
            id: state.id,
            config: CollectionConfig {
                database,
                name,
                deletion_protection: state.config.deletion_protection,
                change_stream_pre_and_post_images: change_stream,
            },
        })
    }

    /// Adopt an existing collection from its literal external id.
    ///
    /// Imported resources start with deletion protection on.
    pub async fn import(&self, id: ExternalId) -> Result<CollectionState> {
        let (database, name) = decode_id(&id)?;
        let config = CollectionConfig::new(database, name);
        self.read(CollectionState { id, config }).await
    }

    /// Apply in-place attribute changes and return the refreshed state.
    ///
    /// Identity fields are taken from the decoded id, never from
    /// `desired`; callers must check
    /// [`requires_replacement`](Self::requires_replacement) first and
    /// replace the resource when it returns true. Option changes are
    /// applied in declared order.
    pub async fn update(
        &self,
        state: &CollectionState,
        desired: CollectionConfig,
    ) -> Result<CollectionState> {
        let (database, name) = decode_id(&state.id)?;

        if desired.change_stream_pre_and_post_images
            != state.config.change_stream_pre_and_post_images
        {
            self.backend
                .set_collection_option(
                    &database,
                    &name,
                    CollectionOption::ChangeStreamPrePostImages(
                        desired.change_stream_pre_and_post_images,
                    ),
                )
                .await?;
        }

        self.read(CollectionState {
            id: state.id.clone(),
            config: desired,
        })
        .await
    }

    /// Drop the collection.
    ///
    /// # Errors
    ///
    /// [`Error::DeletionProtected`] when the protection flag is set; in
    /// that case no backend call is made at all.
    pub async fn delete(&self, state: &CollectionState) -> Result<()> {
        if state.config.deletion_protection {
            return Err(Error::DeletionProtected {
                kind: ResourceKind::Collection,
                name: state.config.name.clone(),
            });
        }

        let (database, name) = decode_id(&state.id)?;
        tracing::info!(%database, collection = %name, "Dropping collection");
        self.backend.drop_collection(&database, &name).await?;
        Ok(())
    }

    /// Whether a config change touches immutable identity fields.
    ///
    /// The surrounding framework reacts by replacing the resource
    /// instead of updating in place.
    pub fn requires_replacement(prior: &CollectionConfig, desired: &CollectionConfig) -> bool {
        prior.database != desired.database || prior.name != desired.name
    }
}

fn decode_id(id: &ExternalId) -> Result<(String, String)> {
    let mut parts = CompositeKey::decode(id, ID_PARTS)?.into_parts().into_iter();
    // decode guarantees exactly ID_PARTS non-empty parts
    let database = parts.next().unwrap_or_default();
    let name = parts.next().unwrap_or_default();
    Ok((database, name))
}

fn require(value: &str, kind: ResourceKind, attribute: &'static str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::MissingAttribute { kind, attribute });
    }
    Ok(())
}
