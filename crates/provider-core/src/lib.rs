//! Drift detection and resource reconcilers for the MongoDB provider.
//!
//! This crate is the orchestration layer between the declarative-state
//! framework and the database backend:
//!
//! - **Identity**: each resource's composite key is encoded into an opaque
//!   external id (via `provider-id`) on create and decoded back on
//!   read/update/delete/import.
//! - **Drift**: read operations fetch live object state and overwrite the
//!   declared copy with observed truth; an absent object surfaces as
//!   [`Error::NotFound`] so the framework can drop the resource.
//! - **Reconcilers**: one per resource type (collection, role, user), each
//!   a thin state machine over the [`DatabaseBackend`] seam with no
//!   intermediate states and no rollback.
//!
//! # Architecture
//!
//! ```text
//!   declarative-state framework
//!              |
//!        provider-core
//!         |         |
//!   provider-id  provider-mongo
//! ```
//!
//! [`DatabaseBackend`]: provider_mongo::DatabaseBackend

pub mod collection;
pub mod drift;
pub mod error;
pub mod role;
pub mod user;

pub use collection::{CollectionConfig, CollectionReconciler, CollectionState};
pub use error::{Error, ResourceKind, Result};
pub use role::{RoleConfig, RoleReconciler, RoleState};
pub use user::{UserConfig, UserReconciler, UserState};
