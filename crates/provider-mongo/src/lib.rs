//! MongoDB administrative backend for the declarative provider.
//!
//! This crate is the seam between the reconcilers and the database: it
//! defines the [`DatabaseBackend`] trait the reconcilers program against,
//! the snapshot types they read observed state from, and the
//! [`MongoBackend`] implementation that issues the actual administrative
//! commands over the wire.
//!
//! The backend interprets only two things from command replies: whether
//! the addressed object exists, and the values of named options/grants.
//! Everything else in the reply is ignored.

pub mod backend;
pub mod config;
pub mod error;
pub mod mongo;

pub use backend::{
    CollectionInfo, CollectionOption, DatabaseBackend, Privilege, RoleBinding, RoleInfo, UserInfo,
};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use mongo::MongoBackend;
