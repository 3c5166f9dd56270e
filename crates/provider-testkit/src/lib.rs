//! Shared test backend for the provider workspace.
//!
//! This crate provides [`MemoryBackend`], an in-memory implementation of
//! [`DatabaseBackend`](provider_mongo::DatabaseBackend) used by the crate
//! test suites and the integration tests. It is a dev-dependency only —
//! never published.
//!
//! Besides storing objects, the backend keeps an append-only log of every
//! mutating call so tests can assert exact command sequences — in
//! particular that a protected delete performed zero mutations.

pub mod memory;

pub use memory::{MemoryBackend, Operation};
