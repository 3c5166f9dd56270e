//! Composite-key codec for external resource identifiers.
//!
//! Declarative resources are addressed by a tuple of identifying fields
//! (for example database + collection name). The orchestration framework
//! persists a single opaque string per resource, so this crate provides a
//! reversible encoding between the two:
//!
//! ```text
//! ExternalId = base64( part1 "." part2 [ "." part3 ... ] )
//! ```
//!
//! The format is persisted state and must remain stable across versions;
//! users performing an import supply this exact literal string.
//!
//! # Example
//!
//! ```
//! use provider_id::{CompositeKey, ExternalId};
//!
//! let key = CompositeKey::new(["mydb", "mycoll"])?;
//! let id = key.encode();
//! assert_eq!(CompositeKey::decode(&id, 2)?, key);
//! # Ok::<(), provider_id::Error>(())
//! ```

pub mod error;
pub mod key;

pub use error::{Error, Result};
pub use key::{CompositeKey, ExternalId, SEPARATOR};
