//! Error types for provider-core

use std::fmt;

/// Result type for provider-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// The resource types this provider manages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Collection,
    Role,
    User,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Collection => "collection",
            Self::Role => "role",
            Self::User => "user",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while reconciling resources.
///
/// The set is closed: every failure mode an operation can surface is one
/// of these variants. All errors propagate immediately; there are no
/// retries, and sub-steps that succeeded before a failure stay applied.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The persisted external id could not be decoded
    #[error("malformed resource id: {0}")]
    MalformedId(#[from] provider_id::Error),

    /// Backend failure: connection lost, command rejected, bad reply
    #[error(transparent)]
    Backend(#[from] provider_mongo::Error),

    /// The object is absent from the database.
    ///
    /// Not a failure of the reconcile core: the caller reacts by removing
    /// the resource from tracked state.
    #[error("{kind} {name} not found")]
    NotFound { kind: ResourceKind, name: String },

    /// Delete was attempted while the protection flag is set.
    ///
    /// No mutation has been performed; the user must clear the flag to
    /// proceed.
    #[error("cannot delete {kind} {name}: deletion protection is enabled")]
    DeletionProtected { kind: ResourceKind, name: String },

    /// A required attribute is empty or missing at create time
    #[error("{kind} is missing required attribute {attribute}")]
    MissingAttribute {
        kind: ResourceKind,
        attribute: &'static str,
    },
}

impl Error {
    /// Whether this error signals "object absent, drop it from state"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_the_resource() {
        let err = Error::NotFound {
            kind: ResourceKind::Collection,
            name: "mydb.mycoll".to_string(),
        };
        assert_eq!(format!("{err}"), "collection mydb.mycoll not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn protected_delete_display_mentions_protection() {
        let err = Error::DeletionProtected {
            kind: ResourceKind::Collection,
            name: "mycoll".to_string(),
        };
        assert!(format!("{err}").contains("deletion protection"));
        assert!(!err.is_not_found());
    }
}
