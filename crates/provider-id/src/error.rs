//! Error types for provider-id

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons an external id is malformed.
///
/// Every variant is fatal to the operation that triggered the decode;
/// malformed ids are surfaced to the caller and never retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The id is not valid base64
    #[error("id is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The decoded bytes are not valid UTF-8
    #[error("decoded id is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The decoded id does not split into the expected number of parts
    #[error("expected {expected} `.`-separated parts, found {found}")]
    PartCount { expected: usize, found: usize },

    /// A key part is empty
    #[error("key part {index} is empty")]
    EmptyPart { index: usize },

    /// A non-final key part contains the separator
    #[error("key part {index} contains the separator `.`")]
    SeparatorInPart { index: usize },

    /// A composite key needs at least two parts
    #[error("composite key needs at least 2 parts, got {found}")]
    TooFewParts { found: usize },
}
