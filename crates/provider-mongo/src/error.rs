//! Error types for provider-mongo

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the database backend.
///
/// All variants are fatal to the operation in progress; the backend
/// performs no retries and no partial-failure recovery.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server could not be reached or refused the handshake
    #[error("failed to connect to {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: mongodb::error::Error,
    },

    /// Driver-level error while issuing a command
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),

    /// A command reply did not have the expected shape
    #[error("unexpected reply from {command}: {message}")]
    Reply { command: String, message: String },
}

impl Error {
    pub(crate) fn reply(command: &str, message: impl Into<String>) -> Self {
        Self::Reply {
            command: command.to_string(),
            message: message.into(),
        }
    }
}
