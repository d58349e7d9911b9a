//! Error types for the REST client.

use thiserror::Error;

/// Result type for client setup.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors building a client. Faults of individual calls are reported as
/// [`docstore_core::StoreError`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// No usable credentials were found.
    #[error("credentials not found: {0}")]
    Credentials(String),

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Creates a credentials error.
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials(message.into())
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
