//! Common error types used throughout voxlink.
//!
//! Every variant is recoverable at the request boundary; none of them is
//! meant to terminate the process.

/// Common error type for voxlink.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entry was not found.
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// The caller has no valid session.
    #[error("Unauthorized")]
    Unauthorized,

    /// The catalog could not be loaded or normalized.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// An outbound retrieval failed.
    #[error("Playback unavailable: {0}")]
    Fetch(String),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Catalog error.
    pub fn catalog<S: Into<String>>(msg: S) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create a new Fetch error.
    pub fn fetch<S: Into<String>>(msg: S) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
