//! Error types for Engram
//!
//! Every failure in the memory substrate is local and non-fatal: callers get
//! a value of this enum back and decide what to do with it.

use thiserror::Error;

/// The main error type for Engram operations
#[derive(Error, Debug)]
pub enum Error {
    // ========== Not Found ==========
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Relation not found: {0}")]
    RelationNotFound(String),

    #[error("Episode not found: {0}")]
    EpisodeNotFound(String),

    // ========== Invalid Argument ==========
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid temporal range: {0}")]
    InvalidTemporalRange(String),

    // ========== Serialization Errors ==========
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ========== Collaborator Errors ==========
    #[error("Knowledge extraction failed: {0}")]
    Extraction(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Engram operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if the error reports a lookup against an absent id
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::EntityNotFound(_) | Error::RelationNotFound(_) | Error::EpisodeNotFound(_)
        )
    }

    /// Returns true if the caller passed a malformed argument
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument(_) | Error::InvalidTemporalRange(_)
        )
    }

    /// Returns true if the caller can continue using the store after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Internal(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
