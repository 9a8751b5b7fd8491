//! Error taxonomy for Gato POS.
//!
//! Four categories, matching what the UI surfaces: validation problems are
//! shown inline next to the offending field, auth failures clear the PIN
//! input, persistence and not-found failures become a dismissable banner.
//! The command layer flattens all of them into a single user-visible string.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PosError {
    /// Malformed local input (empty fields, bad PIN shape, bad order draft).
    #[error("{0}")]
    Validation(String),

    /// Credential mismatch on login.
    #[error("{0}")]
    Auth(String),

    /// The backing store is unreachable or rejected a read/write.
    #[error("{0}")]
    Persistence(String),

    /// A delete/fetch target does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl PosError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PosError::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        PosError::Auth(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        PosError::Persistence(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        PosError::NotFound(msg.into())
    }
}

impl From<rusqlite::Error> for PosError {
    fn from(e: rusqlite::Error) -> Self {
        PosError::Persistence(format!("database error: {e}"))
    }
}

impl From<serde_json::Error> for PosError {
    fn from(e: serde_json::Error) -> Self {
        PosError::Persistence(format!("document serialization error: {e}"))
    }
}

pub type PosResult<T> = Result<T, PosError>;
