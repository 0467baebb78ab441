use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid document identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Malformed query '{query}': {reason}")]
    QuerySyntax { query: String, reason: String },

    #[error("Index writer at {0} is held by another handle")]
    WriterLocked(String),

    #[error("Search index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Lookup and validation failures the caller caused, as opposed to
    /// unavailability of the index or the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::InvalidIdentifier(_) | Error::QuerySyntax { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
