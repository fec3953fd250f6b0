use orbtrack_common::CatalogId;
use thiserror::Error;

/// Failure to obtain element sets from an upstream provider
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error {0}")]
    Status(reqwest::StatusCode),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

impl FetchError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Worth another attempt: transport trouble or a server-side error
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Timeout(_) => true,
            FetchError::Status(status) => status.is_server_error(),
            FetchError::Malformed(_) => false,
        }
    }
}

/// Element lines that fail format validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElementLinesError {
    #[error("Line {line} has length {len}, expected 69")]
    Length { line: u8, len: usize },

    #[error("Line {0} does not match the element line layout")]
    Layout(u8),

    #[error("Line {line} checksum mismatch: expected {expected}, found {found}")]
    Checksum { line: u8, expected: u32, found: u32 },

    #[error("Catalog numbers differ between lines: {0} vs {1}")]
    IdMismatch(String, String),

    #[error("Invalid catalog number: {0:?}")]
    InvalidId(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PropagationError {
    #[error("Invalid element set: {0}")]
    Elements(String),

    #[error("Propagation diverged: {0}")]
    Diverged(String),

    #[error("Non-finite state vector")]
    NonFinite,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Tracking store has been shut down")]
    Closed,

    #[error("Catalog already installed")]
    CatalogInstalled,

    #[error("Stale snapshot for tick {tick}, current is {current}")]
    StaleTick { tick: u64, current: u64 },
}

/// Rejected user search or selection
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid catalog number: {0:?}")]
    InvalidId(String),

    #[error("Object {0} has no current position")]
    NotFound(CatalogId),

    #[error("Object {0} is not in the catalog")]
    UnknownId(CatalogId),
}
