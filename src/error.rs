//! Error types for the sankey engine

use thiserror::Error;

/// Main error type for sankey query generation and graph construction
#[derive(Error, Debug)]
pub enum Error {
    /// Request failed validation (dimension count, limit, time range)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested dimension is not part of the column registry
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    /// Store execution failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A row returned by the store violates the result contract
    #[error("Malformed result row {index}: {reason}")]
    MalformedRow {
        /// Position of the offending row in the result set
        index: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Store errors
///
/// Produced by [`FlowStore`](crate::store::FlowStore) implementations and
/// propagated verbatim through [`Error::Store`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not reach the store
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store rejected or failed the query
    #[error("Query failed with status {status}: {message}")]
    Query {
        /// HTTP status returned by the store
        status: u16,
        /// Error body returned by the store
        message: String,
    },

    /// The store answered with rows we cannot decode
    #[error("Decode error: {0}")]
    Decode(String),

    /// The store did not answer in time
    #[error("Query timed out")]
    Timeout,
}

/// Coarse classification used to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller sent something we refuse to run
    Client,
    /// The store failed
    Upstream,
    /// Anything else, including inconsistent store output
    Internal,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRequest(_) | Error::UnknownDimension(_) => ErrorKind::Client,
            Error::Store(_) => ErrorKind::Upstream,
            Error::MalformedRow { .. } | Error::Configuration(_) | Error::Serialization(_) => {
                ErrorKind::Internal
            },
        }
    }

    /// Shorthand for an [`Error::InvalidRequest`]
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidRequest(message.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
