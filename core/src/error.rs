//! Error taxonomy shared by every engine operation.

use sled::transaction::TransactionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The requested document, field or counter does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The underlying sled operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// A stored record could not be decoded.
    #[error("corrupt record in {namespace}: {message}")]
    Corrupt {
        namespace: &'static str,
        message: String,
    },

    /// One document/field/token failed during an indexing pass.
    #[error("indexing document {document} failed at field {field:?} token {token:?}: {message}")]
    Indexing {
        document: String,
        field: String,
        token: Option<String>,
        message: String,
    },

    /// Malformed input rejected before touching the store.
    #[error("invalid input: {0}")]
    Validation(String),
}

impl SearchError {
    pub(crate) fn corrupt(namespace: &'static str, message: impl Into<String>) -> Self {
        SearchError::Corrupt {
            namespace,
            message: message.into(),
        }
    }

    /// True for failures that mean the store itself misbehaved.
    pub fn is_storage(&self) -> bool {
        matches!(self, SearchError::Storage(_) | SearchError::Corrupt { .. })
    }
}

impl From<TransactionError<SearchError>> for SearchError {
    fn from(err: TransactionError<SearchError>) -> Self {
        match err {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(inner) => SearchError::Storage(inner),
        }
    }
}
