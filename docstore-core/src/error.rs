//! Error types and result types for data store operations.
//!
//! Use [`DataStoreResult<T>`] as the return type for fallible operations.
//! A record that is simply absent is never an error: lookups return `Option`.

use bson::error::Error as BsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a data store.
#[derive(Error, Debug)]
pub enum DataStoreError {
    /// The connection could not be established, or the handle has been closed.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Malformed caller input, such as a batch that is not a sequence of records,
    /// a malformed identifier or an unsupported filter operator.
    #[error("Validation error: {0}")]
    Validation(String),
    /// The store rejected an insertion.
    #[error("Write error: {0}")]
    Write(String),
    /// The store reported a failure while reading or counting records.
    #[error("Backend error: {0}")]
    Backend(String),
    /// Serialization/deserialization error when converting between typed values and records.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A specialized `Result` type for data store operations.
pub type DataStoreResult<T> = Result<T, DataStoreError>;

impl From<BsonError> for DataStoreError {
    fn from(err: BsonError) -> Self {
        DataStoreError::Serialization(err.to_string())
    }
}
