//! Storage backend abstraction for the data store.
//!
//! A backend is split in two halves:
//!
//! - [`StoreConnector`] is the connect primitive. It knows where the database
//!   lives and produces a live connection on demand, as many times as asked.
//! - [`StoreBackend`] is a live connection bound to a logical database. It
//!   exposes the record primitives [`DataStore`](crate::store::DataStore)
//!   builds on and can be closed explicitly.
//!
//! Implementations must be thread-safe (`Send + Sync`); the store shares a
//! single connection between all callers.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::DataStoreResult,
    query::{Expr, Query},
    record::{Identifier, Record},
};

/// A live connection to a document database and one of its logical databases.
///
/// # Error Handling
///
/// Insertions report rejections as [`DataStoreError::Write`](crate::error::DataStoreError::Write),
/// reads as [`DataStoreError::Backend`](crate::error::DataStoreError::Backend), and any
/// operation on a closed connection as
/// [`DataStoreError::Connection`](crate::error::DataStoreError::Connection).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Persists one record and returns the identifier the store assigned to it.
    ///
    /// A record that already carries an `_id` keeps it.
    async fn insert_one(&self, record: Record, collection: &str) -> DataStoreResult<Identifier>;

    /// Persists a batch of records in a single write.
    ///
    /// Records are written in order; when one is rejected the write stops and
    /// the records before it stay persisted. Returns the identifiers in input order.
    async fn insert_many(
        &self,
        records: Vec<Record>,
        collection: &str,
    ) -> DataStoreResult<Vec<Identifier>>;

    /// Returns the records matching the query, in store order.
    async fn query(&self, query: Query, collection: &str) -> DataStoreResult<Vec<Record>>;

    /// Counts the records matching `filter`; `None` counts every record.
    async fn count(&self, filter: Option<Expr>, collection: &str) -> DataStoreResult<u64>;

    /// Fetches the record with the given identifier, if any.
    async fn get(&self, id: &Identifier, collection: &str) -> DataStoreResult<Option<Record>>;

    /// Closes the connection and releases its resources.
    ///
    /// Closing twice is not an error.
    async fn close(&self) -> DataStoreResult<()>;
}

/// The connect primitive: produces live connections to a configured database.
#[async_trait]
pub trait StoreConnector: Send + Sync + Debug {
    type Backend: StoreBackend;

    /// Establishes a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::Connection`](crate::error::DataStoreError::Connection)
    /// when the database cannot be reached.
    async fn connect(&self) -> DataStoreResult<Self::Backend>;

    /// A short human-readable description of the target, used in logs.
    ///
    /// Must not include credentials.
    fn target(&self) -> String;
}
