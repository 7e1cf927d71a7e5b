//! The data store facade.
//!
//! [`DataStore`] owns a connector and at most one live connection to the
//! database. The connection is established lazily by the first operation that
//! needs it (or by an explicit [`DataStore::connect`]) and is reused by every
//! operation until [`DataStore::disconnect`] closes it. After a disconnect the
//! next operation connects again.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docstore::{prelude::*, memory::InMemoryConnector};
//!
//! let store = DataStore::new(InMemoryConnector::new(), "users");
//!
//! let id = store.insert_one(doc! { "name": "Ahmed", "age": 20 }).await?;
//! assert_eq!(store.count(doc! { "age": 20 }).await?, 1);
//! assert!(store.find_by_id(&id.to_string()).await?.is_some());
//!
//! store.disconnect().await?;
//! ```

use bson::Bson;
use mea::rwlock::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    backend::{StoreBackend, StoreConnector},
    error::{DataStoreError, DataStoreResult},
    query::{IntoFilter, Query},
    record::{ID_FIELD, Identifier, Record},
};

/// Outcome of a batch insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertManyResult {
    /// Number of records persisted.
    pub inserted_count: usize,
    /// Identifiers of the persisted records, in input order.
    pub inserted_ids: Vec<Identifier>,
}

/// A record store over one collection with a single, lazily established connection.
///
/// # Concurrency
///
/// The store is `Send + Sync` when its connector is. Concurrent callers share
/// one connection and never establish more than one at a time; operations
/// themselves are not serialized against each other.
#[derive(Debug)]
pub struct DataStore<C: StoreConnector> {
    connector: C,
    collection: String,
    connection: RwLock<Option<Arc<C::Backend>>>,
}

impl<C: StoreConnector> DataStore<C> {
    /// Creates a disconnected store whose record operations target `collection`.
    pub fn new(connector: C, collection: impl Into<String>) -> Self {
        Self {
            connector,
            collection: collection.into(),
            connection: RwLock::new(None),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Whether a connection is currently held.
    pub async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    /// Returns the active connection, establishing it first if there is none.
    ///
    /// Repeated calls while connected return the same handle.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::Connection`] if the database cannot be reached.
    pub async fn connect(&self) -> DataStoreResult<Arc<C::Backend>> {
        if let Some(backend) = self.connection.read().await.as_ref() {
            return Ok(Arc::clone(backend));
        }

        let mut slot = self.connection.write().await;

        // Another caller may have connected while we waited for the write lock
        if let Some(backend) = slot.as_ref() {
            return Ok(Arc::clone(backend));
        }

        let backend = Arc::new(self.connector.connect().await.inspect_err(|e| {
            error!(server = %self.connector.target(), error = %e, "Error connecting to database");
        })?);

        info!(server = %self.connector.target(), "Connected to database successfully");
        *slot = Some(Arc::clone(&backend));

        Ok(backend)
    }

    /// Closes the active connection, if any, and returns to the disconnected state.
    ///
    /// Calling this while disconnected does nothing. The store is disconnected
    /// afterwards even if closing the connection reports an error.
    pub async fn disconnect(&self) -> DataStoreResult<()> {
        let Some(backend) = self.connection.write().await.take() else {
            debug!("Disconnect requested with no open connection");
            return Ok(());
        };

        backend.close().await.inspect_err(|e| {
            error!(error = %e, "Error closing database connection");
        })?;

        info!(server = %self.connector.target(), "Database connection closed");

        Ok(())
    }

    /// Persists one record and returns its identifier.
    ///
    /// A record may carry its own `_id`, which must then be an ObjectId.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::Validation`] before any store interaction if
    /// `_id` holds anything else, [`DataStoreError::Write`] if the store
    /// rejects the record, or a connection error if the store cannot be reached.
    pub async fn insert_one(&self, record: Record) -> DataStoreResult<Identifier> {
        let result: DataStoreResult<Identifier> = async {
            Self::check_identifier(&record)?;

            self.connect()
                .await?
                .insert_one(record, &self.collection)
                .await
        }
        .await;

        match &result {
            Ok(id) => info!(collection = %self.collection, %id, "Record added"),
            Err(e) => error!(collection = %self.collection, error = %e, "Error adding record"),
        }

        result
    }

    /// Persists a batch of records in one write.
    ///
    /// `records` must convert to a BSON array of documents; a `Vec<Record>`
    /// does. An empty batch returns an empty result without touching the store.
    /// Partial failures follow the backend's ordered batch semantics.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::Validation`] before any store interaction if
    /// the input is not a sequence of records or one of them carries a
    /// non-ObjectId `_id`, and [`DataStoreError::Write`] if
    /// the store rejects the batch.
    pub async fn insert_many(&self, records: impl Into<Bson>) -> DataStoreResult<InsertManyResult> {
        let result: DataStoreResult<InsertManyResult> = async {
            let records = Self::records_from(records.into())?;

            if records.is_empty() {
                info!(collection = %self.collection, "Batch is empty, no records to add");
                return Ok::<_, DataStoreError>(InsertManyResult::default());
            }

            let inserted_ids = self
                .connect()
                .await?
                .insert_many(records, &self.collection)
                .await?;

            Ok::<_, DataStoreError>(InsertManyResult {
                inserted_count: inserted_ids.len(),
                inserted_ids,
            })
        }
        .await;

        match &result {
            Ok(outcome) if outcome.inserted_count > 0 => info!(
                collection = %self.collection,
                count = outcome.inserted_count,
                "Added records successfully"
            ),
            Ok(_) => {}
            Err(e) => error!(collection = %self.collection, error = %e, "Error adding records"),
        }

        result
    }

    /// Returns the records matching `filter`, at most `limit` of them when
    /// `limit > 0` and all of them otherwise.
    ///
    /// An empty mapping matches every record.
    pub async fn find(&self, filter: impl IntoFilter, limit: i64) -> DataStoreResult<Vec<Record>> {
        let result: DataStoreResult<Vec<Record>> = async {
            let query = Query::with_signed_limit(filter.into_filter()?, limit);

            self.connect()
                .await?
                .query(query, &self.collection)
                .await
        }
        .await;

        match &result {
            Ok(records) => debug!(collection = %self.collection, found = records.len(), "Found records"),
            Err(e) => error!(collection = %self.collection, error = %e, "Error finding records"),
        }

        result
    }

    /// Counts the records matching `filter`.
    pub async fn count(&self, filter: impl IntoFilter) -> DataStoreResult<u64> {
        let result: DataStoreResult<u64> = async {
            let filter = filter.into_filter()?;

            self.connect()
                .await?
                .count(filter, &self.collection)
                .await
        }
        .await;

        match &result {
            Ok(count) => info!(collection = %self.collection, count, "Counted records"),
            Err(e) => error!(collection = %self.collection, error = %e, "Error counting records"),
        }

        result
    }

    /// Looks up a record by the string form of its identifier.
    ///
    /// Returns `Ok(None)` when no record has that identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::Validation`] if `id` is not a valid identifier.
    pub async fn find_by_id(&self, id: &str) -> DataStoreResult<Option<Record>> {
        let result: DataStoreResult<Option<Record>> = async {
            let parsed = Identifier::parse_str(id)?;

            self.connect()
                .await?
                .get(&parsed, &self.collection)
                .await
        }
        .await;

        match &result {
            Ok(Some(_)) => debug!(collection = %self.collection, id, "Record found"),
            Ok(None) => debug!(collection = %self.collection, id, "Record not found"),
            Err(e) => error!(collection = %self.collection, id, error = %e, "Error finding record"),
        }

        result
    }

    /// A caller-supplied `_id` must be an identifier the store can hand back.
    fn check_identifier(record: &Record) -> DataStoreResult<()> {
        match record.get(ID_FIELD) {
            Some(value) => Identifier::try_from(value).map(|_| ()),
            None => Ok(()),
        }
    }

    fn records_from(value: Bson) -> DataStoreResult<Vec<Record>> {
        let Bson::Array(items) = value else {
            return Err(DataStoreError::Validation(format!(
                "records must be a sequence, found {:?}",
                value.element_type()
            )));
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Bson::Document(record) => Self::check_identifier(&record)
                    .map(|_| record)
                    .map_err(|e| match e {
                        DataStoreError::Validation(reason) => {
                            DataStoreError::Validation(format!("element {index}: {reason}"))
                        }
                        other => other,
                    }),
                other => Err(DataStoreError::Validation(format!(
                    "element {index} is not a record, found {:?}",
                    other.element_type()
                ))),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Expr;
    use async_trait::async_trait;
    use bson::doc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Calls {
        connects: AtomicUsize,
        closes: AtomicUsize,
        batches: AtomicUsize,
        unreachable: AtomicBool,
    }

    #[derive(Debug, Default, Clone)]
    struct RecordingConnector {
        calls: Arc<Calls>,
    }

    #[derive(Debug)]
    struct RecordingBackend {
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl StoreBackend for RecordingBackend {
        async fn insert_one(&self, _record: Record, _collection: &str) -> DataStoreResult<Identifier> {
            Ok(Identifier::new())
        }

        async fn insert_many(
            &self,
            records: Vec<Record>,
            _collection: &str,
        ) -> DataStoreResult<Vec<Identifier>> {
            self.calls.batches.fetch_add(1, Ordering::SeqCst);
            Ok(records.iter().map(|_| Identifier::new()).collect())
        }

        async fn query(&self, _query: Query, _collection: &str) -> DataStoreResult<Vec<Record>> {
            Ok(vec![])
        }

        async fn count(&self, _filter: Option<Expr>, _collection: &str) -> DataStoreResult<u64> {
            Ok(0)
        }

        async fn get(&self, _id: &Identifier, _collection: &str) -> DataStoreResult<Option<Record>> {
            Ok(None)
        }

        async fn close(&self) -> DataStoreResult<()> {
            self.calls.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl StoreConnector for RecordingConnector {
        type Backend = RecordingBackend;

        async fn connect(&self) -> DataStoreResult<Self::Backend> {
            if self.calls.unreachable.load(Ordering::SeqCst) {
                return Err(DataStoreError::Connection("server unreachable".to_string()));
            }

            self.calls.connects.fetch_add(1, Ordering::SeqCst);
            Ok(RecordingBackend { calls: Arc::clone(&self.calls) })
        }

        fn target(&self) -> String {
            "recording".to_string()
        }
    }

    fn store() -> (DataStore<RecordingConnector>, Arc<Calls>) {
        let connector = RecordingConnector::default();
        let calls = Arc::clone(&connector.calls);
        (DataStore::new(connector, "users"), calls)
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let (store, calls) = store();

        let first = store.connect().await.unwrap();
        let second = store.connect().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.connects.load(Ordering::SeqCst), 1);
        assert!(store.is_connected().await);
    }

    #[tokio::test]
    async fn concurrent_callers_connect_once() {
        let (store, calls) = store();

        let (a, b, c) = tokio::join!(store.connect(), store.connect(), store.connect());

        let a = a.unwrap();
        assert!(Arc::ptr_eq(&a, &b.unwrap()));
        assert!(Arc::ptr_eq(&a, &c.unwrap()));
        assert_eq!(calls.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disconnect_resets_and_next_operation_reconnects() {
        let (store, calls) = store();

        store.connect().await.unwrap();
        store.disconnect().await.unwrap();
        assert!(!store.is_connected().await);
        assert_eq!(calls.closes.load(Ordering::SeqCst), 1);

        store.count(doc! {}).await.unwrap();
        assert!(store.is_connected().await);
        assert_eq!(calls.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disconnect_while_disconnected_is_a_no_op() {
        let (store, calls) = store();

        store.disconnect().await.unwrap();
        store.disconnect().await.unwrap();

        assert_eq!(calls.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        let (store, calls) = store();
        calls.unreachable.store(true, Ordering::SeqCst);

        let err = store.insert_one(doc! { "name": "Ahmed" }).await.unwrap_err();

        assert!(matches!(err, DataStoreError::Connection(_)));
        assert!(!store.is_connected().await);
    }

    #[tokio::test]
    async fn empty_batch_skips_the_store() {
        let (store, calls) = store();

        let result = store.insert_many(Vec::<Record>::new()).await.unwrap();

        assert_eq!(result, InsertManyResult { inserted_count: 0, inserted_ids: vec![] });
        assert_eq!(calls.batches.load(Ordering::SeqCst), 0);
        assert_eq!(calls.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_sequence_batch_is_rejected_before_connecting() {
        let (store, calls) = store();

        let err = store.insert_many(doc! { "name": "Ahmed" }).await.unwrap_err();
        assert!(matches!(err, DataStoreError::Validation(_)));

        let err = store
            .insert_many(vec![Bson::from(doc! { "name": "Ahmed" }), Bson::Int32(3)])
            .await
            .unwrap_err();
        assert!(matches!(err, DataStoreError::Validation(_)));

        assert_eq!(calls.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn batch_reports_count_and_ids() {
        let (store, calls) = store();

        let result = store
            .insert_many(vec![doc! { "name": "Ali" }, doc! { "name": "Noor" }])
            .await
            .unwrap();

        assert_eq!(result.inserted_count, 2);
        assert_eq!(result.inserted_ids.len(), 2);
        assert_eq!(calls.batches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn foreign_record_ids_are_rejected_before_connecting() {
        let (store, calls) = store();

        let err = store
            .insert_one(doc! { "_id": "ahmed", "name": "Ahmed" })
            .await
            .unwrap_err();
        assert!(matches!(err, DataStoreError::Validation(_)));

        let err = store
            .insert_many(vec![doc! { "name": "Ali" }, doc! { "_id": 7, "name": "Noor" }])
            .await
            .unwrap_err();
        assert!(matches!(err, DataStoreError::Validation(ref reason) if reason.starts_with("element 1")));

        assert_eq!(calls.connects.load(Ordering::SeqCst), 0);
        assert_eq!(calls.batches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_identifier_is_a_validation_error() {
        let (store, _) = store();

        let err = store.find_by_id("not-a-valid-id").await.unwrap_err();
        assert!(matches!(err, DataStoreError::Validation(_)));
    }
}
