//! In-memory storage implementation.
//!
//! [`InMemoryConnector`] plays the role of a database server: it owns the
//! collections and hands out [`InMemoryStore`] connections to them. Data
//! outlives individual connections, so closing and reconnecting sees the same
//! records, exactly as with a real server.

use async_trait::async_trait;
use bson::{Bson, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tracing::debug;

use docstore_core::{
    backend::{StoreBackend, StoreConnector},
    error::{DataStoreError, DataStoreResult},
    query::{Expr, Query},
    record::{ID_FIELD, Identifier, Record},
};

use crate::evaluator::RecordEvaluator;

/// collection name -> records in insertion order
type StoreMap = HashMap<String, Vec<Record>>;

/// Counters describing how the server has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Connections established.
    pub connects: usize,
    /// Connections closed.
    pub closes: usize,
    /// Batch writes received.
    pub batch_writes: usize,
}

#[derive(Debug, Default)]
struct Server {
    collections: RwLock<StoreMap>,
    unreachable: AtomicBool,
    connects: AtomicUsize,
    closes: AtomicUsize,
    batch_writes: AtomicUsize,
}

/// Connector for an in-memory server.
///
/// Clones share the same server, which lets tests keep a handle for
/// inspection after moving the connector into a
/// [`DataStore`](docstore_core::store::DataStore).
///
/// # Example
///
/// ```ignore
/// use docstore_memory::InMemoryConnector;
/// use docstore::store::DataStore;
///
/// let connector = InMemoryConnector::new();
/// let store = DataStore::new(connector.clone(), "users");
///
/// store.connect().await?;
/// assert_eq!(connector.stats().connects, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    server: Arc<Server>,
}

impl InMemoryConnector {
    /// Creates a connector for a fresh, empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector whose server refuses connections.
    pub fn unreachable() -> Self {
        let connector = Self::new();
        connector.set_reachable(false);
        connector
    }

    /// Makes the server accept or refuse new connections.
    pub fn set_reachable(&self, reachable: bool) {
        self.server.unreachable.store(!reachable, Ordering::SeqCst);
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            connects: self.server.connects.load(Ordering::SeqCst),
            closes: self.server.closes.load(Ordering::SeqCst),
            batch_writes: self.server.batch_writes.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    type Backend = InMemoryStore;

    async fn connect(&self) -> DataStoreResult<Self::Backend> {
        if self.server.unreachable.load(Ordering::SeqCst) {
            return Err(DataStoreError::Connection(
                "in-memory server is not accepting connections".to_string(),
            ));
        }

        let connection = self.server.connects.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(connection, "Opened in-memory connection");

        Ok(InMemoryStore {
            server: Arc::clone(&self.server),
            closed: AtomicBool::new(false),
        })
    }

    fn target(&self) -> String {
        "memory".to_string()
    }
}

/// A connection to an in-memory server.
///
/// Every operation on a closed connection fails with
/// [`DataStoreError::Connection`].
#[derive(Debug)]
pub struct InMemoryStore {
    server: Arc<Server>,
    closed: AtomicBool,
}

impl InMemoryStore {
    fn ensure_open(&self) -> DataStoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DataStoreError::Connection("connection is closed".to_string()));
        }

        Ok(())
    }

    /// Assigns an identifier to `record` unless it already carries one.
    fn identify(record: &mut Record) -> DataStoreResult<Identifier> {
        match record.get(ID_FIELD) {
            Some(value) => Identifier::try_from(value),
            None => {
                let id = ObjectId::new();
                record.insert(ID_FIELD, Bson::ObjectId(id));
                Ok(id.into())
            }
        }
    }

    fn insert_into(records: &mut Vec<Record>, mut record: Record, collection: &str) -> DataStoreResult<Identifier> {
        let id = Self::identify(&mut record)?;

        if records.iter().any(|existing| Identifier::of(existing) == Some(id)) {
            return Err(DataStoreError::Write(format!(
                "duplicate key: record {id} already exists in collection {collection}"
            )));
        }

        records.push(record);

        Ok(id)
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_one(&self, record: Record, collection: &str) -> DataStoreResult<Identifier> {
        self.ensure_open()?;

        let mut store = self.server.collections.write().await;
        let records = store.entry(collection.to_string()).or_default();

        Self::insert_into(records, record, collection)
    }

    async fn insert_many(&self, records: Vec<Record>, collection: &str) -> DataStoreResult<Vec<Identifier>> {
        self.ensure_open()?;

        for record in &records {
            if let Some(value) = record.get(ID_FIELD) {
                Identifier::try_from(value)?;
            }
        }

        self.server.batch_writes.fetch_add(1, Ordering::SeqCst);

        let mut store = self.server.collections.write().await;
        let existing = store.entry(collection.to_string()).or_default();

        // Ordered write: stop at the first rejected record, keep the ones before it
        records
            .into_iter()
            .map(|record| Self::insert_into(existing, record, collection))
            .collect()
    }

    async fn query(&self, query: Query, collection: &str) -> DataStoreResult<Vec<Record>> {
        self.ensure_open()?;

        let store = self.server.collections.read().await;
        let Some(records) = store.get(collection) else {
            return Ok(vec![]);
        };

        Ok(records
            .iter()
            .filter(|record| RecordEvaluator::matches(record, query.filter.as_ref()))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DataStoreResult<u64> {
        self.ensure_open()?;

        let store = self.server.collections.read().await;

        Ok(store
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| RecordEvaluator::matches(record, filter.as_ref()))
                    .count() as u64
            })
            .unwrap_or(0))
    }

    async fn get(&self, id: &Identifier, collection: &str) -> DataStoreResult<Option<Record>> {
        self.ensure_open()?;

        let store = self.server.collections.read().await;

        Ok(store
            .get(collection)
            .and_then(|records| {
                records
                    .iter()
                    .find(|record| Identifier::of(record).as_ref() == Some(id))
            })
            .cloned())
    }

    async fn close(&self) -> DataStoreResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.server.closes.fetch_add(1, Ordering::SeqCst);
        }

        Ok(())
    }
}
