//! Main docstore crate providing a lazily connected record store.
//!
//! This crate is the primary entry point for users of docstore. It re-exports
//! the core types from the sub-crates and gives access to the storage backends.
//!
//! # Features
//!
//! - **Lazy, shared connection** - The first operation connects; later ones reuse the handle
//! - **Explicit teardown** - `disconnect` closes the handle; the next operation reconnects
//! - **Untyped records** - Records are BSON documents, with opt-in typed conversions
//! - **Mapping filters** - Filter with `{field: value}` mappings or the `Filter` helpers
//! - **Multiple backends** - In-memory and MongoDB (behind the `mongodb` feature)
//!
//! # Quick Start
//!
//! ```ignore
//! use bson::doc;
//! use docstore::{prelude::*, memory::InMemoryConnector};
//!
//! #[tokio::main]
//! async fn main() -> DataStoreResult<()> {
//!     let store = DataStore::new(InMemoryConnector::new(), "users");
//!
//!     let id = store.insert_one(doc! { "name": "Ahmed", "age": 20 }).await?;
//!
//!     let batch = store
//!         .insert_many(vec![
//!             doc! { "name": "Sara", "age": 27 },
//!             doc! { "name": "Omar", "age": 27 },
//!         ])
//!         .await?;
//!     assert_eq!(batch.inserted_count, 2);
//!
//!     let aged_27 = store.find(doc! { "age": 27 }, 5).await?;
//!     let count = store.count(doc! { "age": 27 }).await?;
//!     let ahmed = store.find_by_id(&id.to_string()).await?;
//!
//!     store.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires the `mongodb` feature)

pub mod prelude;

pub use docstore_core::{backend, config, error, query, record, store};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend.
pub mod memory {
    pub use docstore_memory::{InMemoryConnector, InMemoryStore, ServerStats};
}

/// MongoDB storage backend.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docstore_mongodb::{MongoDbConnector, MongoDbStore};
}
