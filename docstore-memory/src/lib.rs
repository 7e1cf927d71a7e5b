//! In-memory storage backend for docstore.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StoreConnector` and `StoreBackend` traits. It is ideal for development,
//! tests and offline runs of code written against a real database.
//!
//! # Features
//!
//! - **Server semantics** - Records outlive connections; closed connections refuse work
//! - **Ordered batch writes** - A rejected record stops the batch, earlier records stay
//! - **Full filter support** - Evaluates every filter expression in memory
//! - **Usage counters** - Connects, closes and batch writes are counted for inspection
//!
//! # Quick Start
//!
//! ```ignore
//! use bson::doc;
//! use docstore::{prelude::*, memory::InMemoryConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DataStore::new(InMemoryConnector::new(), "users");
//!
//!     store.insert_one(doc! { "name": "Ahmed", "age": 20 }).await?;
//!     assert_eq!(store.count(doc! { "age": 20 }).await?, 1);
//!
//!     store.disconnect().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docstore_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryConnector, InMemoryStore, ServerStats};
