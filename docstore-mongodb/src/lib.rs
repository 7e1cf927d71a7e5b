//! MongoDB backend implementation for docstore.
//!
//! This crate provides a MongoDB-based implementation of the `StoreConnector`
//! and `StoreBackend` traits on top of the official async driver.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docstore = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The connector takes a MongoDB connection string and a logical database
//! name, directly or from a [`StoreConfig`](docstore_core::config::StoreConfig).
//!
//! # Example
//!
//! ```ignore
//! use docstore::{prelude::*, mongodb::MongoDbConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = MongoDbConnector::new("mongodb://127.0.0.1:27017", "proj-1");
//!     let store = DataStore::new(connector, "users");
//!
//!     let users = store.find(bson::doc! { "age": 27 }, 5).await?;
//!
//!     store.disconnect().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docstore_mongodb;

pub mod query;
pub mod store;

pub use store::{MongoDbConnector, MongoDbStore};
