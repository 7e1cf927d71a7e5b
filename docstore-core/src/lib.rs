//! A thin document database access layer built around one lazily established connection.
//!
//! This crate is the core of the docstore project and provides:
//!
//! - **Records** ([`record`]) - Untyped records, store-assigned identifiers and typed conversions
//! - **Backend abstraction** ([`backend`]) - The connect primitive and the live connection traits
//! - **Filters** ([`query`]) - Filter expressions and their conversion from mappings
//! - **Data store** ([`store`]) - The facade owning the connection and exposing record operations
//! - **Configuration** ([`config`]) - Server address, logical database and collection
//! - **Error handling** ([`error`]) - Error and result types

#[allow(unused_extern_crates)]
extern crate self as docstore_core;

pub mod backend;
pub mod config;
pub mod error;
pub mod query;
pub mod record;
pub mod store;
