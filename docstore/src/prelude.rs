//! Convenient re-exports of commonly used types from docstore.
//!
//! ```ignore
//! use docstore::prelude::*;
//! ```

pub use docstore_core::{
    backend::{StoreBackend, StoreConnector},
    config::StoreConfig,
    error::{DataStoreError, DataStoreResult},
    query::{Expr, FieldOp, Filter, IntoFilter, Query, QueryVisitor},
    record::{Identifier, Record, RecordExt},
    store::{DataStore, InsertManyResult},
};
