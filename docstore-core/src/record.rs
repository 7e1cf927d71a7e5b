//! Records and the identifiers the store assigns to them.
//!
//! A [`Record`] is an untyped BSON document; no schema is enforced. Types that
//! implement serde's traits can opt into a typed view through [`RecordExt`].

use bson::{Bson, Document, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{fmt, str::FromStr};

use crate::error::{DataStoreError, DataStoreResult};

/// A semi-structured record, a mapping from field name to value.
pub type Record = Document;

/// The field every stored record carries its identifier in.
pub const ID_FIELD: &str = "_id";

/// Opaque, globally unique key assigned to a record when it is inserted.
///
/// The external representation is the 24 character hex string of the
/// underlying ObjectId.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(ObjectId);

impl Identifier {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// Parses the external string form of an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::Validation`] if `input` is not a valid identifier.
    pub fn parse_str(input: &str) -> DataStoreResult<Self> {
        ObjectId::parse_str(input)
            .map(Self)
            .map_err(|e| DataStoreError::Validation(format!("invalid identifier {input:?}: {e}")))
    }

    /// Reads the identifier out of a record's `_id` field, if it holds one.
    pub fn of(record: &Record) -> Option<Self> {
        match record.get(ID_FIELD) {
            Some(Bson::ObjectId(oid)) => Some(Self(*oid)),
            _ => None,
        }
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl FromStr for Identifier {
    type Err = DataStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl From<ObjectId> for Identifier {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl From<Identifier> for Bson {
    fn from(id: Identifier) -> Self {
        Bson::ObjectId(id.0)
    }
}

impl TryFrom<&Bson> for Identifier {
    type Error = DataStoreError;

    fn try_from(value: &Bson) -> Result<Self, Self::Error> {
        match value {
            Bson::ObjectId(oid) => Ok(Self(*oid)),
            other => Err(DataStoreError::Validation(format!(
                "expected an ObjectId identifier, found {:?}",
                other.element_type()
            ))),
        }
    }
}

/// Conversion helpers between serde types and untyped records.
///
/// Implemented for every type that is both `Serialize` and `DeserializeOwned`.
///
/// # Example
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct User { name: String, age: i32 }
///
/// let record = User { name: "Ahmed".into(), age: 20 }.to_record()?;
/// let user = User::from_record(record)?;
/// ```
pub trait RecordExt: Sized {
    /// Converts this value into a record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the value does not serialize to a document.
    fn to_record(&self) -> DataStoreResult<Record>;

    /// Builds a value from a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not match the type's shape.
    fn from_record(record: Record) -> DataStoreResult<Self>;
}

impl<T: Serialize + DeserializeOwned> RecordExt for T {
    fn to_record(&self) -> DataStoreResult<Record> {
        match serialize_to_bson(self)? {
            Bson::Document(record) => Ok(record),
            other => Err(DataStoreError::Serialization(format!(
                "expected a document, found {:?}",
                other.element_type()
            ))),
        }
    }

    fn from_record(record: Record) -> DataStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(record))?)
    }
}
