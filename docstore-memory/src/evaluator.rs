//! Filter evaluation for in-memory record matching.
//!
//! Integers of every width compare exactly, and against floats by value, so
//! `{"age": 27}` matches an `Int64` 27, an `Int32` one and a `Double` 27.0.
//! Field names may be dotted paths into embedded documents; arrays are
//! addressed by position only.

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use std::{cmp::Ordering, collections::HashMap};

use docstore_core::{
    error::DataStoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Comparable view of a BSON value.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// No normalized form; equal only to an identical value, never ordered
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Float(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            other => Comparable::Other(other),
        }
    }
}

/// Orders an integer against a float without rounding the integer.
fn compare_int_float(int: i64, float: f64) -> Option<Ordering> {
    const BOUND: f64 = 9_223_372_036_854_775_808.0; // 2^63

    if float.is_nan() {
        return None;
    }
    if float >= BOUND {
        return Some(Ordering::Less);
    }
    if float < -BOUND {
        return Some(Ordering::Greater);
    }

    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(float - whole)),
        ordering => Some(ordering),
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Float(a), Comparable::Float(b)) => a == b,
            (Comparable::Int(a), Comparable::Float(b)) | (Comparable::Float(b), Comparable::Int(a)) => {
                compare_int_float(*a, *b) == Some(Ordering::Equal)
            }
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Float(a), Comparable::Float(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Float(b)) => compare_int_float(*a, *b),
            (Comparable::Float(a), Comparable::Int(b)) => compare_int_float(*b, *a).map(Ordering::reverse),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

pub(crate) struct RecordEvaluator<'a> {
    record: &'a Document,
}

impl<'a> RecordEvaluator<'a> {
    pub fn new(record: &'a Document) -> Self {
        Self { record }
    }

    pub fn matches(record: &'a Document, filter: Option<&Expr>) -> bool {
        match filter {
            Some(expr) => RecordEvaluator::new(record).visit_expr(expr).unwrap_or(false),
            None => true,
        }
    }

    /// Equality with array fields matching when any element is equal.
    fn equals(field_value: &Bson, value: &Bson) -> bool {
        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        if left == right {
            return true;
        }

        match left {
            Comparable::Array(items) => items.iter().any(|item| item == &right),
            _ => false,
        }
    }

    /// Resolves a possibly dotted field path against the record.
    fn resolve(&self, path: &str) -> Option<&'a Bson> {
        if let Some(value) = self.record.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let mut current = self.record.get(segments.next()?)?;

        for segment in segments {
            current = match current {
                Bson::Document(doc) => doc.get(segment)?,
                Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }

    fn any_of(field_value: &Bson, values: &Bson) -> bool {
        match values {
            Bson::Array(values) => values.iter().any(|value| Self::equals(field_value, value)),
            single => Self::equals(field_value, single),
        }
    }
}

impl<'a> QueryVisitor for RecordEvaluator<'a> {
    type Output = bool;
    type Error = DataStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.resolve(field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        // A missing field reads as null for equality, and is never ordered
        let null = Bson::Null;
        let field_value = match self.resolve(field) {
            Some(found) => found,
            None if matches!(op, FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte) => return Ok(false),
            None => &null,
        };

        Ok(match op {
            FieldOp::Eq => Self::equals(field_value, value),
            FieldOp::Ne => !Self::equals(field_value, value),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match Comparable::from(field_value).partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                }
            }
            FieldOp::AnyOf => Self::any_of(field_value, value),
            FieldOp::NoneOf => !Self::any_of(field_value, value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Binary, doc, spec::BinarySubtype};
    use docstore_core::query::{Filter, IntoFilter};

    fn matches(record: &Document, filter: Document) -> bool {
        let filter = filter.into_filter().unwrap();
        RecordEvaluator::matches(record, filter.as_ref())
    }

    #[test]
    fn equality_normalizes_numbers() {
        let record = doc! { "name": "Sara", "age": 27_i64 };
        assert!(matches(&record, doc! { "age": 27 }));
        assert!(matches(&record, doc! { "age": 27.0 }));
        assert!(!matches(&record, doc! { "age": 28 }));
    }

    #[test]
    fn empty_filter_matches() {
        assert!(matches(&doc! { "name": "Ali" }, doc! {}));
    }

    #[test]
    fn ranges_and_membership() {
        let record = doc! { "age": 23 };
        assert!(matches(&record, doc! { "age": { "$gte": 23, "$lt": 25 } }));
        assert!(!matches(&record, doc! { "age": { "$gt": 23 } }));
        assert!(matches(&record, doc! { "age": { "$in": [22, 23] } }));
        assert!(matches(&record, doc! { "age": { "$nin": [24, 25] } }));
    }

    #[test]
    fn missing_fields() {
        let record = doc! { "name": "Huda" };
        assert!(!matches(&record, doc! { "age": 27 }));
        assert!(matches(&record, doc! { "age": { "$ne": 27 } }));
        assert!(matches(&record, doc! { "age": { "$exists": false } }));
    }

    #[test]
    fn array_fields_match_any_element() {
        let record = doc! { "tags": ["admin", "staff"] };
        assert!(matches(&record, doc! { "tags": "staff" }));
        assert!(!matches(&record, doc! { "tags": "guest" }));
    }

    #[test]
    fn null_matches_missing_fields() {
        let record = doc! { "name": "Huda" };
        assert!(matches(&record, doc! { "age": Bson::Null }));
        assert!(!matches(&record, doc! { "age": { "$ne": Bson::Null } }));
        assert!(!matches(&record, doc! { "age": { "$lt": 30 } }));
    }

    #[test]
    fn unordered_types_need_exact_equality() {
        let blob = |bytes: Vec<u8>| {
            Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes,
            })
        };
        let record = doc! { "blob": blob(vec![1, 2, 3]) };

        assert!(matches(&record, doc! { "blob": blob(vec![1, 2, 3]) }));
        assert!(!matches(&record, doc! { "blob": blob(vec![9, 9, 9]) }));
        assert!(!matches(&record, doc! { "blob": Bson::Null }));
        assert!(!matches(&record, doc! { "blob": { "$gt": blob(vec![0]) } }));
    }

    #[test]
    fn large_integers_compare_exactly() {
        let record = doc! { "big": 9_007_199_254_740_993_i64 };

        assert!(matches(&record, doc! { "big": 9_007_199_254_740_993_i64 }));
        assert!(!matches(&record, doc! { "big": 9_007_199_254_740_992_i64 }));
        assert!(!matches(&record, doc! { "big": 9_007_199_254_740_992.0 }));
        assert!(matches(&record, doc! { "big": { "$gt": 9_007_199_254_740_992.0 } }));
    }

    #[test]
    fn integers_against_floats() {
        let record = doc! { "age": 27 };
        assert!(matches(&record, doc! { "age": { "$lt": 27.5 } }));
        assert!(matches(&record, doc! { "age": { "$gt": 26.5 } }));
        assert!(!matches(&record, doc! { "age": 27.5 }));
        assert!(!matches(&record, doc! { "age": { "$lt": f64::NAN } }));

        let record = doc! { "score": -5.5 };
        assert!(matches(&record, doc! { "score": { "$lt": -5 } }));
        assert!(matches(&record, doc! { "score": { "$gt": -6 } }));
    }

    #[test]
    fn dotted_paths_reach_nested_values() {
        let record = doc! {
            "name": "Sara",
            "address": { "city": "Cairo", "zip": 11511 },
            "phones": ["0100", "0111"],
        };

        assert!(matches(&record, doc! { "address.city": "Cairo" }));
        assert!(!matches(&record, doc! { "address.city": "Giza" }));
        assert!(matches(&record, doc! { "address.zip": { "$gte": 11000 } }));
        assert!(matches(&record, doc! { "phones.1": "0111" }));
        assert!(matches(&record, doc! { "address.street": { "$exists": false } }));
        assert!(matches(&record, doc! { "address.city": { "$exists": true } }));
        assert!(!matches(&record, doc! { "name.first": "Sara" }));
    }

    #[test]
    fn logical_combinations() {
        let record = doc! { "name": "Omar", "age": 27 };
        let expr = Filter::eq("age", 20).or(Filter::eq("name", "Omar"));
        assert!(RecordEvaluator::matches(&record, Some(&expr)));
        assert!(!RecordEvaluator::matches(&record, Some(&expr.not())));
    }
}
