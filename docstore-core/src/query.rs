//! Filter construction for record queries.
//!
//! Filters are an expression tree ([`Expr`]) that every backend knows how to
//! evaluate or translate through a [`QueryVisitor`]. They can be built with the
//! [`Filter`] helpers or converted from a mapping in the familiar document
//! database style:
//!
//! ```ignore
//! use bson::doc;
//! use docstore::query::{Filter, IntoFilter};
//!
//! // Equivalent filters
//! let a = doc! { "age": 27 }.into_filter()?;
//! let b = Filter::eq("age", 27).into_filter()?;
//!
//! // Operators and logical combinations
//! let c = doc! { "age": { "$gte": 20, "$lt": 25 }, "name": { "$exists": true } }.into_filter()?;
//! ```
//!
//! An empty mapping matches every record.

use bson::{Bson, Document};

use crate::error::{DataStoreError, DataStoreResult};

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Equal to. An array field matches when any element is equal.
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Field equals any of the values in an array.
    AnyOf,
    /// Field equals none of the values in an array.
    NoneOf,
}

impl FieldOp {
    /// Maps a `$`-prefixed mapping operator to a field op.
    fn from_operator(operator: &str) -> Option<Self> {
        Some(match operator {
            "$eq" => FieldOp::Eq,
            "$ne" => FieldOp::Ne,
            "$gt" => FieldOp::Gt,
            "$gte" => FieldOp::Gte,
            "$lt" => FieldOp::Lt,
            "$lte" => FieldOp::Lte,
            "$in" => FieldOp::AnyOf,
            "$nin" => FieldOp::NoneOf,
            _ => return None,
        })
    }
}

/// A filter expression for matching records.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression.
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression.
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// A query against a single collection: an optional filter and an optional cap.
///
/// `None` for the filter matches every record; `None` for the limit is unbounded.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Option<Expr>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(filter: Option<Expr>, limit: Option<usize>) -> Self {
        Query { filter, limit }
    }

    /// Builds a query from a caller-facing limit where zero or negative means unbounded.
    pub fn with_signed_limit(filter: Option<Expr>, limit: i64) -> Self {
        Query {
            filter,
            limit: usize::try_from(limit).ok().filter(|limit| *limit > 0),
        }
    }
}

/// Helper constructors for filter expressions.
pub struct Filter;

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn any_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, values.into())
    }

    pub fn none_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, values.into())
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// Converts a filter mapping into an expression.
    ///
    /// Returns `Ok(None)` for an empty mapping, which matches every record.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::Validation`] for unknown operators or malformed operands.
    pub fn from_mapping(mapping: &Document) -> DataStoreResult<Option<Expr>> {
        let mut exprs = mapping
            .iter()
            .map(|(key, value)| Self::entry(key, value))
            .collect::<DataStoreResult<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        Ok(match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Expr::And(exprs)),
        })
    }

    fn entry(key: &str, value: &Bson) -> DataStoreResult<Vec<Expr>> {
        match key {
            "$and" => Ok(vec![Expr::And(Self::clauses(key, value)?)]),
            "$or" => Ok(vec![Expr::Or(Self::clauses(key, value)?)]),
            _ if key.starts_with('$') => Err(DataStoreError::Validation(format!(
                "unsupported top-level filter operator {key}"
            ))),
            _ => match value {
                Bson::Document(operators) if Self::is_operator_mapping(operators) => operators
                    .iter()
                    .map(|(operator, operand)| Self::operator(key, operator, operand))
                    .collect(),
                _ => Ok(vec![Filter::eq(key, value.clone())]),
            },
        }
    }

    fn clauses(key: &str, value: &Bson) -> DataStoreResult<Vec<Expr>> {
        let Bson::Array(items) = value else {
            return Err(DataStoreError::Validation(format!("{key} expects an array of filters")));
        };

        items
            .iter()
            .map(|item| match item {
                Bson::Document(mapping) => {
                    Ok(Self::from_mapping(mapping)?.unwrap_or_else(|| Expr::And(vec![])))
                }
                _ => Err(DataStoreError::Validation(format!("{key} expects an array of filters"))),
            })
            .collect()
    }

    fn operator(field: &str, operator: &str, operand: &Bson) -> DataStoreResult<Expr> {
        if operator == "$exists" {
            return match operand {
                Bson::Boolean(flag) => Ok(Expr::Exists(field.to_string(), *flag)),
                _ => Err(DataStoreError::Validation("$exists expects a boolean".to_string())),
            };
        }

        let op = FieldOp::from_operator(operator).ok_or_else(|| {
            DataStoreError::Validation(format!("unsupported filter operator {operator} on {field}"))
        })?;

        if matches!(op, FieldOp::AnyOf | FieldOp::NoneOf) && !matches!(operand, Bson::Array(_)) {
            return Err(DataStoreError::Validation(format!("{operator} expects an array")));
        }

        Ok(Expr::field(field.to_string(), op, operand.clone()))
    }

    fn is_operator_mapping(mapping: &Document) -> bool {
        !mapping.is_empty() && mapping.keys().all(|key| key.starts_with('$'))
    }
}

/// Conversion into an optional filter expression, where `None` matches every record.
pub trait IntoFilter {
    fn into_filter(self) -> DataStoreResult<Option<Expr>>;
}

impl IntoFilter for Document {
    fn into_filter(self) -> DataStoreResult<Option<Expr>> {
        Filter::from_mapping(&self)
    }
}

impl IntoFilter for &Document {
    fn into_filter(self) -> DataStoreResult<Option<Expr>> {
        Filter::from_mapping(self)
    }
}

impl IntoFilter for Expr {
    fn into_filter(self) -> DataStoreResult<Option<Expr>> {
        Ok(Some(self))
    }
}

impl IntoFilter for Option<Expr> {
    fn into_filter(self) -> DataStoreResult<Option<Expr>> {
        Ok(self)
    }
}

/// Walks a filter expression, producing one output per node.
///
/// Backends implement this to evaluate filters in memory or to translate them
/// into a native query language.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DataStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn empty_mapping_matches_everything() {
        assert_eq!(doc! {}.into_filter().unwrap(), None);
    }

    #[test]
    fn plain_values_become_equality() {
        let expr = doc! { "age": 27 }.into_filter().unwrap();
        assert_eq!(expr, Some(Filter::eq("age", 27)));

        let expr = doc! { "age": 27, "name": "Sara" }.into_filter().unwrap();
        assert_eq!(
            expr,
            Some(Filter::and([Filter::eq("age", 27), Filter::eq("name", "Sara")]))
        );
    }

    #[test]
    fn operator_mappings_expand_per_operator() {
        let expr = doc! { "age": { "$gte": 20, "$lt": 25 } }.into_filter().unwrap();
        assert_eq!(
            expr,
            Some(Filter::and([Filter::gte("age", 20), Filter::lt("age", 25)]))
        );

        let expr = doc! { "name": { "$exists": false } }.into_filter().unwrap();
        assert_eq!(expr, Some(Filter::not_exists("name")));
    }

    #[test]
    fn logical_operators_take_arrays() {
        let expr = doc! { "$or": [{ "age": 20 }, { "age": 21 }] }.into_filter().unwrap();
        assert_eq!(
            expr,
            Some(Filter::or([Filter::eq("age", 20), Filter::eq("age", 21)]))
        );

        let err = doc! { "$or": { "age": 20 } }.into_filter().unwrap_err();
        assert!(matches!(err, DataStoreError::Validation(_)));
    }

    #[test]
    fn unknown_operators_are_rejected() {
        let err = doc! { "age": { "$near": 3 } }.into_filter().unwrap_err();
        assert!(matches!(err, DataStoreError::Validation(_)));

        let err = doc! { "$where": "true" }.into_filter().unwrap_err();
        assert!(matches!(err, DataStoreError::Validation(_)));

        let err = doc! { "age": { "$in": 3 } }.into_filter().unwrap_err();
        assert!(matches!(err, DataStoreError::Validation(_)));
    }

    #[test]
    fn nested_documents_without_operators_are_values() {
        let expr = doc! { "address": { "city": "Cairo" } }.into_filter().unwrap();
        assert_eq!(expr, Some(Filter::eq("address", doc! { "city": "Cairo" })));
    }

    #[test]
    fn signed_limits_treat_non_positive_as_unbounded() {
        assert_eq!(Query::with_signed_limit(None, 0).limit, None);
        assert_eq!(Query::with_signed_limit(None, -4).limit, None);
        assert_eq!(Query::with_signed_limit(None, 5).limit, Some(5));
    }
}
