//! Query translation from docstore filter expressions to MongoDB query syntax.

use bson::{Bson, Document, doc};

use docstore_core::{
    error::DataStoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Translates filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter; `None` becomes the match-everything `{}`.
    pub(crate) fn translate(filter: Option<&Expr>) -> Result<Document, DataStoreError> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    fn clauses(&mut self, exprs: &[Expr]) -> Result<Vec<Document>, DataStoreError> {
        exprs.iter().map(|expr| self.visit_expr(expr)).collect()
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DataStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // The server rejects an empty $and, and an empty conjunction matches everything
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! { "$and": self.clauses(exprs)? })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // An empty disjunction matches nothing
        if exprs.is_empty() {
            return Ok(doc! { "_id": { "$exists": false } });
        }

        Ok(doc! { "$or": self.clauses(exprs)? })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // $not only applies to field operators, so negate whole clauses with $nor
        Ok(doc! { "$nor": [self.visit_expr(expr)?] })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value.clone() },
                FieldOp::Ne => doc! { "$ne": value.clone() },
                FieldOp::Gt => doc! { "$gt": value.clone() },
                FieldOp::Gte => doc! { "$gte": value.clone() },
                FieldOp::Lt => doc! { "$lt": value.clone() },
                FieldOp::Lte => doc! { "$lte": value.clone() },
                FieldOp::AnyOf | FieldOp::NoneOf => {
                    let operator = if *op == FieldOp::AnyOf { "$in" } else { "$nin" };
                    match value {
                        Bson::Array(values) => doc! { operator: values.clone() },
                        single => doc! { operator: [single.clone()] },
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_core::query::{Filter, IntoFilter};

    fn translate(filter: Document) -> Document {
        let filter = filter.into_filter().unwrap();
        MongoQueryTranslator::translate(filter.as_ref()).unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(translate(doc! {}), doc! {});
    }

    #[test]
    fn equality_uses_eq() {
        assert_eq!(translate(doc! { "age": 27 }), doc! { "age": { "$eq": 27 } });
    }

    #[test]
    fn several_entries_become_and() {
        assert_eq!(
            translate(doc! { "age": { "$gte": 20, "$lt": 25 } }),
            doc! { "$and": [{ "age": { "$gte": 20 } }, { "age": { "$lt": 25 } }] }
        );
    }

    #[test]
    fn membership_and_negation() {
        assert_eq!(
            translate(doc! { "age": { "$in": [20, 21] } }),
            doc! { "age": { "$in": [20, 21] } }
        );

        let expr = Filter::eq("name", "Omar").not();
        assert_eq!(
            MongoQueryTranslator::translate(Some(&expr)).unwrap(),
            doc! { "$nor": [{ "name": { "$eq": "Omar" } }] }
        );
    }

    #[test]
    fn empty_logical_groups() {
        assert_eq!(MongoQueryTranslator::translate(Some(&Expr::And(vec![]))).unwrap(), doc! {});
        assert_eq!(
            MongoQueryTranslator::translate(Some(&Expr::Or(vec![]))).unwrap(),
            doc! { "_id": { "$exists": false } }
        );
    }
}
