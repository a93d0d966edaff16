//! Rendering of cursor predicates and orderings as diesel query fragments.
//!
//! [`Predicate`] is a boolean expression and [`SqlOrdering`] an order clause,
//! so a planned [`PageQuery`] can be applied to a diesel query directly:
//!
//! ```ignore
//! let query = planner.plan(&cursor, page_size)?;
//! let mut statement = posts::table.into_boxed().order(SqlOrdering::from(&query));
//! if let Some(predicate) = query.predicate.clone() {
//!     statement = statement.filter(predicate);
//! }
//! let rows = statement.offset(query.offset as i64).limit(query.limit as i64).load(conn)?;
//! ```
//!
//! Values are bound as parameters and field names are quoted as identifiers.
//! Ordering fields are expected to be non-nullable: a null in the cursor is
//! rendered with `IS NULL` / `IS NOT NULL` as if nulls sorted first, which
//! only matches the engine's sort when it is configured that way.

use crate::{Comparison, Direction, FieldComparison, OrderingSpec, PageQuery, Predicate, Value};
use ::chrono::NaiveDateTime;
use ::diesel::backend::Backend;
use ::diesel::expression::expression_types::NotSelectable;
use ::diesel::expression::{is_aggregate, AppearsOnTable, Expression, SelectableExpression, ValidGrouping};
use ::diesel::query_builder::{AstPass, QueryFragment, QueryId};
use ::diesel::serialize::ToSql;
use ::diesel::sql_types::{BigInt, Bool, Double, HasSqlType, Text, Timestamp};
use ::diesel::QueryResult;

/// Order clause for a (possibly inverted) [`OrderingSpec`].
#[derive(Clone, Debug)]
pub struct SqlOrdering(pub OrderingSpec);

impl From<&PageQuery> for SqlOrdering {
    fn from(query: &PageQuery) -> Self {
        Self(query.ordering.clone())
    }
}

impl From<OrderingSpec> for SqlOrdering {
    fn from(ordering: OrderingSpec) -> Self {
        Self(ordering)
    }
}

impl Expression for SqlOrdering {
    type SqlType = NotSelectable;
}

impl<QS> AppearsOnTable<QS> for SqlOrdering {}

impl<GB> ValidGrouping<GB> for SqlOrdering {
    type IsAggregate = is_aggregate::Never;
}

impl QueryId for SqlOrdering {
    type QueryId = ();
    const HAS_STATIC_QUERY_ID: bool = false;
}

impl<DB: Backend> QueryFragment<DB> for SqlOrdering {
    fn walk_ast<'b>(&'b self, mut pass: AstPass<'_, 'b, DB>) -> QueryResult<()> {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                pass.push_sql(", ");
            }
            pass.push_identifier(&field.name)?;
            pass.push_sql(match field.direction {
                Direction::Ascending => " ASC",
                Direction::Descending => " DESC",
            });
        }
        Ok(())
    }
}

impl Expression for Predicate {
    type SqlType = Bool;
}

impl<QS> AppearsOnTable<QS> for Predicate {}

impl<QS> SelectableExpression<QS> for Predicate {}

impl<GB> ValidGrouping<GB> for Predicate {
    type IsAggregate = is_aggregate::Never;
}

impl QueryId for Predicate {
    type QueryId = ();
    const HAS_STATIC_QUERY_ID: bool = false;
}

impl<DB> QueryFragment<DB> for Predicate
where
    DB: Backend + HasSqlType<Bool> + HasSqlType<BigInt> + HasSqlType<Double> + HasSqlType<Text> + HasSqlType<Timestamp>,
    bool: ToSql<Bool, DB>,
    i64: ToSql<BigInt, DB>,
    f64: ToSql<Double, DB>,
    str: ToSql<Text, DB>,
    NaiveDateTime: ToSql<Timestamp, DB>,
{
    fn walk_ast<'b>(&'b self, mut pass: AstPass<'_, 'b, DB>) -> QueryResult<()> {
        // null handling changes the statement text with the cursor's values
        pass.unsafe_to_cache_prepared();

        match self {
            Self::Chained(clauses) => {
                pass.push_sql("(");
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        pass.push_sql(" OR ");
                    }
                    pass.push_sql("(");
                    for (j, comparison) in clause.iter().enumerate() {
                        if j > 0 {
                            pass.push_sql(" AND ");
                        }
                        walk_comparison(comparison, pass.reborrow())?;
                    }
                    pass.push_sql(")");
                }
                pass.push_sql(")");
            }
            Self::Tuple { fields, op, values } => {
                if values.iter().any(Value::is_null) {
                    return Err(::diesel::result::Error::QueryBuilderError(
                        "tuple comparison cannot compare against null cursor values".into(),
                    ));
                }
                pass.push_sql("((");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        pass.push_sql(", ");
                    }
                    pass.push_identifier(field)?;
                }
                pass.push_sql(") ");
                pass.push_sql(&op.to_string());
                pass.push_sql(" (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        pass.push_sql(", ");
                    }
                    push_value(value, pass.reborrow())?;
                }
                pass.push_sql("))");
            }
        }
        Ok(())
    }
}

fn walk_comparison<'b, DB>(comparison: &'b FieldComparison, mut pass: AstPass<'_, 'b, DB>) -> QueryResult<()>
where
    DB: Backend + HasSqlType<Bool> + HasSqlType<BigInt> + HasSqlType<Double> + HasSqlType<Text> + HasSqlType<Timestamp>,
    bool: ToSql<Bool, DB>,
    i64: ToSql<BigInt, DB>,
    f64: ToSql<Double, DB>,
    str: ToSql<Text, DB>,
    NaiveDateTime: ToSql<Timestamp, DB>,
{
    // null sorts before every other value
    if comparison.value.is_null() {
        match comparison.op {
            Comparison::Eq | Comparison::LtEq => {
                pass.push_identifier(&comparison.field)?;
                pass.push_sql(" IS NULL");
            }
            Comparison::Gt => {
                pass.push_identifier(&comparison.field)?;
                pass.push_sql(" IS NOT NULL");
            }
            Comparison::GtEq => pass.push_sql("1 = 1"),
            Comparison::Lt => pass.push_sql("1 = 0"),
        }
        return Ok(());
    }
    pass.push_identifier(&comparison.field)?;
    pass.push_sql(" ");
    pass.push_sql(&comparison.op.to_string());
    pass.push_sql(" ");
    push_value(&comparison.value, pass)
}

fn push_value<'b, DB>(value: &'b Value, mut pass: AstPass<'_, 'b, DB>) -> QueryResult<()>
where
    DB: Backend + HasSqlType<Bool> + HasSqlType<BigInt> + HasSqlType<Double> + HasSqlType<Text> + HasSqlType<Timestamp>,
    bool: ToSql<Bool, DB>,
    i64: ToSql<BigInt, DB>,
    f64: ToSql<Double, DB>,
    str: ToSql<Text, DB>,
    NaiveDateTime: ToSql<Timestamp, DB>,
{
    match value {
        Value::Null => {
            pass.push_sql("NULL");
            Ok(())
        }
        Value::Bool(value) => pass.push_bind_param::<Bool, _>(value),
        Value::Int(value) => pass.push_bind_param::<BigInt, _>(value),
        Value::Float(value) => pass.push_bind_param::<Double, _>(value),
        Value::Text(value) => pass.push_bind_param::<Text, _>(value.as_str()),
        Value::Timestamp(value) => pass.push_bind_param::<Timestamp, _>(value),
    }
}
