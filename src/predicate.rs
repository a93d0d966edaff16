use crate::{Direction, OrderingSpec, PaginationError, Position, Record, Result, Value, TRACING_TARGET_PLANNER};
use ::itertools::Itertools;
use ::std::cmp::Ordering;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Comparison {
    #[display("=")]
    Eq,
    #[display(">")]
    Gt,
    #[display(">=")]
    GtEq,
    #[display("<")]
    Lt,
    #[display("<=")]
    LtEq,
}

impl Comparison {
    /// The comparison selecting rows after a value under `direction`.
    pub fn after(direction: Direction, inclusive: bool) -> Self {
        match (direction, inclusive) {
            (Direction::Ascending, false) => Self::Gt,
            (Direction::Ascending, true) => Self::GtEq,
            (Direction::Descending, false) => Self::Lt,
            (Direction::Descending, true) => Self::LtEq,
        }
    }

    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering.is_eq(),
            Self::Gt => ordering.is_gt(),
            Self::GtEq => ordering.is_ge(),
            Self::Lt => ordering.is_lt(),
            Self::LtEq => ordering.is_le(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldComparison {
    pub field: String,
    pub op: Comparison,
    pub value: Value,
}

impl FieldComparison {
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        let value = record.field(&self.field).unwrap_or(Value::Null);
        self.op.holds(value.cmp(&self.value))
    }
}

/// "Record is after this position", as handed to the data source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    /// A disjunction of conjunctions: `(f1 > v1) OR (f1 = v1 AND f2 > v2) OR ...`.
    Chained(Vec<Vec<FieldComparison>>),
    /// A single row comparison: `(f1, .., fn) > (v1, .., vn)`.
    Tuple {
        fields: Vec<String>,
        op: Comparison,
        values: Vec<Value>,
    },
}

impl Predicate {
    /// Records whose every field equals `position`.
    pub fn tied_with(position: &Position) -> Self {
        let equals = position
            .iter()
            .map(|(field, value)| FieldComparison {
                field: field.clone(),
                op: Comparison::Eq,
                value: value.clone(),
            })
            .collect_vec();
        Self::Chained(vec![equals])
    }

    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        match self {
            Self::Chained(clauses) => clauses
                .iter()
                .any(|clause| clause.iter().all(|comparison| comparison.matches(record))),
            Self::Tuple { fields, op, values } => {
                let ordering = fields
                    .iter()
                    .zip(values)
                    .map(|(field, value)| record.field(field).unwrap_or(Value::Null).cmp(value))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal);
                op.holds(ordering)
            }
        }
    }
}

/// How a [`Predicate`] is shaped. Both strategies select the same rows.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum PredicateStrategy {
    #[default]
    Chained,
    /// One row comparison, which engines with a composite index on the
    /// ordering fields tend to scan faster. Only expressible when every field
    /// sorts the same way.
    Tuple,
}

impl PredicateStrategy {
    /// Picks the strategy for `ordering`. A mixed-direction ordering asked to
    /// use tuple comparison either falls back to chained comparison or fails
    /// with [`PaginationError::IncompatibleOrdering`].
    pub fn resolve(ordering: &OrderingSpec, use_tuple_comparison: bool, fallback: bool) -> Result<Self> {
        match (use_tuple_comparison, ordering.is_uniform(), fallback) {
            (false, _, _) => Ok(Self::Chained),
            (true, true, _) => Ok(Self::Tuple),
            (true, false, true) => {
                tracing::warn!(
                    target: TRACING_TARGET_PLANNER,
                    %ordering,
                    "Tuple comparison needs a uniform ordering, falling back to chained comparison"
                );
                Ok(Self::Chained)
            }
            (true, false, false) => Err(PaginationError::IncompatibleOrdering(ordering.to_string())),
        }
    }

    /// Builds the predicate selecting rows after `position` under `ordering`
    /// (already inverted when paging backwards). `inclusive` relaxes the last
    /// field so rows tied with `position` match too.
    pub fn build(self, ordering: &OrderingSpec, position: &Position, inclusive: bool) -> Result<Predicate> {
        position.check_aligned(ordering)?;
        match self {
            Self::Chained => Ok(chained(ordering, position, inclusive)),
            Self::Tuple => tuple(ordering, position, inclusive),
        }
    }
}

fn chained(ordering: &OrderingSpec, position: &Position, inclusive: bool) -> Predicate {
    let last = ordering.len() - 1;
    let fields = ordering.iter().zip(position.values()).collect_vec();
    let clauses = (0..fields.len())
        .map(|i| {
            let equals = fields[..i].iter().map(|(field, value)| FieldComparison {
                field: field.name.clone(),
                op: Comparison::Eq,
                value: (*value).clone(),
            });
            let (field, value) = fields[i];
            let compare = FieldComparison {
                field: field.name.clone(),
                op: Comparison::after(field.direction, inclusive && i == last),
                value: value.clone(),
            };
            equals.chain([compare]).collect_vec()
        })
        .collect_vec();
    Predicate::Chained(clauses)
}

fn tuple(ordering: &OrderingSpec, position: &Position, inclusive: bool) -> Result<Predicate> {
    if !ordering.is_uniform() {
        return Err(PaginationError::IncompatibleOrdering(ordering.to_string()));
    }
    Ok(Predicate::Tuple {
        fields: ordering.names().map(str::to_owned).collect(),
        op: Comparison::after(ordering[0].direction, inclusive),
        values: position.values().cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::std::collections::BTreeMap;

    fn row(a: i64, b: i64) -> BTreeMap<String, Value> {
        BTreeMap::from([("a".to_string(), Value::Int(a)), ("b".to_string(), Value::Int(b))])
    }

    fn grid() -> Vec<BTreeMap<String, Value>> {
        (0..4).flat_map(|a| (0..4).map(move |b| row(a, b))).collect()
    }

    fn selected(predicate: &Predicate) -> Vec<(i64, i64)> {
        grid()
            .iter()
            .filter(|record| predicate.matches(*record))
            .map(|record| match (&record["a"], &record["b"]) {
                (Value::Int(a), Value::Int(b)) => (*a, *b),
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn chained_shape() {
        let ordering: OrderingSpec = "-a,b".parse().unwrap();
        let position = Position::new([("a", 1), ("b", 2)]);
        let predicate = PredicateStrategy::Chained.build(&ordering, &position, false).unwrap();
        let Predicate::Chained(clauses) = predicate else {
            panic!("expected a chained predicate");
        };
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].iter().map(|c| c.op).collect_vec(), [Comparison::Lt]);
        assert_eq!(clauses[1].iter().map(|c| c.op).collect_vec(), [Comparison::Eq, Comparison::Gt]);
    }

    #[test]
    fn chained_mixed_directions() {
        let ordering: OrderingSpec = "-a,b".parse().unwrap();
        let position = Position::new([("a", 2), ("b", 1)]);
        let predicate = PredicateStrategy::Chained.build(&ordering, &position, false).unwrap();
        let expected = [(2, 2), (2, 3), (0, 0), (0, 1), (0, 2), (0, 3), (1, 0), (1, 1), (1, 2), (1, 3)];
        let mut got = selected(&predicate);
        got.sort();
        let mut expected = expected.to_vec();
        expected.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn inclusive_relaxes_last_field_only() {
        let ordering: OrderingSpec = "a,b".parse().unwrap();
        let position = Position::new([("a", 1), ("b", 2)]);
        let predicate = PredicateStrategy::Chained.build(&ordering, &position, true).unwrap();
        assert!(predicate.matches(&row(1, 2)));
        assert!(!predicate.matches(&row(1, 1)));
        assert!(predicate.matches(&row(2, 0)));
        let Predicate::Chained(clauses) = predicate else {
            panic!("expected a chained predicate");
        };
        assert_eq!(clauses[0][0].op, Comparison::Gt);
        assert_eq!(clauses[1][1].op, Comparison::GtEq);
    }

    #[test]
    fn tuple_shape() {
        let ordering: OrderingSpec = "-a,-b".parse().unwrap();
        let position = Position::new([("a", 1), ("b", 2)]);
        let predicate = PredicateStrategy::Tuple.build(&ordering, &position, false).unwrap();
        assert_eq!(
            predicate,
            Predicate::Tuple {
                fields: vec!["a".into(), "b".into()],
                op: Comparison::Lt,
                values: vec![Value::Int(1), Value::Int(2)],
            }
        );
    }

    #[test]
    fn strategies_agree_on_uniform_orderings() {
        for ordering in ["a,b", "-a,-b"] {
            let ordering: OrderingSpec = ordering.parse().unwrap();
            for (a, b) in [(0, 0), (1, 2), (3, 3), (2, 0)] {
                let position = Position::new([("a", a), ("b", b)]);
                for inclusive in [false, true] {
                    let chained = PredicateStrategy::Chained.build(&ordering, &position, inclusive).unwrap();
                    let tuple = PredicateStrategy::Tuple.build(&ordering, &position, inclusive).unwrap();
                    assert_eq!(selected(&chained), selected(&tuple));
                }
            }
        }
    }

    #[test]
    fn tied_with_selects_equal_positions() {
        let predicate = Predicate::tied_with(&Position::new([("a", 2), ("b", 1)]));
        assert_eq!(selected(&predicate), [(2, 1)]);
    }

    #[test]
    fn tuple_rejects_mixed_directions() {
        let ordering: OrderingSpec = "a,-b".parse().unwrap();
        let position = Position::new([("a", 1), ("b", 1)]);
        assert!(matches!(
            PredicateStrategy::Tuple.build(&ordering, &position, false),
            Err(PaginationError::IncompatibleOrdering(_))
        ));
    }

    #[test]
    fn resolve_strategy() {
        let uniform: OrderingSpec = "a,b".parse().unwrap();
        let mixed: OrderingSpec = "a,-b".parse().unwrap();
        assert_eq!(PredicateStrategy::resolve(&mixed, false, false).unwrap(), PredicateStrategy::Chained);
        assert_eq!(PredicateStrategy::resolve(&uniform, true, false).unwrap(), PredicateStrategy::Tuple);
        assert_eq!(PredicateStrategy::resolve(&mixed, true, true).unwrap(), PredicateStrategy::Chained);
        assert!(matches!(
            PredicateStrategy::resolve(&mixed, true, false),
            Err(PaginationError::IncompatibleOrdering(_))
        ));
    }
}
