use crate::{PaginationError, Record, Result, Value, ValueKind};
use ::itertools::Itertools;
use ::std::cmp::Ordering;
use ::std::collections::HashSet;
use ::std::fmt;
use ::std::str::FromStr;

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[display("ASC")]
    Ascending,
    #[display("DESC")]
    Descending,
}

impl Direction {
    pub fn invert(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Orients an ascending comparison to this direction.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct OrderField {
    pub name: String,
    pub direction: Direction,
    /// When set, decoded cursor values for this field are coerced to `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValueKind>,
}

impl OrderField {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Ascending,
            kind: None,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Descending,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn inverted(&self) -> Self {
        Self {
            direction: self.direction.invert(),
            ..self.clone()
        }
    }
}

/// The fields a collection is paginated by, most significant first.
///
/// Guaranteed non-empty with unique field names. Whether the fields are
/// jointly unique per record is up to the caller; see
/// [`OrderingSpec::with_tiebreaker`].
#[derive(Clone, Debug, Deref, Eq, Hash, PartialEq, Serialize)]
pub struct OrderingSpec(Vec<OrderField>);

impl OrderingSpec {
    pub fn new(fields: impl IntoIterator<Item = OrderField>) -> Result<Self> {
        let fields = fields.into_iter().collect_vec();
        if fields.is_empty() {
            return Err(PaginationError::InvalidOrdering("ordering must name at least one field".into()));
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if field.name.is_empty() {
                return Err(PaginationError::InvalidOrdering("field names cannot be empty".into()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(PaginationError::InvalidOrdering(
                    format!("field `{}` is listed more than once", field.name).into(),
                ));
            }
        }
        Ok(Self(fields))
    }

    /// Appends `name` ascending unless the ordering already sorts by it, so
    /// that a unique key always breaks ties.
    pub fn with_tiebreaker(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.0.iter().any(|field| field.name == name) && !name.is_empty() {
            self.0.push(OrderField::asc(name));
        }
        self
    }

    /// Every direction flipped, field order untouched.
    pub fn invert(&self) -> Self {
        Self(self.0.iter().map(OrderField::inverted).collect())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(|field| field.name.as_str())
    }

    pub fn all_ascending(&self) -> bool {
        self.0.iter().all(|field| field.direction == Direction::Ascending)
    }

    pub fn all_descending(&self) -> bool {
        self.0.iter().all(|field| field.direction == Direction::Descending)
    }

    pub fn is_uniform(&self) -> bool {
        self.all_ascending() || self.all_descending()
    }

    /// Compares two records under this ordering. Missing fields read as null.
    pub fn compare<R: Record + ?Sized>(&self, lhs: &R, rhs: &R) -> Ordering {
        self.0
            .iter()
            .map(|field| {
                let lhs = lhs.field(&field.name).unwrap_or(Value::Null);
                let rhs = rhs.field(&field.name).unwrap_or(Value::Null);
                field.direction.apply(lhs.cmp(&rhs))
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// Parses the `-created_at,id` form: comma separated names, a leading `-`
/// marking a descending field.
impl FromStr for OrderingSpec {
    type Err = PaginationError;

    fn from_str(value: &str) -> Result<Self> {
        let fields = value
            .split(',')
            .map(str::trim)
            .map(|item| match item.strip_prefix('-') {
                Some(name) => OrderField::desc(name),
                None => OrderField::asc(item),
            })
            .collect_vec();
        if let Some(field) = fields.iter().find(|field| field.name.contains("__")) {
            return Err(PaginationError::InvalidOrdering(
                format!("`{}` looks like a related lookup, order by a field of the record itself", field.name).into(),
            ));
        }
        Self::new(fields)
    }
}

impl fmt::Display for OrderingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(|field| match field.direction {
                Direction::Ascending => field.name.clone(),
                Direction::Descending => format!("-{}", field.name),
            })
            .join(",");
        f.write_str(&rendered)
    }
}

impl<'de> ::serde::Deserialize<'de> for OrderingSpec {
    fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let fields = <Vec<OrderField> as ::serde::Deserialize>::deserialize(deserializer)?;
        Self::new(fields).map_err(::serde::de::Error::custom)
    }
}
