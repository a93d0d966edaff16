use crate::{PaginationError, Result};
use ::chrono::{DateTime, NaiveDateTime};
use ::std::cmp::Ordering;

/// A scalar held by an ordering field.
///
/// The set of kinds is closed so that cursor encoding stays exhaustive; every
/// field type a data source can order by has to map onto one of these.
#[derive(Clone, Debug, Deserialize, IsVariant, Serialize)]
pub enum Value {
    #[serde(rename = "n")]
    Null,
    #[serde(rename = "b")]
    Bool(bool),
    #[serde(rename = "i")]
    Int(i64),
    /// Written as text so that non-finite values survive a cursor round trip.
    #[serde(rename = "f", with = "float_text")]
    Float(f64),
    #[serde(rename = "s")]
    Text(String),
    #[serde(rename = "t")]
    Timestamp(NaiveDateTime),
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    #[display("bool")]
    Bool,
    #[display("int")]
    Int,
    #[display("float")]
    Float,
    #[display("text")]
    Text,
    #[display("timestamp")]
    Timestamp,
}

impl Value {
    /// `None` for [`Value::Null`], which is acceptable for every kind.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Timestamp(_) => Some(ValueKind::Timestamp),
        }
    }

    /// Converts the value to `kind` without losing information, or fails with
    /// [`PaginationError::MalformedCursor`].
    pub fn coerce(self, kind: ValueKind) -> Result<Self> {
        if self.kind().map_or(true, |own| own == kind) {
            return Ok(self);
        }
        let coerced = match (&self, kind) {
            (Self::Int(int), ValueKind::Float) => {
                let float = *int as f64;
                (float as i64 == *int).then_some(Self::Float(float))
            }
            (Self::Float(float), ValueKind::Int) => {
                let in_range = *float >= i64::MIN as f64 && *float < i64::MAX as f64;
                (in_range && float.fract() == 0.0).then(|| Self::Int(*float as i64))
            }
            (Self::Text(text), ValueKind::Timestamp) => parse_timestamp(text).map(Self::Timestamp),
            (Self::Text(text), ValueKind::Int) => text.parse().ok().map(Self::Int),
            (Self::Text(text), ValueKind::Bool) => text.parse().ok().map(Self::Bool),
            _ => None,
        };
        coerced.ok_or_else(|| PaginationError::malformed(format!("cannot read {self:?} as {kind}")))
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
            Self::Timestamp(_) => 4,
        }
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(text)
        .map(|datetime| datetime.naive_utc())
        .or_else(|_| text.parse::<NaiveDateTime>())
        .ok()
}

/// Nulls first, then booleans, numbers, text and timestamps. Integers and
/// floats compare by magnitude, an integer sorting before an equal float.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(lhs), Bool(rhs)) => lhs.cmp(rhs),
            (Int(lhs), Int(rhs)) => lhs.cmp(rhs),
            (Float(lhs), Float(rhs)) => lhs.total_cmp(rhs),
            (Int(lhs), Float(rhs)) => (*lhs as f64).total_cmp(rhs).then(Ordering::Less),
            (Float(lhs), Int(rhs)) => lhs.total_cmp(&(*rhs as f64)).then(Ordering::Greater),
            (Text(lhs), Text(rhs)) => lhs.cmp(rhs),
            (Timestamp(lhs), Timestamp(rhs)) => lhs.cmp(rhs),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    NaiveDateTime => Timestamp,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => Self::Null,
            Json::Bool(bool) => Self::Bool(bool),
            Json::Number(number) => match number.as_i64() {
                Some(int) => Self::Int(int),
                None => number.as_f64().map_or(Self::Null, Self::Float),
            },
            Json::String(text) => Self::Text(text),
            other => Self::Text(other.to_string()),
        }
    }
}

mod float_text {
    use ::serde::de::Error;
    use ::serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}
