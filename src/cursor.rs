use crate::{OrderingSpec, PaginationError, Record, Result, Value};
use ::itertools::Itertools;

/// The ordering-field values of a boundary record, in ordering order.
#[derive(Clone, Debug, Default, Deref, Eq, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct Position(Vec<(String, Value)>);

impl Position {
    pub fn new<K: Into<String>, V: Into<Value>>(fields: impl IntoIterator<Item = (K, V)>) -> Self {
        Self(fields.into_iter().map(|(name, value)| (name.into(), value.into())).collect())
    }

    /// Reads the ordering fields off `record`.
    pub fn of<R: Record + ?Sized>(ordering: &OrderingSpec, record: &R) -> Result<Self> {
        ordering
            .names()
            .map(|name| {
                record
                    .field(name)
                    .map(|value| (name.to_owned(), value))
                    .ok_or_else(|| PaginationError::MissingField(name.to_owned()))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(field, _)| field == name).map(|(_, value)| value)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.0.iter().map(|(_, value)| value)
    }

    /// Fails unless the position names exactly the fields of `ordering`, in
    /// the same order.
    pub fn check_aligned(&self, ordering: &OrderingSpec) -> Result<()> {
        let aligned = self.0.len() == ordering.len()
            && self.0.iter().zip(ordering.names()).all(|((field, _), name)| field == name);
        match aligned {
            true => Ok(()),
            false => Err(PaginationError::malformed(format!(
                "cursor position ({}) does not match ordering `{ordering}`",
                self.0.iter().map(|(field, _)| field).join(","),
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum CursorDirection {
    Following,
    Preceding,
}

/// A traversal position.
///
/// `position: None` is the start of the sequence, or its end when `reverse`
/// is set. A positive `offset` counts records tied with `position` that were
/// already consumed in the cursor's direction; those are included by the next
/// fetch and then skipped.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Cursor {
    pub offset: usize,
    pub reverse: bool,
    pub position: Option<Position>,
}

impl Cursor {
    pub fn start() -> Self {
        Self::default()
    }

    pub fn end() -> Self {
        Self {
            reverse: true,
            ..Self::default()
        }
    }

    pub fn following(position: Position, offset: usize) -> Self {
        Self {
            offset,
            reverse: false,
            position: Some(position),
        }
    }

    pub fn preceding(position: Position, offset: usize) -> Self {
        Self {
            offset,
            reverse: true,
            position: Some(position),
        }
    }

    pub fn direction(&self) -> CursorDirection {
        match self.reverse {
            false => CursorDirection::Following,
            true => CursorDirection::Preceding,
        }
    }

    /// Whether rows tied with the position are matched and then skipped,
    /// rather than excluded by a strict comparison.
    pub fn is_inclusive(&self) -> bool {
        self.offset > 0
    }

    pub fn is_edge(&self) -> bool {
        self.position.is_none() && self.offset == 0
    }
}
