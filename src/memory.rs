use crate::{DataSource, Direction, OrderingSpec, Predicate, Record};
use ::std::convert::Infallible;

/// A [`DataSource`] over records held in memory.
///
/// Records that tie on every ordering field keep their insertion order when
/// the first field ascends and the reverse of it when it descends, so an
/// inverted ordering visits ties exactly backwards.
#[derive(Clone, Debug, Default)]
pub struct MemorySource<R> {
    records: Vec<R>,
}

impl<R> MemorySource<R> {
    pub fn new(records: impl IntoIterator<Item = R>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, record: R) {
        self.records.push(record);
    }

    pub fn retain(&mut self, keep: impl FnMut(&R) -> bool) {
        self.records.retain(keep);
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }
}

impl<R: Clone + Record> DataSource for MemorySource<R> {
    type Record = R;
    type Error = Infallible;

    fn fetch(&self, ordering: &OrderingSpec, predicate: Option<&Predicate>, limit: usize) -> Result<Vec<R>, Infallible> {
        let mut matched = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| predicate.map_or(true, |predicate| predicate.matches(*record)))
            .collect::<Vec<_>>();
        let tie_direction = ordering.first().map_or(Direction::Ascending, |field| field.direction);
        matched.sort_by(|(lhs_index, lhs), (rhs_index, rhs)| {
            ordering
                .compare(*lhs, *rhs)
                .then_with(|| tie_direction.apply(lhs_index.cmp(rhs_index)))
        });
        Ok(matched.into_iter().take(limit).map(|(_, record)| record.clone()).collect())
    }
}

impl<R> FromIterator<R> for MemorySource<R> {
    fn from_iter<I: IntoIterator<Item = R>>(records: I) -> Self {
        Self::new(records)
    }
}
