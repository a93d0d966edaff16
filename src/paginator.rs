use crate::{
    BoxError, Cursor, CursorCodec, CursorDirection, OrderingSpec, Page, PagePlanner, PageQuery, PaginationConfig,
    PaginationError, Predicate, Record, Result, TRACING_TARGET_PAGINATOR,
};

/// The storage engine a [`Paginator`] reads from.
///
/// `fetch` returns at most `limit` records matching `predicate` (all records
/// when `None`), sorted by `ordering`. Timeouts and retries are the source's
/// business.
pub trait DataSource {
    type Record: Record;
    type Error: Into<BoxError>;

    fn fetch(
        &self,
        ordering: &OrderingSpec,
        predicate: Option<&Predicate>,
        limit: usize,
    ) -> Result<Vec<Self::Record>, Self::Error>;
}

impl<S: DataSource + ?Sized> DataSource for &S {
    type Record = S::Record;
    type Error = S::Error;

    fn fetch(
        &self,
        ordering: &OrderingSpec,
        predicate: Option<&Predicate>,
        limit: usize,
    ) -> Result<Vec<Self::Record>, Self::Error> {
        (**self).fetch(ordering, predicate, limit)
    }
}

/// Cursor pagination over one ordering, driven end to end against a
/// [`DataSource`].
#[derive(Clone, Debug)]
pub struct Paginator {
    config: PaginationConfig,
    planner: PagePlanner,
}

impl Paginator {
    pub fn new(config: PaginationConfig, ordering: OrderingSpec) -> Result<Self> {
        config.validate()?;
        let planner = PagePlanner::with_tuple_comparison(
            ordering,
            config.use_tuple_comparison,
            config.tuple_comparison_fallback,
        )?
        .with_max_page_size(config.max_page_size);
        Ok(Self { config, planner })
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    pub fn planner(&self) -> &PagePlanner {
        &self.planner
    }

    pub fn ordering(&self) -> &OrderingSpec {
        self.planner.ordering()
    }

    pub fn first_page<S: DataSource>(&self, source: &S, page_size: Option<usize>) -> Result<Page<S::Record>> {
        self.fetch_page(source, &Cursor::start(), page_size)
    }

    /// The final records of the sequence, for walking it backwards.
    pub fn last_page<S: DataSource>(&self, source: &S, page_size: Option<usize>) -> Result<Page<S::Record>> {
        self.fetch_page(source, &Cursor::end(), page_size)
    }

    /// Follows a `next_cursor` token.
    pub fn page_after<S: DataSource>(&self, source: &S, token: &str, page_size: Option<usize>) -> Result<Page<S::Record>> {
        let cursor = self.decode_directed(token, CursorDirection::Following)?;
        self.fetch_page(source, &cursor, page_size)
    }

    /// Follows a `previous_cursor` token.
    pub fn page_before<S: DataSource>(&self, source: &S, token: &str, page_size: Option<usize>) -> Result<Page<S::Record>> {
        let cursor = self.decode_directed(token, CursorDirection::Preceding)?;
        self.fetch_page(source, &cursor, page_size)
    }

    /// Follows any token in whichever direction it points, or starts from
    /// the first page without one.
    pub fn page<S: DataSource>(&self, source: &S, token: Option<&str>, page_size: Option<usize>) -> Result<Page<S::Record>> {
        let cursor = match token {
            None => Cursor::start(),
            Some(token) => self.decode(token)?,
        };
        self.fetch_page(source, &cursor, page_size)
    }

    /// Decodes a token against this paginator's ordering and offset cutoff.
    pub fn decode(&self, token: &str) -> Result<Cursor> {
        let cursor = CursorCodec::decode_for(token, self.ordering())?;
        if cursor.offset > self.config.offset_cutoff {
            return Err(PaginationError::malformed(format!(
                "offset {} exceeds the cutoff of {}",
                cursor.offset, self.config.offset_cutoff
            )));
        }
        Ok(cursor)
    }

    fn decode_directed(&self, token: &str, expected: CursorDirection) -> Result<Cursor> {
        let cursor = self.decode(token)?;
        match cursor.direction() == expected {
            true => Ok(cursor),
            false => Err(PaginationError::malformed(format!(
                "expected a {expected:?} cursor, got a {:?} one",
                cursor.direction()
            ))),
        }
    }

    fn fetch_page<S: DataSource>(&self, source: &S, cursor: &Cursor, page_size: Option<usize>) -> Result<Page<S::Record>> {
        let page_size = self.config.resolve_page_size(page_size)?;
        let query = self.planner.plan(cursor, page_size)?;
        let rows = source
            .fetch(&query.ordering, query.predicate.as_ref(), query.fetch_limit())
            .map_err(|err| PaginationError::DataSource(err.into()))?;
        tracing::debug!(
            target: TRACING_TARGET_PAGINATOR,
            fetched = rows.len(),
            skipped = query.offset,
            "Fetched rows"
        );
        let rows = rows.into_iter().skip(query.offset).collect::<Vec<_>>();
        let tie_size = match self.planner.tie_query(&query, &rows)? {
            None => None,
            Some(predicate) => self.count_tie(source, &query, &predicate)?,
        };
        self.planner.assemble_with_tie_size(&query, rows, tie_size)
    }

    /// Counts the records tied with the incoming cursor's position, or `None`
    /// when the previous cursor would need an offset beyond the cutoff.
    fn count_tie<S: DataSource>(&self, source: &S, query: &PageQuery, predicate: &Predicate) -> Result<Option<usize>> {
        let limit = query.offset.saturating_add(self.config.offset_cutoff).saturating_add(1);
        let tied = source
            .fetch(&query.ordering, Some(predicate), limit)
            .map_err(|err| PaginationError::DataSource(err.into()))?;
        tracing::debug!(target: TRACING_TARGET_PAGINATOR, tied = tied.len(), "Counted tie");
        Ok((tied.len() < limit).then_some(tied.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySource, Value};
    use ::std::collections::BTreeMap;

    type Row = BTreeMap<String, Value>;

    fn rows(n: i64) -> MemorySource<Row> {
        MemorySource::new((1..=n).map(|id| BTreeMap::from([("id".to_string(), Value::Int(id))])))
    }

    fn paginator(page_size: usize) -> Paginator {
        let config = PaginationConfig {
            page_size,
            max_page_size: 10,
            ..Default::default()
        };
        Paginator::new(config, "id".parse().unwrap()).unwrap()
    }

    struct Failing;

    impl DataSource for Failing {
        type Record = Row;
        type Error = std::io::Error;

        fn fetch(&self, _: &OrderingSpec, _: Option<&Predicate>, _: usize) -> Result<Vec<Row>, Self::Error> {
            Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "fetch timed out"))
        }
    }

    #[test]
    fn page_size_is_validated() {
        let paginator = paginator(3);
        assert!(matches!(
            paginator.first_page(&rows(5), Some(11)),
            Err(PaginationError::InvalidPageSize { .. })
        ));
        assert!(matches!(
            paginator.first_page(&rows(5), Some(0)),
            Err(PaginationError::InvalidPageSize { .. })
        ));
        assert_eq!(paginator.first_page(&rows(5), None).unwrap().len(), 3);
    }

    #[test]
    fn direction_mismatch_is_malformed() {
        let paginator = paginator(2);
        let source = rows(5);
        let first = paginator.first_page(&source, None).unwrap();
        let next = first.next_cursor.unwrap();
        assert!(matches!(
            paginator.page_before(&source, &next, None),
            Err(PaginationError::MalformedCursor(_))
        ));
        assert_eq!(paginator.page(&source, Some(next.as_str()), None).unwrap().len(), 2);
    }

    #[test]
    fn offset_cutoff_is_enforced() {
        let paginator = paginator(2);
        let cursor = Cursor::following(crate::Position::new([("id", 1)]), 5000);
        let token = CursorCodec::encode(&cursor).unwrap();
        assert!(matches!(paginator.decode(&token), Err(PaginationError::MalformedCursor(_))));
    }

    #[test]
    fn incompatible_ordering_is_rejected_up_front() {
        let config = PaginationConfig {
            use_tuple_comparison: true,
            ..Default::default()
        };
        assert!(matches!(
            Paginator::new(config.clone(), "-created_at,id".parse().unwrap()),
            Err(PaginationError::IncompatibleOrdering(_))
        ));
        let fallback = PaginationConfig {
            tuple_comparison_fallback: true,
            ..config
        };
        assert!(Paginator::new(fallback, "-created_at,id".parse().unwrap()).is_ok());
    }

    #[test]
    fn tie_beyond_the_cutoff_is_skipped_on_the_way_back() {
        let config = PaginationConfig {
            page_size: 1,
            offset_cutoff: 2,
            ..Default::default()
        };
        let paginator = Paginator::new(config, "score".parse().unwrap()).unwrap();
        let source = MemorySource::new((1..=6).map(|id| {
            BTreeMap::from([("score".to_string(), Value::Int(7)), ("id".to_string(), Value::Int(id))])
        }));
        let first = paginator.first_page(&source, None).unwrap();
        let second = paginator.page_after(&source, first.next_cursor.as_deref().unwrap(), None).unwrap();
        let previous = CursorCodec::decode(second.previous_cursor.as_deref().unwrap()).unwrap();
        assert_eq!(previous, Cursor::preceding(crate::Position::new([("score", 7)]), 0));
        assert!(paginator.page_before(&source, second.previous_cursor.as_deref().unwrap(), None).unwrap().is_empty());
    }

    #[test]
    fn source_errors_are_propagated() {
        let err = paginator(2).first_page(&Failing, None).unwrap_err();
        assert!(matches!(err, PaginationError::DataSource(_)));
        assert!(err.to_string().contains("fetch timed out"));
    }
}
