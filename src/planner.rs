use crate::{
    Cursor, OrderingSpec, Page, PaginationError, Predicate, PredicateStrategy, Record, Result, DEFAULT_MAX_PAGE_SIZE,
    TRACING_TARGET_PLANNER,
};

/// What to ask the data source for: records matching `predicate`, sorted by
/// `ordering`, skipping `offset` and returning at most `limit`.
///
/// `limit` is one more than the page size so that a full fetch reveals
/// whether another page follows.
#[derive(Clone, Debug, PartialEq)]
pub struct PageQuery {
    pub ordering: OrderingSpec,
    pub predicate: Option<Predicate>,
    pub offset: usize,
    pub limit: usize,
    pub(crate) cursor: Cursor,
    pub(crate) page_size: usize,
}

impl PageQuery {
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The limit for sources that cannot skip rows themselves: fetch this
    /// many and drop the first `offset`.
    pub fn fetch_limit(&self) -> usize {
        self.offset.saturating_add(self.limit)
    }
}

/// Turns cursors into queries and query results into pages.
///
/// The planner holds no per-request state; one instance serves any number of
/// concurrent requests against the same ordering.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PagePlanner {
    ordering: OrderingSpec,
    strategy: PredicateStrategy,
    max_page_size: usize,
}

impl PagePlanner {
    pub fn new(ordering: OrderingSpec, strategy: PredicateStrategy) -> Self {
        Self {
            ordering,
            strategy,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn with_max_page_size(self, max_page_size: usize) -> Self {
        Self { max_page_size, ..self }
    }

    /// A planner whose strategy is resolved from the tuple comparison settings.
    pub fn with_tuple_comparison(ordering: OrderingSpec, use_tuple_comparison: bool, fallback: bool) -> Result<Self> {
        let strategy = PredicateStrategy::resolve(&ordering, use_tuple_comparison, fallback)?;
        Ok(Self::new(ordering, strategy))
    }

    pub fn ordering(&self) -> &OrderingSpec {
        &self.ordering
    }

    pub fn strategy(&self) -> PredicateStrategy {
        self.strategy
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Builds the query for the page following `cursor` in its direction.
    ///
    /// Reverse cursors invert every field of the ordering, so "before the
    /// position" becomes "after the position" and one predicate builder serves
    /// both directions.
    pub fn plan(&self, cursor: &Cursor, page_size: usize) -> Result<PageQuery> {
        let limit = match page_size {
            0 => None,
            size if size > self.max_page_size => None,
            size => size.checked_add(1),
        }
        .ok_or_else(|| PaginationError::InvalidPageSize {
            requested: page_size.to_string(),
            max: self.max_page_size,
        })?;
        if cursor.offset.checked_add(limit).is_none() {
            return Err(PaginationError::malformed(format!("offset {} is out of range", cursor.offset)));
        }
        let ordering = match cursor.reverse {
            false => self.ordering.clone(),
            true => self.ordering.invert(),
        };
        let predicate = cursor
            .position
            .as_ref()
            .map(|position| self.strategy.build(&ordering, position, cursor.is_inclusive()))
            .transpose()?;

        tracing::debug!(
            target: TRACING_TARGET_PLANNER,
            ordering = %ordering,
            strategy = ?self.strategy,
            offset = cursor.offset,
            page_size,
            has_predicate = predicate.is_some(),
            "Planned page query"
        );

        Ok(PageQuery {
            ordering,
            predicate,
            offset: cursor.offset,
            limit,
            cursor: cursor.clone(),
            page_size,
        })
    }

    /// Builds the page from the rows fetched for `query`, after its offset was
    /// applied, in the query's order.
    ///
    /// A page that starts inside a tie running past the fetched rows gets a
    /// previous cursor that skips that tie entirely; use
    /// [`tie_query`](Self::tie_query) and
    /// [`assemble_with_tie_size`](Self::assemble_with_tie_size) to land on the
    /// exact previous page instead.
    pub fn assemble<R: Record>(&self, query: &PageQuery, rows: Vec<R>) -> Result<Page<R>> {
        Page::assemble(&self.ordering, query, rows, None)
    }

    /// The predicate selecting the tie whose size the previous cursor needs,
    /// when `rows` (as passed to [`assemble`](Self::assemble)) start inside a
    /// tie that outruns them. Fetch it with `query.ordering` and count.
    pub fn tie_query<R: Record>(&self, query: &PageQuery, rows: &[R]) -> Result<Option<Predicate>> {
        Ok(Page::unsized_tie(&self.ordering, query, rows)?.map(|position| Predicate::tied_with(&position)))
    }

    /// [`assemble`](Self::assemble), given the number of records matching
    /// [`tie_query`](Self::tie_query).
    pub fn assemble_with_tie_size<R: Record>(
        &self,
        query: &PageQuery,
        rows: Vec<R>,
        tie_size: Option<usize>,
    ) -> Result<Page<R>> {
        Page::assemble(&self.ordering, query, rows, tie_size)
    }
}
