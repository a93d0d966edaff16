use crate::{Cursor, CursorCodec, OrderingSpec, PageQuery, Position, Record, Result, TRACING_TARGET_PLANNER};

/// One page of records in the ordering's canonical direction, with tokens
/// for the neighbouring pages.
#[derive(Clone, Debug, Eq, IntoIterator, PartialEq)]
pub struct Page<R> {
    #[into_iterator(owned, ref)]
    pub records: Vec<R>,
    pub next_cursor: Option<String>,
    pub previous_cursor: Option<String>,
}

impl<R> Page<R> {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            next_cursor: None,
            previous_cursor: None,
        }
    }

    pub fn has_next(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous_cursor.is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(R) -> U,
    {
        Page {
            records: self.records.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            previous_cursor: self.previous_cursor,
        }
    }
}

impl<R: Record> Page<R> {
    pub(crate) fn assemble(
        ordering: &OrderingSpec,
        query: &PageQuery,
        mut rows: Vec<R>,
        tie_size: Option<usize>,
    ) -> Result<Self> {
        let cursor = query.cursor();
        let page_size = query.page_size();

        let (page, lookahead) = split_lookahead(ordering, page_size, &rows)?;
        let onward = onward_cursor(ordering, cursor, page, lookahead.as_ref())?;
        let backward = backward_cursor(ordering, cursor, page, lookahead.as_ref(), tie_size)?;
        rows.truncate(page_size);

        tracing::debug!(
            target: TRACING_TARGET_PLANNER,
            rows = rows.len(),
            reverse = cursor.reverse,
            onward_offset = onward.as_ref().map(|cursor| cursor.offset),
            backward_offset = backward.as_ref().map(|cursor| cursor.offset),
            "Assembled page"
        );

        let (next, previous) = match cursor.reverse {
            false => (onward, backward),
            true => {
                rows.reverse();
                (backward, onward)
            }
        };

        Ok(Self {
            records: rows,
            next_cursor: next.as_ref().map(CursorCodec::encode).transpose()?,
            previous_cursor: previous.as_ref().map(CursorCodec::encode).transpose()?,
        })
    }

    /// The position whose tie has to be counted before the page's backward
    /// cursor can be exact, if any.
    pub(crate) fn unsized_tie(ordering: &OrderingSpec, query: &PageQuery, rows: &[R]) -> Result<Option<Position>> {
        let (page, lookahead) = split_lookahead(ordering, query.page_size(), rows)?;
        match straddle(ordering, query.cursor(), page, lookahead.as_ref())? {
            Straddle::Unbounded => Ok(query.cursor().position.clone()),
            Straddle::Outside | Straddle::Within(_) => Ok(None),
        }
    }
}

fn split_lookahead<'a, R: Record>(
    ordering: &OrderingSpec,
    page_size: usize,
    rows: &'a [R],
) -> Result<(&'a [R], Option<Position>)> {
    match rows.get(page_size) {
        Some(extra) => Ok((&rows[..page_size], Some(Position::of(ordering, extra)?))),
        None => Ok((rows, None)),
    }
}

/// Number of leading `rows` whose position equals `position`.
fn tied_run<'a, R: Record + 'a>(
    ordering: &OrderingSpec,
    rows: impl Iterator<Item = &'a R>,
    position: &Position,
) -> Result<usize> {
    let mut count = 0;
    for row in rows {
        if Position::of(ordering, row)? != *position {
            break;
        }
        count += 1;
    }
    Ok(count)
}

/// How a page relates to the tie of the incoming cursor's position.
enum Straddle {
    /// The page does not start inside that tie.
    Outside,
    /// The tie ends within the page, this many rows from its start.
    Within(usize),
    /// The tie runs on past the fetched rows.
    Unbounded,
}

fn straddle<R: Record>(
    ordering: &OrderingSpec,
    cursor: &Cursor,
    rows: &[R],
    lookahead: Option<&Position>,
) -> Result<Straddle> {
    let Some(first) = rows.first() else {
        return Ok(Straddle::Outside);
    };
    let first = Position::of(ordering, first)?;
    if !cursor.is_inclusive() || cursor.position.as_ref() != Some(&first) {
        return Ok(Straddle::Outside);
    }
    let tied = tied_run(ordering, rows.iter(), &first)?;
    match tied == rows.len() && lookahead == Some(&first) {
        true => Ok(Straddle::Unbounded),
        false => Ok(Straddle::Within(tied)),
    }
}

/// The cursor continuing in the fetch direction, positioned on the last row.
///
/// When the row after the page ties with the last row, the cursor carries how
/// many rows of that tie were consumed so far: the tied tail of this page,
/// plus the incoming offset when the whole page continued the same tie.
fn onward_cursor<R: Record>(
    ordering: &OrderingSpec,
    cursor: &Cursor,
    rows: &[R],
    lookahead: Option<&Position>,
) -> Result<Option<Cursor>> {
    let (Some(lookahead), Some(last)) = (lookahead, rows.last()) else {
        return Ok(None);
    };
    let last = Position::of(ordering, last)?;
    let offset = match *lookahead == last {
        false => 0,
        true => {
            let tied = tied_run(ordering, rows.iter().rev(), &last)?;
            let continued = tied == rows.len() && cursor.is_inclusive() && cursor.position.as_ref() == Some(&last);
            match continued {
                true => tied.saturating_add(cursor.offset),
                false => tied,
            }
        }
    };
    Ok(Some(Cursor {
        offset,
        reverse: cursor.reverse,
        position: Some(last),
    }))
}

/// The cursor heading back the way the incoming cursor came, positioned on
/// the first row.
///
/// The backward fetch meets the incoming cursor's tie from its far end, so a
/// page starting inside that tie skips the rest of the tie from the page
/// start on. When the tie runs past the fetched rows that count needs
/// `tie_size`, the size of the whole tie; without it the cursor stops short
/// of the tie altogether rather than land on this page.
fn backward_cursor<R: Record>(
    ordering: &OrderingSpec,
    cursor: &Cursor,
    rows: &[R],
    lookahead: Option<&Position>,
    tie_size: Option<usize>,
) -> Result<Option<Cursor>> {
    if cursor.is_edge() {
        return Ok(None);
    }
    let Some(first) = rows.first() else {
        return Ok(Some(Cursor {
            offset: 0,
            reverse: !cursor.reverse,
            position: cursor.position.clone(),
        }));
    };
    let offset = match straddle(ordering, cursor, rows, lookahead)? {
        Straddle::Outside => 0,
        Straddle::Within(rest) => rest,
        Straddle::Unbounded => tie_size
            .and_then(|size| size.checked_sub(cursor.offset))
            .filter(|rest| *rest > rows.len())
            .unwrap_or(0),
    };
    Ok(Some(Cursor {
        offset,
        reverse: !cursor.reverse,
        position: Some(Position::of(ordering, first)?),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PagePlanner, Predicate, PredicateStrategy, Value};
    use ::std::collections::BTreeMap;

    type Row = BTreeMap<String, Value>;

    fn row(score: i64, id: i64) -> Row {
        BTreeMap::from([("score".to_string(), Value::Int(score)), ("id".to_string(), Value::Int(id))])
    }

    fn ids(page: &Page<Row>) -> Vec<i64> {
        page.records
            .iter()
            .map(|row| match row["id"] {
                Value::Int(id) => id,
                _ => unreachable!(),
            })
            .collect()
    }

    fn decode(token: &Option<String>) -> Cursor {
        CursorCodec::decode(token.as_deref().unwrap()).unwrap()
    }

    fn score_planner() -> PagePlanner {
        PagePlanner::new("score".parse().unwrap(), PredicateStrategy::Chained)
    }

    #[test]
    fn short_fetch_has_no_next_page() {
        let planner = score_planner();
        let query = planner.plan(&Cursor::start(), 3).unwrap();
        let page = planner.assemble(&query, vec![row(1, 1), row(2, 2)]).unwrap();
        assert_eq!(ids(&page), [1, 2]);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn full_fetch_drops_lookahead() {
        let planner = score_planner();
        let query = planner.plan(&Cursor::start(), 2).unwrap();
        let page = planner.assemble(&query, vec![row(1, 1), row(2, 2), row(3, 3)]).unwrap();
        assert_eq!(ids(&page), [1, 2]);
        assert_eq!(decode(&page.next_cursor), Cursor::following(Position::new([("score", 2)]), 0));
        assert!(!page.has_previous());
    }

    #[test]
    fn tie_across_page_end_sets_offset() {
        let planner = score_planner();
        let query = planner.plan(&Cursor::start(), 2).unwrap();
        let page = planner.assemble(&query, vec![row(1, 1), row(2, 2), row(2, 3)]).unwrap();
        assert_eq!(decode(&page.next_cursor), Cursor::following(Position::new([("score", 2)]), 1));
    }

    #[test]
    fn whole_page_tie_accumulates_offset() {
        let planner = score_planner();
        let incoming = Cursor::following(Position::new([("score", 2)]), 2);
        let query = planner.plan(&incoming, 2).unwrap();
        let rows = vec![row(2, 3), row(2, 4), row(2, 5)];
        assert_eq!(
            planner.tie_query(&query, &rows).unwrap(),
            Some(Predicate::tied_with(&Position::new([("score", 2)])))
        );

        let page = planner.assemble_with_tie_size(&query, rows.clone(), Some(6)).unwrap();
        assert_eq!(decode(&page.next_cursor), Cursor::following(Position::new([("score", 2)]), 4));
        assert_eq!(decode(&page.previous_cursor), Cursor::preceding(Position::new([("score", 2)]), 4));

        // without the size of the tie, the way back skips the whole tie
        let page = planner.assemble(&query, rows).unwrap();
        assert_eq!(decode(&page.previous_cursor), Cursor::preceding(Position::new([("score", 2)]), 0));
    }

    #[test]
    fn bounded_tie_needs_no_count() {
        let planner = score_planner();
        let incoming = Cursor::following(Position::new([("score", 2)]), 2);
        let query = planner.plan(&incoming, 2).unwrap();
        let rows = vec![row(2, 3), row(2, 4), row(3, 5)];
        assert_eq!(planner.tie_query(&query, &rows).unwrap(), None);
        let page = planner.assemble(&query, rows).unwrap();
        assert_eq!(decode(&page.previous_cursor), Cursor::preceding(Position::new([("score", 2)]), 2));
    }

    #[test]
    fn previous_cursor_inside_tie_counts_rest_of_tie() {
        let planner = score_planner();
        let incoming = Cursor::following(Position::new([("score", 2)]), 1);
        let query = planner.plan(&incoming, 3).unwrap();
        let page = planner.assemble(&query, vec![row(2, 3), row(2, 4), row(5, 5)]).unwrap();
        assert_eq!(decode(&page.previous_cursor), Cursor::preceding(Position::new([("score", 2)]), 2));
        assert!(!page.has_next());
    }

    #[test]
    fn reverse_fetch_is_returned_in_canonical_order() {
        let planner = score_planner();
        let incoming = Cursor::preceding(Position::new([("score", 9)]), 0);
        let query = planner.plan(&incoming, 2).unwrap();
        let page = planner.assemble(&query, vec![row(8, 8), row(7, 7), row(6, 6)]).unwrap();
        assert_eq!(ids(&page), [7, 8]);
        assert_eq!(decode(&page.previous_cursor), Cursor::preceding(Position::new([("score", 7)]), 0));
        assert_eq!(decode(&page.next_cursor), Cursor::following(Position::new([("score", 8)]), 0));
    }

    #[test]
    fn last_page_has_no_next() {
        let planner = score_planner();
        let query = planner.plan(&Cursor::end(), 2).unwrap();
        let page = planner.assemble(&query, vec![row(9, 9), row(8, 8)]).unwrap();
        assert_eq!(ids(&page), [8, 9]);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn empty_page_points_back_at_cursor() {
        let planner = score_planner();
        let incoming = Cursor::following(Position::new([("score", 4)]), 0);
        let query = planner.plan(&incoming, 2).unwrap();
        let page = planner.assemble(&query, Vec::<Row>::new()).unwrap();
        assert!(page.is_empty());
        assert!(!page.has_next());
        assert_eq!(decode(&page.previous_cursor), Cursor::preceding(Position::new([("score", 4)]), 0));
    }

    #[test]
    fn missing_field_is_reported() {
        let planner = score_planner();
        let query = planner.plan(&Cursor::start(), 1).unwrap();
        let rows = vec![row(1, 1), BTreeMap::from([("id".to_string(), Value::Int(2))])];
        assert!(planner.assemble(&query, rows).is_err());
    }

    #[test]
    fn map_keeps_cursors() {
        let planner = score_planner();
        let query = planner.plan(&Cursor::start(), 1).unwrap();
        let page = planner.assemble(&query, vec![row(1, 1), row(2, 2)]).unwrap();
        let next = page.next_cursor.clone();
        let mapped = page.map(|row| row["id"].clone());
        assert_eq!(mapped.records, [Value::Int(1)]);
        assert_eq!(mapped.next_cursor, next);
    }
}
