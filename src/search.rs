use rusqlite::params_from_iter;
use tracing::{debug, warn};

use crate::error::Result;
use crate::index::{map_match_error, SearchIndex};
use crate::models::CostFlags;
use crate::query::{CompositeQuery, FieldSelection, QueryBuilder, TermSyntax};
use crate::ranker::{rank, SearchHit, SortMode};
use crate::store::Store;

/// Everything one search invocation needs.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub term: String,
    pub fields: FieldSelection,
    pub cost_filter: CostFlags,
    pub sort: SortMode,
    pub syntax: TermSyntax,
}

impl SearchRequest {
    pub fn query(&self) -> Result<CompositeQuery> {
        QueryBuilder::new(&self.term)
            .fields(self.fields)
            .cost_filter(self.cost_filter)
            .syntax(self.syntax)
            .build()
    }
}

/// What the presentation layer receives for one search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Hits(Vec<SearchHit>),
    /// The term could not be parsed; the message is user-facing.
    Failed(String),
}

impl SearchOutcome {
    /// Hits, or an empty list for a failed search.
    pub fn hits(&self) -> &[SearchHit] {
        match self {
            Self::Hits(hits) => hits,
            Self::Failed(_) => &[],
        }
    }
}

/// Search service. Owns the index handle it re-synchronizes before every
/// query, so results always reflect the current records.
pub struct Searcher<'c> {
    store: Store<'c>,
    index: SearchIndex<'c>,
}

impl<'c> Searcher<'c> {
    pub fn new(store: Store<'c>, index: SearchIndex<'c>) -> Self {
        Self { store, index }
    }

    /// Rebuild + optimize the index, then run the request.
    ///
    /// Grammar errors in the term are returned as `QuerySyntax`; store
    /// problems as `StoreUnavailable` or `Db`.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let query = request.query()?;
        self.index.refresh()?;
        self.execute(&query, request.sort)
    }

    /// `search`, with grammar errors turned into a failed outcome instead
    /// of an error. Store errors still propagate.
    pub fn run(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        match self.search(request) {
            Ok(hits) => Ok(SearchOutcome::Hits(hits)),
            Err(e) if e.is_recoverable_search_failure() => {
                warn!(term = %request.term, error = %e, "search failed");
                Ok(SearchOutcome::Failed(format!("Search failed: {e}")))
            }
            Err(e) => Err(e),
        }
    }

    /// Run an already composed query against the index as it stands.
    pub fn execute(&self, query: &CompositeQuery, sort: SortMode) -> Result<Vec<SearchHit>> {
        let Some((sql, params)) = query.to_sql() else {
            debug!("query cannot match; skipping index");
            return Ok(Vec::new());
        };
        let conn = self.store.connection();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok(SearchHit {
                    id: row.get(0)?,
                    account_code: row.get(1)?,
                    description: row.get(2)?,
                    level: row.get(3)?,
                    score: row.get(4)?,
                })
            })
            .map_err(map_match_error)?;
        let mut hits = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(map_match_error)?;
        rank(&mut hits, sort);
        debug!(hits = hits.len(), ?sort, "search complete");
        Ok(hits)
    }
}
