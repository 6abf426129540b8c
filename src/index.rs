use std::time::Instant;

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::db::{get_counter, has_table, set_metadata};
use crate::error::{AcxError, Result};
use crate::store::STORE_GENERATION_KEY;

pub const INDEX_TABLE: &str = "account_code_index";
pub const INDEX_GENERATION_KEY: &str = "index_generation";

/// FTS5 index over the three text columns of `account_codes`. It stores
/// no text of its own (external content), only the inverted index, keyed
/// by `account_codes.id`.
pub const INDEX_SCHEMA: &str = "
CREATE VIRTUAL TABLE IF NOT EXISTS account_code_index USING fts5(
    description,
    notes,
    personal_notes,
    content='account_codes',
    content_rowid='id',
    tokenize='unicode61 remove_diacritics 2'
);
";

/// A row the index matched, with its relevance (higher is better).
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    pub rowid: i64,
    pub score: f64,
}

/// Translate an SQLite failure raised while evaluating a MATCH expression.
/// Grammar problems become `QuerySyntax`; everything else stays a
/// database error.
pub fn map_match_error(err: rusqlite::Error) -> AcxError {
    if let rusqlite::Error::SqliteFailure(_, Some(msg)) = &err {
        let lower = msg.to_lowercase();
        if lower.starts_with("fts5")
            || lower.contains("syntax error")
            || lower.contains("no such column")
            || lower.contains("unterminated string")
            || lower.contains("unknown special query")
        {
            return AcxError::QuerySyntax(msg.clone());
        }
    }
    AcxError::Db(err)
}

/// Explicit handle on the full-text index. Callers decide when it is
/// rebuilt; nothing is kept in globals.
pub struct SearchIndex<'c> {
    conn: &'c Connection,
}

impl<'c> SearchIndex<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn ensure_store(&self) -> Result<()> {
        if !has_table(self.conn, "account_codes")? {
            return Err(AcxError::StoreUnavailable(
                "account code table is missing".to_string(),
            ));
        }
        if !has_table(self.conn, INDEX_TABLE)? {
            self.conn.execute_batch(INDEX_SCHEMA)?;
        }
        Ok(())
    }

    fn command(&self, cmd: &str) -> Result<()> {
        self.conn.execute(
            &format!("INSERT INTO {INDEX_TABLE}({INDEX_TABLE}) VALUES (?1)"),
            [cmd],
        )?;
        Ok(())
    }

    /// Discard the index and regenerate it from the current records.
    pub fn rebuild(&self) -> Result<()> {
        self.ensure_store()?;
        let started = Instant::now();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!("INSERT INTO {INDEX_TABLE}({INDEX_TABLE}) VALUES ('rebuild')"),
            [],
        )?;
        let generation = get_counter(&tx, STORE_GENERATION_KEY)?;
        set_metadata(&tx, INDEX_GENERATION_KEY, &generation.to_string())?;
        tx.commit()?;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            generation, "rebuilt full-text index"
        );
        Ok(())
    }

    /// Merge index segments. Only affects query latency.
    pub fn optimize(&self) -> Result<()> {
        self.ensure_store()?;
        let started = Instant::now();
        self.command("optimize")?;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "optimized full-text index"
        );
        Ok(())
    }

    /// `rebuild` followed by `optimize`; what every search runs first.
    pub fn refresh(&self) -> Result<()> {
        self.rebuild()?;
        self.optimize()
    }

    /// True when the records were bulk-replaced after the last rebuild.
    pub fn is_stale(&self) -> Result<bool> {
        let store = get_counter(self.conn, STORE_GENERATION_KEY)?;
        let index = get_counter(self.conn, INDEX_GENERATION_KEY)?;
        Ok(store != index)
    }

    /// Rebuild only if the store changed since the last rebuild.
    pub fn sync(&self) -> Result<bool> {
        if self.is_stale()? {
            info!("record store was replaced; rebuilding index");
            self.refresh()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Number of records currently present in the index.
    pub fn entry_count(&self) -> Result<i64> {
        self.ensure_store()?;
        Ok(self.conn.query_row(
            &format!("SELECT count(*) FROM {INDEX_TABLE}_docsize"),
            [],
            |r| r.get(0),
        )?)
    }

    /// Evaluate an FTS5 expression against the index alone. Hits come back
    /// best first.
    ///
    /// This and [`SearchIndex::score`] are the index-level API for direct
    /// queries and diagnostics. The search path joins the same `bm25`
    /// ranking against `account_codes` in one statement instead (see
    /// `CompositeQuery::to_sql`).
    #[allow(dead_code)]
    pub fn matches(&self, expression: &str) -> Result<Vec<IndexHit>> {
        self.ensure_store()?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT rowid, bm25({INDEX_TABLE}) FROM {INDEX_TABLE} \
             WHERE {INDEX_TABLE} MATCH ?1 ORDER BY bm25({INDEX_TABLE}), rowid"
        ))?;
        let rows = stmt
            .query_map([expression], |row| {
                let rank: f64 = row.get(1)?;
                Ok(IndexHit {
                    rowid: row.get(0)?,
                    score: -rank,
                })
            })
            .map_err(map_match_error)?;
        let hits = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(map_match_error)?;
        Ok(hits)
    }

    /// Relevance of one record under `expression`, or `None` if it does
    /// not match.
    #[allow(dead_code)]
    pub fn score(&self, expression: &str, rowid: i64) -> Result<Option<f64>> {
        self.ensure_store()?;
        let rank: Option<f64> = self
            .conn
            .query_row(
                &format!(
                    "SELECT bm25({INDEX_TABLE}) FROM {INDEX_TABLE} \
                     WHERE {INDEX_TABLE} MATCH ?1 AND rowid = ?2"
                ),
                rusqlite::params![expression, rowid],
                |r| r.get(0),
            )
            .optional()
            .map_err(map_match_error)?;
        Ok(rank.map(|r| -r))
    }
}
