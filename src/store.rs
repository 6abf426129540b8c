use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::codes::{compare_codes, level_of};
use crate::db::{self, get_counter, set_metadata};
use crate::error::{AcxError, Result};
use crate::models::{AccountCode, CostFlags, NewAccountCode};

pub const STORE_GENERATION_KEY: &str = "store_generation";

const SELECT_COLUMNS: &str = "id, account_code, level, description, uom, uom2, metric_uom, \
     metric_uom2, notes, personal_notes, flags";

fn from_row(row: &Row) -> rusqlite::Result<AccountCode> {
    let flags: i64 = row.get(10)?;
    Ok(AccountCode {
        id: row.get(0)?,
        account_code: row.get(1)?,
        level: row.get(2)?,
        description: row.get(3)?,
        uom: row.get(4)?,
        uom2: row.get(5)?,
        metric_uom: row.get(6)?,
        metric_uom2: row.get(7)?,
        notes: row.get(8)?,
        personal_notes: row.get(9)?,
        flags: CostFlags::from_bits(flags as u32),
    })
}

/// The table of account code records. Source of truth for the search
/// index, which is derived from it.
pub struct Store<'c> {
    conn: &'c Connection,
}

impl<'c> Store<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'c Connection {
        self.conn
    }

    /// Drop and recreate the table, then insert `rows` in order.
    ///
    /// Bumps the store generation so the index can tell it is stale.
    /// `progress` is called with `(done, total)` after each row.
    pub fn replace_all(
        &self,
        rows: &[NewAccountCode],
        mut progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch("DROP TABLE IF EXISTS account_codes;")?;
        tx.execute_batch(db::ACCOUNT_CODES_TABLE)?;

        let total = rows.len();
        let store = Store::new(&tx);
        for (i, row) in rows.iter().enumerate() {
            store.insert(row)?;
            if let Some(cb) = progress.as_deref_mut() {
                cb(i + 1, total);
            }
        }

        let generation = get_counter(&tx, STORE_GENERATION_KEY)? + 1;
        set_metadata(&tx, STORE_GENERATION_KEY, &generation.to_string())?;
        tx.commit()?;

        info!(rows = total, generation, "replaced account code table");
        Ok(total)
    }

    /// Insert one record as given. The code is stored verbatim; the CSV
    /// importer normalizes before it gets here.
    pub fn insert(&self, row: &NewAccountCode) -> Result<i64> {
        insert_row(self.conn, row)?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get(&self, code: &str) -> Result<Option<AccountCode>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM account_codes WHERE account_code = ?1");
        Ok(self.conn.query_row(&sql, [code], from_row).optional()?)
    }

    pub fn require(&self, code: &str) -> Result<AccountCode> {
        self.get(code)?
            .ok_or_else(|| AcxError::UnknownCode(code.to_string()))
    }

    /// Every record, in segment-aware code order.
    pub fn all(&self) -> Result<Vec<AccountCode>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM account_codes");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut codes = stmt
            .query_map([], from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        codes.sort_by(|a, b| compare_codes(&a.account_code, &b.account_code));
        Ok(codes)
    }

    /// Direct children of `code`, in segment-aware order.
    pub fn children(&self, code: &str) -> Result<Vec<AccountCode>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM account_codes \
             WHERE substr(account_code, 1, length(?1) + 1) = ?1 || '.' AND level = ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut codes = stmt
            .query_map(rusqlite::params![code, level_of(code) + 1], from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        codes.sort_by(|a, b| compare_codes(&a.account_code, &b.account_code));
        Ok(codes)
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT count(*) FROM account_codes", [], |r| r.get(0))?)
    }

    pub fn count_with_personal_notes(&self) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT count(*) FROM account_codes WHERE personal_notes IS NOT NULL AND personal_notes != ''",
            [],
            |r| r.get(0),
        )?)
    }

    /// Replace a record's personal notes. Empty text clears them.
    pub fn set_personal_notes(&self, code: &str, notes: Option<&str>) -> Result<()> {
        let notes = notes.filter(|n| !n.trim().is_empty());
        let changed = self.conn.execute(
            "UPDATE account_codes SET personal_notes = ?1 WHERE account_code = ?2",
            rusqlite::params![notes, code],
        )?;
        if changed == 0 {
            return Err(AcxError::UnknownCode(code.to_string()));
        }
        debug!(code, "saved personal notes");
        Ok(())
    }

    /// `(account_code, personal_notes)` for every record that has notes.
    pub fn personal_notes(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT account_code, personal_notes FROM account_codes \
             WHERE personal_notes IS NOT NULL AND personal_notes != ''",
        )?;
        let mut notes = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<(String, String)>, _>>()?;
        notes.sort_by(|a, b| compare_codes(&a.0, &b.0));
        Ok(notes)
    }

    /// Incremented on every bulk replace.
    pub fn generation(&self) -> Result<u64> {
        get_counter(self.conn, STORE_GENERATION_KEY)
    }
}

fn insert_row(conn: &Connection, row: &NewAccountCode) -> Result<()> {
    conn.prepare_cached(
        "INSERT INTO account_codes (account_code, level, description, uom, uom2, metric_uom, \
         metric_uom2, notes, personal_notes, flags) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?
    .execute(rusqlite::params![
        row.account_code,
        level_of(&row.account_code),
        row.description,
        row.uom,
        row.uom2,
        row.metric_uom,
        row.metric_uom2,
        row.notes,
        row.personal_notes,
        row.flags.bits() as i64,
    ])?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::CostFlag;

    pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.sqlite")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    pub(crate) fn record(code: &str, description: &str, flags: CostFlags) -> NewAccountCode {
        NewAccountCode {
            account_code: code.to_string(),
            description: description.to_string(),
            flags,
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_derives_level() {
        let (_dir, conn) = test_db();
        let store = Store::new(&conn);
        store.insert(&record("12.03.10", "Forms", CostFlags::EMPTY)).unwrap();
        let code = store.require("12.03.10").unwrap();
        assert_eq!(code.level, 3);
        assert_eq!(code.personal_notes, None);
    }

    #[test]
    fn test_flags_roundtrip() {
        let (_dir, conn) = test_db();
        let store = Store::new(&conn);
        let flags = CostFlag::Labor | CostFlag::AutoQuantityUom2;
        store.insert(&record("1", "Sitework", flags)).unwrap();
        assert_eq!(store.require("1").unwrap().flags, flags);
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let (_dir, conn) = test_db();
        let store = Store::new(&conn);
        store.insert(&record("1", "Sitework", CostFlags::EMPTY)).unwrap();
        assert!(store.insert(&record("1", "Again", CostFlags::EMPTY)).is_err());
    }

    #[test]
    fn test_replace_all_discards_previous_rows() {
        let (_dir, conn) = test_db();
        let store = Store::new(&conn);
        store.insert(&record("9", "Old", CostFlags::EMPTY)).unwrap();
        store.set_personal_notes("9", Some("keep?")).unwrap();

        let rows = vec![
            record("1", "Sitework", CostFlags::EMPTY),
            record("1.10", "Grading", CostFlags::EMPTY),
        ];
        let mut seen = Vec::new();
        let mut cb = |done: usize, total: usize| seen.push((done, total));
        let n = store.replace_all(&rows, Some(&mut cb)).unwrap();

        assert_eq!(n, 2);
        assert_eq!(seen, vec![(1, 2), (2, 2)]);
        assert_eq!(store.count().unwrap(), 2);
        assert!(store.get("9").unwrap().is_none());
        assert_eq!(store.count_with_personal_notes().unwrap(), 0);
    }

    #[test]
    fn test_replace_all_bumps_generation() {
        let (_dir, conn) = test_db();
        let store = Store::new(&conn);
        assert_eq!(store.generation().unwrap(), 0);
        store.replace_all(&[], None).unwrap();
        store.replace_all(&[], None).unwrap();
        assert_eq!(store.generation().unwrap(), 2);
    }

    #[test]
    fn test_failed_replace_rolls_back() {
        let (_dir, conn) = test_db();
        let store = Store::new(&conn);
        store.insert(&record("5", "Existing", CostFlags::EMPTY)).unwrap();
        let rows = vec![
            record("1", "A", CostFlags::EMPTY),
            record("1", "Duplicate", CostFlags::EMPTY),
        ];
        assert!(store.replace_all(&rows, None).is_err());
        assert!(store.get("5").unwrap().is_some());
        assert_eq!(store.generation().unwrap(), 0);
    }

    #[test]
    fn test_all_is_segment_ordered() {
        let (_dir, conn) = test_db();
        let store = Store::new(&conn);
        for code in ["2.10", "10", "2", "2.9", "1"] {
            store.insert(&record(code, "x", CostFlags::EMPTY)).unwrap();
        }
        let codes: Vec<String> = store.all().unwrap().into_iter().map(|c| c.account_code).collect();
        assert_eq!(codes, vec!["1", "2", "2.9", "2.10", "10"]);
    }

    #[test]
    fn test_children() {
        let (_dir, conn) = test_db();
        let store = Store::new(&conn);
        for code in ["1", "1.10", "1.20", "1.10.50", "10", "10.10"] {
            store.insert(&record(code, "x", CostFlags::EMPTY)).unwrap();
        }
        let kids: Vec<String> = store
            .children("1")
            .unwrap()
            .into_iter()
            .map(|c| c.account_code)
            .collect();
        assert_eq!(kids, vec!["1.10", "1.20"]);
    }

    #[test]
    fn test_personal_notes_set_and_clear() {
        let (_dir, conn) = test_db();
        let store = Store::new(&conn);
        store.insert(&record("1", "Sitework", CostFlags::EMPTY)).unwrap();
        store.set_personal_notes("1", Some("check with district")).unwrap();
        assert_eq!(
            store.personal_notes().unwrap(),
            vec![("1".to_string(), "check with district".to_string())]
        );
        store.set_personal_notes("1", Some("   ")).unwrap();
        assert_eq!(store.require("1").unwrap().personal_notes, None);
    }

    #[test]
    fn test_personal_notes_unknown_code() {
        let (_dir, conn) = test_db();
        let store = Store::new(&conn);
        let err = store.set_personal_notes("7", Some("x")).unwrap_err();
        assert!(matches!(err, AcxError::UnknownCode(_)));
    }
}
