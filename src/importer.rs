use std::collections::BTreeMap;
use std::path::Path;

use csv::StringRecord;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::codes::normalize_code;
use crate::error::{AcxError, Result};
use crate::index::SearchIndex;
use crate::models::{NewAccountCode, ALL_FLAGS};
use crate::store::Store;

// ---------------------------------------------------------------------------
// Account code CSV
// ---------------------------------------------------------------------------

const COL_CODE: &str = "Account Code";
const COL_DESCRIPTION: &str = "Description";
const COL_UOM: &str = "Primary UOM";
const COL_UOM2: &str = "2nd UOM";
const COL_METRIC_UOM: &str = "Metric Primary";
const COL_METRIC_UOM2: &str = "Metric 2nd";
const COL_NOTES: &str = "Notes";

struct Columns {
    headers: StringRecord,
}

impl Columns {
    fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.position(name)
            .and_then(|i| record.get(i))
            .unwrap_or("")
    }
}

/// Parse the account code CSV export. Codes are normalized and every flag
/// column is read; missing optional columns read as empty/unset.
pub fn parse_account_codes(file_path: &Path) -> Result<Vec<NewAccountCode>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let columns = Columns {
        headers: rdr.headers()?.clone(),
    };
    if columns.position(COL_CODE).is_none() || columns.position(COL_DESCRIPTION).is_none() {
        return Err(AcxError::UnknownFormat(format!(
            "{} is missing the '{COL_CODE}' or '{COL_DESCRIPTION}' column",
            file_path.display()
        )));
    }

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let raw_code = columns.get(&record, COL_CODE);
        if raw_code.trim().is_empty() {
            continue;
        }
        let account_code = normalize_code(raw_code)
            .map_err(|_| AcxError::InvalidCode(format!("{raw_code} (line {})", i + 2)))?;

        let mut row = NewAccountCode {
            account_code,
            description: columns.get(&record, COL_DESCRIPTION).trim().to_string(),
            uom: columns.get(&record, COL_UOM).trim().to_string(),
            uom2: columns.get(&record, COL_UOM2).trim().to_string(),
            metric_uom: columns.get(&record, COL_METRIC_UOM).trim().to_string(),
            metric_uom2: columns.get(&record, COL_METRIC_UOM2).trim().to_string(),
            notes: columns.get(&record, COL_NOTES).to_string(),
            personal_notes: None,
            ..Default::default()
        };
        for flag in ALL_FLAGS {
            let value = columns.get(&record, flag.csv_column()).trim();
            row.flags
                .set(*flag, value.eq_ignore_ascii_case(flag.csv_true_value()));
        }
        rows.push(row);
    }
    Ok(rows)
}

pub struct ImportResult {
    pub imported: usize,
    pub indexed: i64,
}

/// Replace the whole catalog with the contents of `file_path`, then
/// rebuild the index so the next search sees the new records.
pub fn import_account_codes(
    conn: &Connection,
    file_path: &Path,
    progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<ImportResult> {
    let rows = parse_account_codes(file_path)?;
    let store = Store::new(conn);
    let imported = store.replace_all(&rows, progress)?;

    let index = SearchIndex::new(conn);
    index.sync()?;
    let indexed = index.entry_count()?;
    info!(imported, indexed, file = %file_path.display(), "imported account codes");

    Ok(ImportResult { imported, indexed })
}

// ---------------------------------------------------------------------------
// Personal notes export / import
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesFormat {
    Csv,
    Json,
}

impl NotesFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => Err(AcxError::UnknownFormat(format!(
                "{} (expected .csv or .json)",
                path.display()
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct NoteRow {
    #[serde(rename = "Account Code")]
    account_code: String,
    #[serde(rename = "Personal Notes")]
    personal_notes: String,
    #[serde(rename = "Author", default)]
    author: Option<String>,
    #[serde(rename = "Date", default)]
    date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NotesFile {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    date: Option<String>,
    notes: BTreeMap<String, String>,
}

/// Write every non-empty personal note to `file_path`. Returns how many
/// were written; nothing is written when there are none.
pub fn export_notes(conn: &Connection, file_path: &Path, author: &str, date: &str) -> Result<usize> {
    let format = NotesFormat::from_path(file_path)?;
    let notes = Store::new(conn).personal_notes()?;
    if notes.is_empty() {
        return Ok(0);
    }

    match format {
        NotesFormat::Csv => {
            let mut wtr = csv::Writer::from_path(file_path)?;
            for (code, text) in &notes {
                wtr.serialize(NoteRow {
                    account_code: code.clone(),
                    personal_notes: text.clone(),
                    author: Some(author.to_string()),
                    date: Some(date.to_string()),
                })?;
            }
            wtr.flush()?;
        }
        NotesFormat::Json => {
            let file = NotesFile {
                author: Some(author.to_string()),
                date: Some(date.to_string()),
                notes: notes.iter().cloned().collect(),
            };
            let json = serde_json::to_string_pretty(&file)?;
            std::fs::write(file_path, format!("{json}\n"))?;
        }
    }
    info!(count = notes.len(), file = %file_path.display(), "exported personal notes");
    Ok(notes.len())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotesImportOptions {
    /// Replace existing notes instead of appending to them.
    pub overwrite: bool,
    /// Prefix each note with its author and date.
    pub annotate: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct NotesImportResult {
    pub updated: usize,
    pub unknown: Vec<String>,
}

fn or_unknown(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "Unknown",
    }
}

fn annotate_note(note: &str, author: Option<&str>, date: Option<&str>) -> String {
    format!("{} {}: {note}", or_unknown(author), or_unknown(date))
}

fn merge_note(existing: Option<&str>, note: &str, overwrite: bool) -> String {
    match existing {
        Some(prev) if !overwrite && !prev.is_empty() => format!("{prev}\n{note}"),
        _ => note.to_string(),
    }
}

/// Read personal notes from a `.csv` or `.json` file produced by
/// [`export_notes`] and apply them. Codes not in the catalog are skipped.
pub fn import_notes(
    conn: &Connection,
    file_path: &Path,
    options: NotesImportOptions,
) -> Result<NotesImportResult> {
    let entries: Vec<(String, String, Option<String>, Option<String>)> =
        match NotesFormat::from_path(file_path)? {
            NotesFormat::Csv => {
                let mut rdr = csv::Reader::from_path(file_path)?;
                let mut entries = Vec::new();
                for row in rdr.deserialize() {
                    let row: NoteRow = row?;
                    entries.push((row.account_code, row.personal_notes, row.author, row.date));
                }
                entries
            }
            NotesFormat::Json => {
                let content = std::fs::read_to_string(file_path)?;
                let file: NotesFile = serde_json::from_str(&content)?;
                file.notes
                    .into_iter()
                    .map(|(code, note)| (code, note, file.author.clone(), file.date.clone()))
                    .collect()
            }
        };

    let tx = conn.unchecked_transaction()?;
    let store = Store::new(&tx);
    let mut result = NotesImportResult::default();
    for (code, note, author, date) in entries {
        let code = code.trim().to_string();
        let Some(existing) = store.get(&code)? else {
            warn!(code, "skipping note for unknown account code");
            result.unknown.push(code);
            continue;
        };
        let note = if options.annotate {
            annotate_note(&note, author.as_deref(), date.as_deref())
        } else {
            note
        };
        let merged = merge_note(existing.personal_notes.as_deref(), &note, options.overwrite);
        store.set_personal_notes(&code, Some(&merged))?;
        result.updated += 1;
    }
    tx.commit()?;
    info!(updated = result.updated, unknown = result.unknown.len(), "imported personal notes");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CostFlag;
    use crate::store::tests::{record, test_db};
    use crate::models::CostFlags;

    const HEADER: &str = "Account Code,Description,Primary UOM,2nd UOM,Metric Primary,Metric 2nd,Notes,\
Labor,Const. EQP,FOM Rented EQP,Supplies,Materials,Subcontract,Fixed Fees and Services,\
Contingency (Allowances),G & A,Primary to Sup Primary,Primary to Sup 2nd,2nd to Sup 2nd,\
Auto Quantity Primary,Auto Quantity 2nd";

    fn write_codes_csv(dir: &Path, rows: &[&str]) -> std::path::PathBuf {
        let path = dir.join("codes.csv");
        let mut content = format!("{HEADER}\n");
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_account_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_codes_csv(
            dir.path(),
            &[
                "1,Sitework,LS,,LS,,General site,Yes,No,No,No,No,No,No,No,No,FALSE,FALSE,FALSE,FALSE,FALSE",
                "1.1,Grading,CY,SY,M3,M2,,Yes,No,No,No,Yes,No,No,No,No,TRUE,FALSE,FALSE,FALSE,true",
            ],
        );
        let rows = parse_account_codes(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].account_code, "1.10");
        assert_eq!(rows[1].metric_uom2, "M2");
        assert_eq!(
            rows[1].flags,
            CostFlag::Labor | CostFlag::Materials | CostFlag::UomToSupUom | CostFlag::AutoQuantityUom2
        );
        assert_eq!(rows[0].flags, CostFlag::Labor.into());
        assert_eq!(rows[0].notes, "General site");
    }

    #[test]
    fn test_parse_rejects_bad_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_codes_csv(dir.path(), &["1..2,Broken,,,,,,,,,,,,,,,,,,,"]);
        let err = parse_account_codes(&path).unwrap_err();
        assert!(matches!(err, AcxError::InvalidCode(_)));
    }

    #[test]
    fn test_parse_requires_code_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.csv");
        std::fs::write(&path, "Date,Amount\n2025-01-01,5\n").unwrap();
        assert!(matches!(
            parse_account_codes(&path).unwrap_err(),
            AcxError::UnknownFormat(_)
        ));
    }

    #[test]
    fn test_import_replaces_and_indexes() {
        let (dir, conn) = test_db();
        Store::new(&conn).insert(&record("99", "Stale", CostFlags::EMPTY)).unwrap();
        let path = write_codes_csv(
            dir.path(),
            &[
                "1,Sitework,,,,,,Yes,,,,,,,,,,,,,",
                "1.1,Grading,,,,,,Yes,,,,Yes,,,,,,,,,",
                "1.2,Paving,,,,,,,,,,,Yes,,,,,,,,",
            ],
        );
        let mut calls = 0;
        let mut cb = |_: usize, _: usize| calls += 1;
        let result = import_account_codes(&conn, &path, Some(&mut cb)).unwrap();
        assert_eq!(result.imported, 3);
        assert_eq!(result.indexed, 3);
        assert_eq!(calls, 3);

        let store = Store::new(&conn);
        assert!(store.get("99").unwrap().is_none());
        assert_eq!(store.require("1.20").unwrap().level, 2);
        assert!(!SearchIndex::new(&conn).is_stale().unwrap());
    }

    fn notes_db() -> (tempfile::TempDir, Connection) {
        let (dir, conn) = test_db();
        let store = Store::new(&conn);
        for code in ["1", "1.10", "2"] {
            store.insert(&record(code, "x", CostFlags::EMPTY)).unwrap();
        }
        (dir, conn)
    }

    #[test]
    fn test_export_nothing() {
        let (dir, conn) = notes_db();
        let path = dir.path().join("notes.csv");
        assert_eq!(export_notes(&conn, &path, "me", "2026-01-01").unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_export_rejects_unknown_extension() {
        let (dir, conn) = notes_db();
        let err = export_notes(&conn, &dir.path().join("notes.txt"), "me", "today").unwrap_err();
        assert!(matches!(err, AcxError::UnknownFormat(_)));
    }

    #[test]
    fn test_csv_export_then_import_elsewhere() {
        let (dir, conn) = notes_db();
        Store::new(&conn).set_personal_notes("1.10", Some("verify haul distance")).unwrap();
        let path = dir.path().join("notes.csv");
        assert_eq!(export_notes(&conn, &path, "pat", "2026-03-01").unwrap(), 1);

        let (_other_dir, other) = notes_db();
        let options = NotesImportOptions { overwrite: true, annotate: true };
        let result = import_notes(&other, &path, options).unwrap();
        assert_eq!(result.updated, 1);
        assert_eq!(
            Store::new(&other).require("1.10").unwrap().personal_notes.as_deref(),
            Some("pat 2026-03-01: verify haul distance")
        );
    }

    #[test]
    fn test_json_import_amends_and_skips_unknown() {
        let (dir, conn) = notes_db();
        Store::new(&conn).set_personal_notes("2", Some("first")).unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(
            &path,
            r#"{"author": "", "date": null, "notes": {"2": "second", "1": "new", "7.70": "ghost"}}"#,
        )
        .unwrap();

        let result = import_notes(&conn, &path, NotesImportOptions::default()).unwrap();
        assert_eq!(result.updated, 2);
        assert_eq!(result.unknown, vec!["7.70".to_string()]);

        let store = Store::new(&conn);
        assert_eq!(store.require("2").unwrap().personal_notes.as_deref(), Some("first\nsecond"));
        assert_eq!(store.require("1").unwrap().personal_notes.as_deref(), Some("new"));
    }

    #[test]
    fn test_annotation_falls_back_to_unknown() {
        assert_eq!(annotate_note("hi", Some(""), None), "Unknown Unknown: hi");
        assert_eq!(annotate_note("hi", Some("al"), Some("5/1/24")), "al 5/1/24: hi");
    }

    #[test]
    fn test_json_export_shape() {
        let (dir, conn) = notes_db();
        Store::new(&conn).set_personal_notes("1", Some("a")).unwrap();
        let path = dir.path().join("notes.json");
        export_notes(&conn, &path, "pat", "2026-03-01").unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["author"], "pat");
        assert_eq!(value["notes"]["1"], "a");
    }
}
