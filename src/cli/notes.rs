use std::path::PathBuf;

use crate::cli::open_catalog;
use crate::error::Result;
use crate::importer::{export_notes, import_notes, NotesImportOptions};
use crate::store::Store;

pub fn set(code: &str, text: Option<&str>, clear: bool) -> Result<()> {
    let (_settings, conn) = open_catalog()?;
    let store = Store::new(&conn);
    let text = if clear { None } else { text };
    store.set_personal_notes(code.trim(), text)?;
    if text.is_some_and(|t| !t.trim().is_empty()) {
        println!("Saved personal notes for {code}");
    } else {
        println!("Cleared personal notes for {code}");
    }
    Ok(())
}

pub fn export(file: &str, author: Option<String>, date: Option<String>) -> Result<()> {
    let (settings, conn) = open_catalog()?;
    let author = author.unwrap_or_else(|| settings.author_or_login());
    let date = date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    let path = PathBuf::from(file);

    let count = export_notes(&conn, &path, &author, &date)?;
    if count == 0 {
        println!("No notes to export.");
    } else {
        println!("Exported {count} notes to {}", path.display());
    }
    Ok(())
}

pub fn import(file: &str, overwrite: bool, annotate: bool) -> Result<()> {
    let (_settings, conn) = open_catalog()?;
    let result = import_notes(
        &conn,
        &PathBuf::from(file),
        NotesImportOptions { overwrite, annotate },
    )?;
    println!("Updated notes on {} account codes", result.updated);
    if !result.unknown.is_empty() {
        println!(
            "Skipped {} unknown codes: {}",
            result.unknown.len(),
            result.unknown.join(", ")
        );
    }
    Ok(())
}
