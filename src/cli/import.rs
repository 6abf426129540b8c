use std::io::Write;
use std::path::PathBuf;

use crate::cli::open_catalog;
use crate::error::Result;
use crate::importer::import_account_codes;

pub fn run(file: &str) -> Result<()> {
    let file_path = PathBuf::from(file);
    let (_settings, conn) = open_catalog()?;

    let mut stderr = std::io::stderr();
    let mut progress = |done: usize, total: usize| {
        if done == total || done % 100 == 0 {
            let _ = write!(stderr, "\rImporting account codes... {done}/{total}");
            let _ = stderr.flush();
        }
    };
    let result = import_account_codes(&conn, &file_path, Some(&mut progress))?;
    eprintln!();

    println!(
        "{} account codes imported, {} indexed",
        result.imported, result.indexed
    );
    Ok(())
}
