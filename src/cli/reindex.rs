use crate::cli::open_catalog;
use crate::error::Result;
use crate::index::SearchIndex;

pub fn run() -> Result<()> {
    let (_settings, conn) = open_catalog()?;
    let index = SearchIndex::new(&conn);
    index.refresh()?;
    println!("Index rebuilt: {} account codes", index.entry_count()?);
    Ok(())
}
