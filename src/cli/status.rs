use crate::db::open_existing;
use crate::error::Result;
use crate::index::SearchIndex;
use crate::settings::load_settings;
use crate::store::Store;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.database();

    println!("Database:   {}", db_path.display());
    println!(
        "Author:     {}",
        if settings.author.is_empty() { "(not set)" } else { settings.author.as_str() }
    );
    println!("Sort:       {}", settings.sort_mode);
    let fields: Vec<String> = settings.search_fields.iter().map(|f| f.to_string()).collect();
    println!("Fields:     {}", fields.join(", "));

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `acx init` to set up.");
        return Ok(());
    }

    let conn = open_existing(&db_path)?;
    let store = Store::new(&conn);
    let index = SearchIndex::new(&conn);

    println!();
    println!("Account codes:   {}", store.count()?);
    println!("Personal notes:  {}", store.count_with_personal_notes()?);
    println!("Indexed:         {}", index.entry_count()?);
    println!("Imports:         {}", store.generation()?);
    println!(
        "Index:           {}",
        if index.is_stale()? { "stale (rebuilt on next search)" } else { "current" }
    );
    Ok(())
}
