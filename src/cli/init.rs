use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(database: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(path) = database {
        settings.database_path = shellexpand_path(&path);
    }

    let db_path = PathBuf::from(&settings.database_path);
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    save_settings(&settings)?;

    println!("Initialized account code database at {}", db_path.display());
    Ok(())
}
