use std::path::PathBuf;

use crate::db::open_existing;
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(path: &str) -> Result<()> {
    let resolved = PathBuf::from(shellexpand_path(path));
    open_existing(&resolved)?;

    let mut settings = load_settings();
    settings.database_path = resolved.to_string_lossy().to_string();
    save_settings(&settings)?;

    println!("Connected to database: {}", resolved.display());
    Ok(())
}
