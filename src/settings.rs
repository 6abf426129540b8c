use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AcxError, Result};
use crate::models::SearchField;
use crate::ranker::SortMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub color_hierarchy: bool,
    #[serde(default = "default_search_fields")]
    pub search_fields: Vec<SearchField>,
    #[serde(default)]
    pub sort_mode: SortMode,
}

fn default_database_path() -> String {
    default_data_dir()
        .join("account_codes.sqlite")
        .to_string_lossy()
        .to_string()
}

fn default_search_fields() -> Vec<SearchField> {
    vec![SearchField::Description, SearchField::Notes]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            author: String::new(),
            color_hierarchy: false,
            search_fields: default_search_fields(),
            sort_mode: SortMode::default(),
        }
    }
}

impl Settings {
    pub fn database(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
    }

    /// Configured author, else the login name, else empty.
    pub fn author_or_login(&self) -> String {
        if !self.author.trim().is_empty() {
            return self.author.clone();
        }
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default()
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("acx")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("acx")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable settings; using defaults");
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| AcxError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    let p = PathBuf::from(path);
    if p.is_absolute() {
        return path.to_string();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&p))
        .unwrap_or(p)
        .to_string_lossy()
        .to_string()
}
