use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcxError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid search expression: {0}")]
    QuerySyntax(String),

    #[error("Unknown account code: {0}")]
    UnknownCode(String),

    #[error("Invalid account code: {0}")]
    InvalidCode(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl AcxError {
    /// True for failures the search boundary reports as a failed search
    /// rather than aborting the caller.
    pub fn is_recoverable_search_failure(&self) -> bool {
        matches!(self, Self::QuerySyntax(_))
    }
}

pub type Result<T> = std::result::Result<T, AcxError>;
