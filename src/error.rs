use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] calamine::Error),

    #[error("Invalid upload: {0}")]
    Validation(String),

    #[error("Unknown program: {0} (expected SITE, CHAT or TRADE)")]
    UnknownProgram(String),

    #[error("Unknown status: {0} (expected OPEN, IN_REVIEW or RESOLVED)")]
    UnknownStatus(String),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ReconError>;
