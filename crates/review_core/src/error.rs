use std::path::PathBuf;

/// Errors raised while starting or driving a review session.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("reviewer name is empty")]
    EmptyReviewer,

    #[error("input file '{}' not found", .0.display())]
    InputMissing(PathBuf),

    #[error("column '{column}' is missing from {}", .path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("record '{0}' is no longer the current record")]
    StaleRecord(String),

    #[error("no records left to review")]
    NothingPending,

    #[error("{0} records are still waiting for review")]
    PendingRecords(usize),

    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReviewError>;
