use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackitError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Error parsing config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("{}: {reason}", path.display())]
    FileShape { path: PathBuf, reason: String },

    #[error("{}, line {line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error(
        "no rate defined from {currency} to {base} for month {month} (file: {}). \
         Create the currency (trackit currency create) and a rate (trackit rate create) for this month",
        path.display()
    )]
    RateMissing {
        currency: String,
        base: String,
        month: String,
        path: PathBuf,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TrackitError>;
