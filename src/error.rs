//! Error types shared by the loader, the report writers and `main`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

/// Why the primary channel could not supply records.
///
/// Every variant is recoverable by reading the secondary file instead.
#[derive(Debug, Error)]
pub enum PrimaryFailure {
    #[error("stream responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("stream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("stream body unreadable: {0}")]
    Body(std::io::Error),

    #[error("stream line {line} is not a record: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ReportError>;
