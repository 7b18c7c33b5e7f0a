//! Error types for joao operations

use thiserror::Error;

/// The main error type for joao operations.
///
/// Every fallible path in the crate funnels into this enum so the binary can
/// map failures onto sysexits-style status codes in one place.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("no value found at {segment:?} of {path:?}")]
    NotFound { segment: String, path: Vec<String> },

    #[error("item {name:?} not found in vault {vault:?}")]
    ItemNotFound { vault: String, name: String },

    #[error("could not determine vault and name: {0}")]
    ConfigMissing(String),

    #[error("yaml parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("transport failed: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The process exit status for this error, following sysexits(3) where a
    /// close match exists.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgs(_) => 64,
            Error::NotFound { .. } | Error::ItemNotFound { .. } => 127,
            Error::ConfigMissing(_) => 78,
            Error::Internal(_) => 70,
            Error::Parse { .. }
            | Error::Transport(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::Yaml(_)
            | Error::Http(_) => 1,
        }
    }

    pub(crate) fn parse(line: usize, msg: impl Into<String>) -> Error {
        Error::Parse {
            line,
            msg: msg.into(),
        }
    }

    pub(crate) fn not_found(segment: &str, path: &[String]) -> Error {
        Error::NotFound {
            segment: segment.to_string(),
            path: path.to_vec(),
        }
    }
}
